//! Default filters per column type.

use sea_orm::{ColumnTrait, ColumnType};

use crate::fields::{FieldTarget, LookupError, resolve_lookup};
use crate::filter::{Filter, FilterKind, FilterOrigin};
use crate::lookups::Lookup;

/// Filter kind used for a column listed in a definition's meta fields.
///
/// Returns `None` for column types without a default filter (JSON, binary, arrays).
#[must_use]
pub fn default_filter_kind(column_type: &ColumnType) -> Option<FilterKind> {
    let kind = match column_type {
        ColumnType::TinyInteger
        | ColumnType::SmallInteger
        | ColumnType::Integer
        | ColumnType::BigInteger
        | ColumnType::TinyUnsigned
        | ColumnType::SmallUnsigned
        | ColumnType::Unsigned
        | ColumnType::BigUnsigned
        | ColumnType::Float
        | ColumnType::Double => FilterKind::Number,
        ColumnType::Decimal(_) | ColumnType::Money(_) => FilterKind::Decimal,
        ColumnType::Char(_)
        | ColumnType::String(_)
        | ColumnType::Text
        | ColumnType::Enum { .. }
        | ColumnType::Custom(_)
        | ColumnType::Inet
        | ColumnType::Cidr => FilterKind::Char,
        ColumnType::MacAddr => FilterKind::MacAddress,
        ColumnType::Date => FilterKind::Date,
        ColumnType::DateTime | ColumnType::Timestamp | ColumnType::TimestampWithTimeZone => {
            FilterKind::DateTime
        }
        ColumnType::Time => FilterKind::Time,
        ColumnType::Boolean => FilterKind::Boolean,
        ColumnType::Uuid => FilterKind::Uuid,
        _ => return None,
    };
    Some(kind)
}

/// Filter kind and multiplicity for `lookup` on a field whose default kind is `kind`.
#[must_use]
pub fn filter_for_lookup(kind: FilterKind, lookup: Lookup) -> (FilterKind, bool) {
    if lookup.is_presence_check() {
        return (FilterKind::Boolean, false);
    }
    (kind, lookup == Lookup::In || kind.accepts_many())
}

/// Build the default filter for a column and lookup.
///
/// # Errors
///
/// Returns a [`LookupError`] when the column type has no default filter or
/// does not support `lookup`.
pub fn filter_for_field<C: ColumnTrait>(
    target: &FieldTarget<C>,
    field_name: &str,
    lookup: Lookup,
) -> Result<Filter, LookupError> {
    let unsupported = || LookupError {
        field: field_name.to_string(),
        lookup,
    };

    let FieldTarget::Column(column) = target else {
        return Err(unsupported());
    };
    let default_kind = default_filter_kind(column.def().get_column_type()).ok_or_else(unsupported)?;
    resolve_lookup(field_name, target, lookup)?;

    let (kind, multiple) = filter_for_lookup(default_kind, lookup);
    let mut filter = Filter::new(kind)
        .field(field_name)
        .lookup(lookup)
        .with_origin(FilterOrigin::Generated);
    filter.multiple = multiple;
    Ok(filter)
}
