//! Field path resolution against Sea-ORM entity metadata.
//!
//! A filter field path is a column name, optionally followed by
//! `__`-separated keys into a JSON column (`custom_field_data__owner`).
//! The virtual `tags` field targets the tag index.

use std::str::FromStr;

use sea_orm::{ColumnTrait, ColumnType, EntityTrait};

use crate::lookups::{LOOKUP_SEPARATOR, Lookup};
use crate::tags::TAGS_FIELD;

/// What a filter field path points at.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldTarget<C> {
    Column(C),
    /// Key path inside a JSON column
    JsonPath { column: C, path: Vec<String> },
    /// Tag assignments of the object
    Tags,
}

/// Broad type class of a target, deciding which lookups it supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    Text,
    Numeric,
    Temporal,
    Boolean,
    Uuid,
    Json,
    JsonKey,
    Tags,
    Other,
}

/// Lookup not supported by the target field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported lookup '{lookup}' for field '{field}'")]
pub struct LookupError {
    pub field: String,
    pub lookup: Lookup,
}

impl<C: ColumnTrait> FieldTarget<C> {
    #[must_use]
    pub fn class(&self) -> FieldClass {
        match self {
            Self::Column(column) => column_class(column.def().get_column_type()),
            Self::JsonPath { .. } => FieldClass::JsonKey,
            Self::Tags => FieldClass::Tags,
        }
    }

    /// The column holding the target's value, if any.
    #[must_use]
    pub fn column(&self) -> Option<C> {
        match self {
            Self::Column(column) | Self::JsonPath { column, .. } => Some(*column),
            Self::Tags => None,
        }
    }
}

#[must_use]
pub fn column_class(column_type: &ColumnType) -> FieldClass {
    match column_type {
        ColumnType::Char(_)
        | ColumnType::String(_)
        | ColumnType::Text
        | ColumnType::Enum { .. }
        | ColumnType::Custom(_)
        | ColumnType::MacAddr
        | ColumnType::Inet
        | ColumnType::Cidr => FieldClass::Text,
        ColumnType::TinyInteger
        | ColumnType::SmallInteger
        | ColumnType::Integer
        | ColumnType::BigInteger
        | ColumnType::TinyUnsigned
        | ColumnType::SmallUnsigned
        | ColumnType::Unsigned
        | ColumnType::BigUnsigned
        | ColumnType::Float
        | ColumnType::Double
        | ColumnType::Decimal(_)
        | ColumnType::Money(_) => FieldClass::Numeric,
        ColumnType::DateTime
        | ColumnType::Timestamp
        | ColumnType::TimestampWithTimeZone
        | ColumnType::Time
        | ColumnType::Date
        | ColumnType::Year => FieldClass::Temporal,
        ColumnType::Boolean => FieldClass::Boolean,
        ColumnType::Uuid => FieldClass::Uuid,
        ColumnType::Json | ColumnType::JsonBinary => FieldClass::Json,
        _ => FieldClass::Other,
    }
}

/// Whether a JSON key is safe to use as a path segment.
#[must_use]
pub fn is_valid_json_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= 100
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Resolve a field path against the columns of `E`.
#[must_use]
pub fn resolve_field<E: EntityTrait>(field_name: &str) -> Option<FieldTarget<E::Column>> {
    let mut segments = field_name.split(LOOKUP_SEPARATOR);
    let head = segments.next()?;
    let path: Vec<String> = segments.map(str::to_string).collect();

    let Ok(column) = E::Column::from_str(head) else {
        return (head == TAGS_FIELD && path.is_empty()).then_some(FieldTarget::Tags);
    };

    if path.is_empty() {
        return Some(FieldTarget::Column(column));
    }

    let is_json = column_class(column.def().get_column_type()) == FieldClass::Json;
    (is_json && path.iter().all(|key| is_valid_json_key(key)))
        .then_some(FieldTarget::JsonPath { column, path })
}

/// Check that `lookup` can be applied to `target`.
///
/// # Errors
///
/// Returns a [`LookupError`] when the target's type does not support the lookup.
pub fn resolve_lookup<C: ColumnTrait>(
    field_name: &str,
    target: &FieldTarget<C>,
    lookup: Lookup,
) -> Result<(), LookupError> {
    use Lookup::{
        Contains, Empty, Exact, Gt, Gte, IContains, IEndsWith, IExact, IStartsWith, In, IsNull,
        Lt, Lte,
    };

    let supported: &[Lookup] = match target.class() {
        FieldClass::Text => &[
            Exact, IExact, In, IContains, IStartsWith, IEndsWith, Gt, Gte, Lt, Lte, IsNull, Empty,
        ],
        FieldClass::Numeric | FieldClass::Temporal => &[Exact, In, Gt, Gte, Lt, Lte, IsNull],
        FieldClass::Boolean | FieldClass::Uuid => &[Exact, In, IsNull],
        FieldClass::Json => &[Exact, Contains, IsNull],
        FieldClass::JsonKey => &[
            Exact, IExact, In, IContains, IStartsWith, IEndsWith, Contains, Gt, Gte, Lt, Lte,
            IsNull,
        ],
        FieldClass::Tags => &[Exact, In],
        FieldClass::Other => &[Exact, IsNull],
    };

    if supported.contains(&lookup) {
        Ok(())
    } else {
        Err(LookupError {
            field: field_name.to_string(),
            lookup,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod device {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
        #[sea_orm(table_name = "devices")]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub id: i64,
            pub name: String,
            pub weight: Option<i32>,
            pub enabled: bool,
            pub created: DateTimeUtc,
            pub custom_field_data: Json,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    use device::{Column, Entity};

    #[test]
    fn test_resolves_plain_columns() {
        assert!(matches!(
            resolve_field::<Entity>("name"),
            Some(FieldTarget::Column(Column::Name))
        ));
        assert!(resolve_field::<Entity>("missing").is_none());
    }

    #[test]
    fn test_resolves_json_paths_only_on_json_columns() {
        let Some(FieldTarget::JsonPath { column, path }) =
            resolve_field::<Entity>("custom_field_data__owner")
        else {
            panic!("custom field path should resolve to a JSON key");
        };
        assert!(matches!(column, Column::CustomFieldData));
        assert_eq!(path, vec!["owner".to_string()]);

        assert!(resolve_field::<Entity>("name__first").is_none());
        assert!(resolve_field::<Entity>("custom_field_data__bad key").is_none());
    }

    #[test]
    fn test_tags_are_a_virtual_field() {
        assert!(matches!(resolve_field::<Entity>("tags"), Some(FieldTarget::Tags)));
        assert!(resolve_field::<Entity>("tags__slug").is_none());
    }

    #[test]
    fn test_lookup_support_follows_column_type() {
        let name = FieldTarget::Column(Column::Name);
        let weight = FieldTarget::Column(Column::Weight);
        let enabled = FieldTarget::Column(Column::Enabled);

        assert!(resolve_lookup("name", &name, Lookup::IContains).is_ok());
        assert!(resolve_lookup("name", &name, Lookup::Empty).is_ok());
        assert!(resolve_lookup("weight", &weight, Lookup::Gte).is_ok());
        assert!(resolve_lookup("weight", &weight, Lookup::IsNull).is_ok());
        assert_eq!(
            resolve_lookup("weight", &weight, Lookup::Empty),
            Err(LookupError {
                field: "weight".to_string(),
                lookup: Lookup::Empty,
            })
        );
        assert!(resolve_lookup("weight", &weight, Lookup::IContains).is_err());
        assert!(resolve_lookup("enabled", &enabled, Lookup::Gt).is_err());
    }

    #[test]
    fn test_json_keys_reject_empty_lookup() {
        let target = resolve_field::<Entity>("custom_field_data__owner").unwrap();
        assert!(resolve_lookup("custom_field_data__owner", &target, Lookup::IsNull).is_ok());
        assert!(resolve_lookup("custom_field_data__owner", &target, Lookup::Empty).is_err());
    }

    #[test]
    fn test_column_classes() {
        assert_eq!(column_class(&ColumnType::Text), FieldClass::Text);
        assert_eq!(column_class(&ColumnType::BigInteger), FieldClass::Numeric);
        assert_eq!(column_class(&ColumnType::Date), FieldClass::Temporal);
        assert_eq!(column_class(&ColumnType::JsonBinary), FieldClass::Json);
    }
}
