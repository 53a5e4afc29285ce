//! Default free-text search behind the `q` filter.

use std::str::FromStr;

use sea_orm::{Condition, EntityTrait};

use crate::conditions::{column_expr, values_condition};
use crate::filter::FilterValue;
use crate::filterset::ModelFamily;
use crate::lookups::Lookup;

const ORGANIZATIONAL_SEARCH_FIELDS: &[&str] = &["name", "slug", "description"];
const NESTED_GROUP_SEARCH_FIELDS: &[&str] = &["name", "slug", "description", "comments"];

/// Columns searched by default for a model family.
#[must_use]
pub const fn search_fields(family: ModelFamily) -> &'static [&'static str] {
    match family {
        ModelFamily::Organizational => ORGANIZATIONAL_SEARCH_FIELDS,
        ModelFamily::NestedGroup => NESTED_GROUP_SEARCH_FIELDS,
        ModelFamily::Base | ModelFamily::ChangeLogged | ModelFamily::NetBox => &[],
    }
}

/// Case-insensitive substring match of `value` on any of `fields`.
///
/// Returns `None` for blank input or when no field exists on `E`; callers
/// treat that as "no constraint".
#[must_use]
pub fn icontains_any<E: EntityTrait>(fields: &[&str], value: &str) -> Option<Condition> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let needle = [FilterValue::Text(value.to_string())];
    let mut condition = Condition::any();
    let mut searched = 0;
    for field in fields {
        let Ok(column) = E::Column::from_str(field) else {
            tracing::debug!(field = *field, "search field missing on entity; skipped");
            continue;
        };
        condition = condition.add(values_condition(
            &column_expr(column),
            Lookup::IContains,
            &needle,
        ));
        searched += 1;
    }

    (searched > 0).then_some(condition)
}

/// Search a model family performs unless its definition overrides it.
#[must_use]
pub fn family_search<E: EntityTrait>(family: ModelFamily, value: &str) -> Option<Condition> {
    icontains_any::<E>(search_fields(family), value)
}
