//! Attribute filters: prefixed parameters matched against a JSON document column.
//!
//! With the default configuration, `?attr_status="ok"&attr_size__gte=10`
//! matches rows whose `attribute_data` holds `{"status": "ok"}` and a `size`
//! of at least 10. Values are parsed as JSON; anything that is not valid JSON
//! is matched as a plain string.

use std::str::FromStr;

use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, Condition, DatabaseBackend, EntityTrait};

use crate::conditions::{json_contains_expr, json_equals_expr, json_path_expr, values_condition};
use crate::errors::FilterSetError;
use crate::fields::{FieldClass, column_class, is_valid_json_key};
use crate::filter::{FilterKind, FilterValue};
use crate::lookups::{LOOKUP_SEPARATOR, Lookup};
use crate::params::QueryParams;

/// Where attribute filters look and how their parameters are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeFilters {
    /// JSON column holding the attributes
    pub field_name: &'static str,
    pub prefix: &'static str,
}

impl Default for AttributeFilters {
    fn default() -> Self {
        Self {
            field_name: "attribute_data",
            prefix: "attr_",
        }
    }
}

/// One parsed attribute filter.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeFilter {
    pub path: Vec<String>,
    pub lookup: Lookup,
    pub value: serde_json::Value,
}

const fn is_attribute_lookup(lookup: Lookup) -> bool {
    !matches!(lookup, Lookup::In | Lookup::Empty)
}

impl AttributeFilters {
    /// Split a parameter key into a JSON path and lookup.
    ///
    /// Returns `None` for keys without the prefix or with unsafe path segments.
    #[must_use]
    pub fn parse_key(&self, key: &str) -> Option<(Vec<String>, Lookup)> {
        let stripped = key.strip_prefix(self.prefix)?;
        let mut path: Vec<String> = stripped.split(LOOKUP_SEPARATOR).map(str::to_string).collect();

        let mut lookup = Lookup::Exact;
        if path.len() > 1 {
            if let Some(parsed) = path
                .last()
                .and_then(|last| Lookup::from_str(last).ok())
                .filter(|parsed| is_attribute_lookup(*parsed))
            {
                lookup = parsed;
                path.pop();
            }
        }

        if path.iter().all(|segment| is_valid_json_key(segment)) {
            Some((path, lookup))
        } else {
            tracing::debug!(key, "ignoring attribute filter with invalid path");
            None
        }
    }

    /// Attribute filters present in `params`; the last value of each key wins.
    #[must_use]
    pub fn extract(&self, params: &QueryParams) -> Vec<AttributeFilter> {
        params
            .iter()
            .filter_map(|(key, values)| {
                let raw = values.last()?;
                let (path, lookup) = self.parse_key(key)?;
                let value = serde_json::from_str(raw)
                    .unwrap_or_else(|_| serde_json::Value::String(raw.clone()));
                Some(AttributeFilter {
                    path,
                    lookup,
                    value,
                })
            })
            .collect()
    }

    /// Conjunction of `filters` against the attribute column of `E`.
    ///
    /// # Errors
    ///
    /// Returns [`FilterSetError::InvalidDeclaration`] when `E` has no JSON
    /// column named `field_name`.
    pub fn condition<E: EntityTrait>(
        &self,
        filterset: &'static str,
        filters: &[AttributeFilter],
        backend: DatabaseBackend,
    ) -> Result<Option<Condition>, FilterSetError> {
        if filters.is_empty() {
            return Ok(None);
        }

        let column = E::Column::from_str(self.field_name)
            .ok()
            .filter(|column| column_class(column.def().get_column_type()) == FieldClass::Json)
            .ok_or_else(|| {
                FilterSetError::invalid_declaration(
                    filterset,
                    format!("attribute column '{}' is not a JSON column", self.field_name),
                )
            })?;

        let condition = filters.iter().fold(Condition::all(), |all, filter| {
            all.add(attribute_condition(column, filter, backend))
        });
        Ok(Some(condition))
    }
}

fn attribute_condition<C: ColumnTrait>(
    column: C,
    filter: &AttributeFilter,
    backend: DatabaseBackend,
) -> Condition {
    let AttributeFilter {
        path,
        lookup,
        value,
    } = filter;

    match lookup {
        Lookup::Exact => Condition::all().add(json_equals_expr(column, path, value, backend)),
        Lookup::Contains => Condition::all().add(json_contains_expr(column, path, value, backend)),
        Lookup::IsNull => {
            let is_null = match value {
                serde_json::Value::Bool(flag) => *flag,
                serde_json::Value::String(text) => !matches!(text.as_str(), "false" | "0"),
                _ => true,
            };
            let extracted = Expr::expr(json_path_expr(column, path, None, backend));
            Condition::all().add(if is_null {
                extracted.is_null()
            } else {
                extracted.is_not_null()
            })
        }
        _ => {
            let kind = match value {
                serde_json::Value::Number(_) => FilterKind::Number,
                serde_json::Value::Bool(_) => FilterKind::Boolean,
                _ => FilterKind::Char,
            };
            let typed = matches!(lookup, Lookup::Gt | Lookup::Gte | Lookup::Lt | Lookup::Lte);
            let expr = json_path_expr(column, path, typed.then_some(kind), backend);
            values_condition(&expr, *lookup, &[FilterValue::from_json(value)])
        }
    }
}
