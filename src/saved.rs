//! Saved filters referenced through the `filter` and `filter_id` parameters.

use async_trait::async_trait;
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};

use crate::config::FilterSetOptions;
use crate::errors::FilterSetError;
use crate::params::QueryParams;
use crate::validation::ValidationErrors;

/// A named, stored set of query parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedFilter {
    pub id: i64,
    pub name: String,
    pub slug: String,
    /// JSON object of parameter name to a value or a list of values
    pub parameters: serde_json::Value,
}

impl SavedFilter {
    /// Stored parameters as a multi-map.
    ///
    /// Scalars become one value, lists one value per element. Booleans render
    /// lowercase; nulls are dropped. Non-object parameters yield nothing.
    #[must_use]
    pub fn to_params(&self) -> QueryParams {
        let mut params = QueryParams::new();
        let Some(object) = self.parameters.as_object() else {
            tracing::warn!(saved_filter = %self.slug, "saved filter parameters are not an object");
            return params;
        };

        for (key, value) in object {
            let values = match value {
                serde_json::Value::Array(items) => items.iter().filter_map(json_to_param).collect(),
                scalar => json_to_param(scalar).into_iter().collect(),
            };
            params.insert(key.clone(), values);
        }
        params
    }
}

fn json_to_param(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(text) => Some(text.clone()),
        serde_json::Value::Bool(flag) => Some(flag.to_string()),
        serde_json::Value::Number(number) => Some(number.to_string()),
        nested => Some(nested.to_string()),
    }
}

/// Store of saved filters.
#[async_trait]
pub trait SavedFilterStore: Send + Sync {
    /// Saved filters whose slug is in `slugs` or whose id is in `ids`.
    async fn lookup(&self, slugs: &[String], ids: &[i64]) -> Result<Vec<SavedFilter>, DbErr>;
}

/// Replace saved-filter references in `params` with the stored parameters.
///
/// Both reference parameters are removed. Each matching saved filter is merged
/// in retrieval order as a multi-map union, so stored values add to the values
/// already present rather than replacing them.
///
/// # Errors
///
/// Returns a validation error for non-integer ids and a database error when the
/// store fails.
pub async fn expand_saved_filters(
    params: &mut QueryParams,
    store: &dyn SavedFilterStore,
    options: &FilterSetOptions,
) -> Result<(), FilterSetError> {
    let slug_param = options.saved_filter_param.as_str();
    let id_param = options.saved_filter_id_param.as_str();
    if !params.contains_key(slug_param) && !params.contains_key(id_param) {
        return Ok(());
    }

    let slugs: Vec<String> = params
        .remove(slug_param)
        .unwrap_or_default()
        .into_iter()
        .map(|slug| slug.trim().to_string())
        .filter(|slug| !slug.is_empty())
        .collect();

    let mut errors = ValidationErrors::new();
    let mut ids = Vec::new();
    for raw in params.remove(id_param).unwrap_or_default() {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        match raw.parse::<i64>() {
            Ok(id) => ids.push(id),
            Err(_) => errors.push(id_param, format!("\u{201c}{raw}\u{201d} is not a valid value.")),
        }
    }
    errors.result()?;

    if slugs.is_empty() && ids.is_empty() {
        return Ok(());
    }

    let saved_filters = store.lookup(&slugs, &ids).await?;
    tracing::debug!(
        requested_slugs = slugs.len(),
        requested_ids = ids.len(),
        found = saved_filters.len(),
        "expanding saved filters"
    );
    for saved_filter in saved_filters {
        params.merge_union(saved_filter.to_params());
    }
    Ok(())
}
