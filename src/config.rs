use serde::Deserialize;

/// Runtime options shared by every filter set.
///
/// Deserializes from application configuration; missing keys take defaults.
///
/// ```json
/// {"saved_filter_param": "filter", "max_value_length": 2048}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FilterSetOptions {
    /// Parameter referencing saved filters by slug.
    pub saved_filter_param: String,
    /// Parameter referencing saved filters by id.
    pub saved_filter_id_param: String,
    /// Prefix of custom field filters (`cf_owner`).
    pub custom_field_prefix: String,
    /// Longest accepted raw value; longer values are rejected.
    pub max_value_length: usize,
    /// Most values accepted for one parameter; extra values are rejected.
    pub max_values_per_param: usize,
}

impl Default for FilterSetOptions {
    fn default() -> Self {
        Self {
            saved_filter_param: "filter".to_string(),
            saved_filter_id_param: "filter_id".to_string(),
            custom_field_prefix: "cf_".to_string(),
            max_value_length: 10_000,
            max_values_per_param: 1_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_configuration_keeps_defaults() {
        let options: FilterSetOptions =
            serde_json::from_str(r#"{"custom_field_prefix": "custom_", "max_value_length": 64}"#)
                .unwrap();
        assert_eq!(options.custom_field_prefix, "custom_");
        assert_eq!(options.max_value_length, 64);
        assert_eq!(options.saved_filter_param, "filter");
        assert_eq!(options.max_values_per_param, 1_000);
    }
}
