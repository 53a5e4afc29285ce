//! Custom field definitions and the filters derived from them.
//!
//! Custom field values live in the `custom_field_data` JSON column of a model.
//! Each definition scoped to a model yields a `cf_<name>` filter on the
//! matching JSON key, typed after the custom field type.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};

use crate::filter::{Filter, FilterKind, FilterOrigin};
use crate::lookups::{LOOKUP_SEPARATOR, Lookup};

/// JSON column holding custom field values.
pub const CUSTOM_FIELD_DATA: &str = "custom_field_data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomFieldType {
    Text,
    LongText,
    Integer,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Url,
    Json,
    Select,
    MultiSelect,
    Object,
    MultiObject,
}

/// How a custom field takes part in filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterLogic {
    Disabled,
    /// Text fields match on substrings
    #[default]
    Loose,
    Exact,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub kind: CustomFieldType,
    #[serde(default)]
    pub filter_logic: FilterLogic,
    /// Content types (`app_label.model`) the field is assigned to
    #[serde(default)]
    pub object_types: Vec<String>,
}

impl CustomField {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: CustomFieldType) -> Self {
        Self {
            name: name.into(),
            label: None,
            kind,
            filter_logic: FilterLogic::default(),
            object_types: Vec::new(),
        }
    }

    #[must_use]
    pub fn filter_logic(mut self, filter_logic: FilterLogic) -> Self {
        self.filter_logic = filter_logic;
        self
    }

    #[must_use]
    pub fn object_type(mut self, content_type: impl Into<String>) -> Self {
        self.object_types.push(content_type.into());
        self
    }

    #[must_use]
    pub fn is_filterable(&self) -> bool {
        self.filter_logic != FilterLogic::Disabled
    }

    /// Path of this field's value inside the custom field data column.
    #[must_use]
    pub fn field_path(&self) -> String {
        format!("{CUSTOM_FIELD_DATA}{LOOKUP_SEPARATOR}{}", self.name)
    }

    /// Build the filter for this custom field, using `lookup` or the type's default.
    ///
    /// Returns `None` for disabled fields and for types without filter support.
    #[must_use]
    pub fn to_filter(self: &Arc<Self>, lookup: Option<Lookup>) -> Option<Filter> {
        if !self.is_filterable() {
            return None;
        }

        let (kind, default_lookup) = match self.kind {
            CustomFieldType::Text | CustomFieldType::LongText | CustomFieldType::Url => {
                let lookup = if self.filter_logic == FilterLogic::Loose {
                    Lookup::IContains
                } else {
                    Lookup::Exact
                };
                (FilterKind::Char, lookup)
            }
            CustomFieldType::Integer | CustomFieldType::Object => (FilterKind::Number, Lookup::Exact),
            CustomFieldType::Decimal => (FilterKind::Decimal, Lookup::Exact),
            CustomFieldType::Boolean => (FilterKind::Boolean, Lookup::Exact),
            CustomFieldType::Date => (FilterKind::Date, Lookup::Exact),
            CustomFieldType::DateTime => (FilterKind::DateTime, Lookup::Exact),
            CustomFieldType::Select => (FilterKind::Char, Lookup::Exact),
            CustomFieldType::MultiSelect => (FilterKind::Array, Lookup::Contains),
            CustomFieldType::MultiObject => (FilterKind::Number, Lookup::Contains),
            CustomFieldType::Json => return None,
        };

        let mut filter = Filter::new(kind)
            .field(self.field_path())
            .lookup(lookup.unwrap_or(default_lookup))
            .with_origin(FilterOrigin::CustomField(Arc::clone(self)));
        filter.label.clone_from(&self.label);
        Some(filter)
    }
}

/// Store of custom field definitions.
#[async_trait]
pub trait CustomFieldStore: Send + Sync {
    /// Definitions assigned to `content_type`, including disabled ones.
    async fn list_for_content_type(&self, content_type: &str) -> Result<Vec<CustomField>, DbErr>;
}
