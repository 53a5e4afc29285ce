//! Filter declarations and typed filter values.
//!
//! A [`Filter`] describes how one query parameter maps onto a field: the
//! field path, the lookup, whether matches are excluded, and the
//! [`FilterKind`] used to parse the raw parameter values.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use uuid::Uuid;

use crate::changelog::ChangeAction;
use crate::custom_fields::CustomField;
use crate::lookups::{
    CHAR_BASED_LOOKUPS, Lookup, LookupMap, NEGATION_LOOKUPS, NUMERIC_BASED_LOOKUPS,
    TREENODE_NEGATION_LOOKUPS,
};

/// Value type of a filter, deciding how raw parameter values are parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Number,
    Decimal,
    Char,
    MacAddress,
    Date,
    DateTime,
    Time,
    Boolean,
    Uuid,
    /// Text restricted to `FilterExtra::choices`
    Choice,
    /// Primary key of a related object
    ModelChoice,
    /// Primary key of a node in a hierarchy
    TreeNode,
    /// Tag slug
    Tag,
    /// Tag primary key
    TagId,
    /// Element of a JSON array
    Array,
}

/// Lookup-map category of a filter kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterCategory {
    Numeric,
    Char,
    Negatable,
    TreeNode,
    Unexpanded,
}

impl FilterCategory {
    /// The suffix table used to expand simple filters of this category.
    #[must_use]
    pub const fn lookup_map(self) -> Option<LookupMap> {
        match self {
            Self::Numeric => Some(NUMERIC_BASED_LOOKUPS),
            Self::Char => Some(CHAR_BASED_LOOKUPS),
            Self::Negatable => Some(NEGATION_LOOKUPS),
            Self::TreeNode => Some(TREENODE_NEGATION_LOOKUPS),
            Self::Unexpanded => None,
        }
    }
}

impl FilterKind {
    #[must_use]
    pub const fn category(self) -> FilterCategory {
        match self {
            Self::Number | Self::Decimal | Self::Date | Self::DateTime | Self::Time => {
                FilterCategory::Numeric
            }
            Self::Char | Self::Choice | Self::MacAddress => FilterCategory::Char,
            Self::ModelChoice | Self::Tag | Self::TagId => FilterCategory::Negatable,
            Self::TreeNode => FilterCategory::TreeNode,
            Self::Boolean | Self::Uuid | Self::Array => FilterCategory::Unexpanded,
        }
    }

    /// Whether a filter of this kind accepts repeated parameter values by default.
    #[must_use]
    pub const fn accepts_many(self) -> bool {
        !matches!(self, Self::Boolean | Self::Uuid)
    }

    /// Whether values of this kind compare as numbers.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Number | Self::Decimal | Self::ModelChoice | Self::TreeNode | Self::TagId
        )
    }
}

/// Custom handler replacing the plain lookup of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMethod {
    /// Free-text search through `FilterSetDefinition::search`
    Search,
    /// Objects touched by a request, through the change log
    ByRequest(&'static [ChangeAction]),
    /// Dispatched to `FilterSetDefinition::filter_method`
    Named(&'static str),
}

/// Where a filter came from. Decides how lookup companions are rebuilt.
#[derive(Debug, Clone)]
pub enum FilterOrigin {
    /// Explicitly declared on the filter set definition
    Declared,
    /// Derived from model metadata
    Generated,
    /// Derived from a custom field definition
    CustomField(Arc<CustomField>),
}

/// Options carried over when a declared filter is rebuilt for another lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterExtra {
    /// Allowed values for `FilterKind::Choice`
    pub choices: Option<Vec<String>>,
    /// Raw token meaning "field IS NULL"
    pub null_value: Option<String>,
    /// Every value must match instead of any value
    pub conjoined: bool,
}

/// One filter of a filter set.
#[derive(Debug, Clone)]
pub struct Filter {
    /// Field path; a column name, optionally followed by `__`-separated JSON keys.
    /// Empty until bound to its name in a filter set.
    pub field_name: String,
    pub lookup: Lookup,
    pub exclude: bool,
    pub kind: FilterKind,
    pub multiple: bool,
    pub label: Option<String>,
    pub method: Option<FilterMethod>,
    pub extra: FilterExtra,
    pub origin: FilterOrigin,
}

impl Filter {
    #[must_use]
    pub fn new(kind: FilterKind) -> Self {
        Self {
            field_name: String::new(),
            lookup: Lookup::Exact,
            exclude: false,
            kind,
            multiple: kind.accepts_many(),
            label: None,
            method: None,
            extra: FilterExtra::default(),
            origin: FilterOrigin::Declared,
        }
    }

    #[must_use]
    pub fn field(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = field_name.into();
        self
    }

    #[must_use]
    pub fn lookup(mut self, lookup: Lookup) -> Self {
        self.lookup = lookup;
        self
    }

    #[must_use]
    pub fn exclude(mut self) -> Self {
        self.exclude = true;
        self
    }

    #[must_use]
    pub fn single(mut self) -> Self {
        self.multiple = false;
        self
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn method(mut self, method: FilterMethod) -> Self {
        self.method = Some(method);
        self
    }

    #[must_use]
    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn null_value(mut self, token: impl Into<String>) -> Self {
        self.extra.null_value = Some(token.into());
        self
    }

    #[must_use]
    pub fn conjoined(mut self) -> Self {
        self.extra.conjoined = true;
        self
    }

    #[must_use]
    pub(crate) fn with_origin(mut self, origin: FilterOrigin) -> Self {
        self.origin = origin;
        self
    }

    #[must_use]
    pub fn category(&self) -> FilterCategory {
        self.kind.category()
    }

    #[must_use]
    pub fn custom_field(&self) -> Option<&Arc<CustomField>> {
        match &self.origin {
            FilterOrigin::CustomField(custom_field) => Some(custom_field),
            _ => None,
        }
    }

    /// Parse one raw parameter value for this filter.
    ///
    /// # Errors
    ///
    /// Returns a user-facing message when the value does not fit the filter kind.
    pub fn parse_value(&self, raw: &str) -> Result<FilterValue, String> {
        let value = raw.trim();
        if self.extra.null_value.as_deref() == Some(value) {
            return Ok(FilterValue::Null);
        }

        match self.kind {
            FilterKind::Number | FilterKind::Decimal => parse_number(value),
            FilterKind::Char | FilterKind::Tag | FilterKind::Array => {
                Ok(FilterValue::Text(value.to_string()))
            }
            FilterKind::MacAddress => {
                if matches!(self.lookup, Lookup::Exact | Lookup::IExact | Lookup::In) {
                    normalize_mac(value)
                        .map(FilterValue::Text)
                        .ok_or_else(|| "Enter a valid MAC address.".to_string())
                } else {
                    Ok(FilterValue::Text(value.to_lowercase()))
                }
            }
            FilterKind::Date => NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(FilterValue::Date)
                .map_err(|_| "Enter a valid date.".to_string()),
            FilterKind::DateTime => parse_datetime(value)
                .map(FilterValue::DateTime)
                .ok_or_else(|| "Enter a valid date/time.".to_string()),
            FilterKind::Time => NaiveTime::parse_from_str(value, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
                .map(FilterValue::Time)
                .map_err(|_| "Enter a valid time.".to_string()),
            FilterKind::Boolean => parse_bool(value)
                .map(FilterValue::Bool)
                .ok_or_else(|| "Enter a valid boolean.".to_string()),
            FilterKind::Uuid => Uuid::parse_str(value)
                .map(FilterValue::Uuid)
                .map_err(|_| "Enter a valid UUID.".to_string()),
            FilterKind::Choice => match &self.extra.choices {
                Some(choices) if !choices.iter().any(|choice| choice == value) => Err(format!(
                    "Select a valid choice. {value} is not one of the available choices."
                )),
                _ => Ok(FilterValue::Text(value.to_string())),
            },
            FilterKind::ModelChoice | FilterKind::TreeNode | FilterKind::TagId => value
                .parse::<i64>()
                .map(FilterValue::Int)
                .map_err(|_| format!("\u{201c}{value}\u{201d} is not a valid value.")),
        }
    }
}

/// A parsed filter value.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Time(NaiveTime),
    Uuid(Uuid),
    Null,
}

impl FilterValue {
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Text form used by case-insensitive pattern lookups.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Int(value) => value.to_string(),
            Self::Float(value) => value.to_string(),
            Self::Text(value) => value.clone(),
            Self::Bool(value) => value.to_string(),
            Self::Date(value) => value.to_string(),
            Self::DateTime(value) => value.to_rfc3339(),
            Self::Time(value) => value.to_string(),
            Self::Uuid(value) => value.to_string(),
            Self::Null => String::new(),
        }
    }

    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Int(value) => serde_json::Value::from(*value),
            Self::Float(value) => serde_json::Value::from(*value),
            Self::Bool(value) => serde_json::Value::Bool(*value),
            Self::Null => serde_json::Value::Null,
            other => serde_json::Value::String(other.to_text()),
        }
    }

    /// Convert a JSON scalar into a filter value; structures stay JSON text.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or_else(|| Self::Text(n.to_string())),
            serde_json::Value::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }
}

impl From<FilterValue> for sea_orm::Value {
    fn from(value: FilterValue) -> Self {
        match value {
            FilterValue::Int(v) => v.into(),
            FilterValue::Float(v) => v.into(),
            FilterValue::Text(v) => v.into(),
            FilterValue::Bool(v) => v.into(),
            FilterValue::Date(v) => v.into(),
            FilterValue::DateTime(v) => v.into(),
            FilterValue::Time(v) => v.into(),
            FilterValue::Uuid(v) => v.into(),
            FilterValue::Null => sea_orm::Value::String(None),
        }
    }
}

fn parse_number(value: &str) -> Result<FilterValue, String> {
    if let Ok(int_value) = value.parse::<i64>() {
        return Ok(FilterValue::Int(int_value));
    }
    match value.parse::<f64>() {
        Ok(float_value) if float_value.is_finite() => Ok(FilterValue::Float(float_value)),
        _ => Err("Enter a number.".to_string()),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Normalize a MAC address to lowercase colon-separated octets.
fn normalize_mac(value: &str) -> Option<String> {
    let hex: String = value
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | '.'))
        .collect();
    if hex.len() != 12 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let lower = hex.to_ascii_lowercase();
    let octets: Vec<&str> = (0..6).map(|i| &lower[i * 2..i * 2 + 2]).collect();
    Some(octets.join(":"))
}
