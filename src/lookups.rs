//! Lookup expressions and the suffix tables used to expand simple filters.
//!
//! A lookup is the comparison applied between a field and a filter value
//! (`exact`, `icontains`, `gte`, ...). Simple filters (`exact`, `iexact`, `in`)
//! get companion filters for every suffix of the table matching their
//! [`FilterCategory`](crate::filter::FilterCategory):
//!
//! ```text
//! GET /clusters?name__ic=core          -> name ILIKE '%core%'
//! GET /clusters?name__nic=core         -> NOT (name ILIKE '%core%')
//! GET /clusters?weight__gte=100        -> weight >= 100
//! GET /clusters?description__empty=1   -> description IS NULL OR description = ''
//! ```

use std::fmt;
use std::str::FromStr;

/// A comparison applied between a field and a filter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lookup {
    Exact,
    IExact,
    In,
    IContains,
    IStartsWith,
    IEndsWith,
    /// Membership in a JSON array
    Contains,
    Gt,
    Gte,
    Lt,
    Lte,
    IsNull,
    /// NULL or empty string
    Empty,
}

impl Lookup {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::IExact => "iexact",
            Self::In => "in",
            Self::IContains => "icontains",
            Self::IStartsWith => "istartswith",
            Self::IEndsWith => "iendswith",
            Self::Contains => "contains",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::IsNull => "isnull",
            Self::Empty => "empty",
        }
    }

    /// Only simple lookups are eligible for suffix expansion.
    #[must_use]
    pub const fn is_simple(self) -> bool {
        matches!(self, Self::Exact | Self::IExact | Self::In)
    }

    /// Lookups whose value is a boolean presence flag rather than a field value.
    #[must_use]
    pub const fn is_presence_check(self) -> bool {
        matches!(self, Self::IsNull | Self::Empty)
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a known lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown lookup expression '{0}'")]
pub struct UnknownLookup(pub String);

impl FromStr for Lookup {
    type Err = UnknownLookup;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "exact" => Self::Exact,
            "iexact" => Self::IExact,
            "in" => Self::In,
            "icontains" => Self::IContains,
            "istartswith" => Self::IStartsWith,
            "iendswith" => Self::IEndsWith,
            "contains" => Self::Contains,
            "gt" => Self::Gt,
            "gte" => Self::Gte,
            "lt" => Self::Lt,
            "lte" => Self::Lte,
            "isnull" => Self::IsNull,
            "empty" => Self::Empty,
            other => return Err(UnknownLookup(other.to_string())),
        })
    }
}

/// Ordered mapping from a parameter suffix to the lookup it applies.
pub type LookupMap = &'static [(&'static str, Lookup)];

/// Suffix marking a negated lookup (`__n`, `__nic`, `__nisw`, ...).
pub const NEGATION_MARKER: char = 'n';

/// Suffix of the presence check companion filter.
pub const EMPTY_SUFFIX: &str = "empty";

/// Separator between a filter name and its lookup suffix.
pub const LOOKUP_SEPARATOR: &str = "__";

pub const NUMERIC_BASED_LOOKUPS: LookupMap = &[
    ("n", Lookup::Exact),
    ("lte", Lookup::Lte),
    ("lt", Lookup::Lt),
    ("gte", Lookup::Gte),
    ("gt", Lookup::Gt),
    ("empty", Lookup::IsNull),
];

pub const CHAR_BASED_LOOKUPS: LookupMap = &[
    ("n", Lookup::Exact),
    ("ic", Lookup::IContains),
    ("nic", Lookup::IContains),
    ("iew", Lookup::IEndsWith),
    ("niew", Lookup::IEndsWith),
    ("isw", Lookup::IStartsWith),
    ("nisw", Lookup::IStartsWith),
    ("ie", Lookup::IExact),
    ("nie", Lookup::IExact),
    ("empty", Lookup::Empty),
];

pub const NEGATION_LOOKUPS: LookupMap = &[("n", Lookup::Exact)];

/// Tree node filters only support negation and must keep the `in` lookup.
pub const TREENODE_NEGATION_LOOKUPS: LookupMap = &[("n", Lookup::In)];

/// Whether a suffix negates the filter it is derived from.
#[must_use]
pub fn is_negation(suffix: &str) -> bool {
    suffix.starts_with(NEGATION_MARKER)
}
