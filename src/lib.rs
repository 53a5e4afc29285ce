pub mod attributes;
pub mod changelog;
pub mod conditions;
pub mod config;
pub mod context;
pub mod custom_fields;
pub mod errors;
pub mod expander;
pub mod fields;
pub mod filter;
pub mod filterset;
pub mod lookups;
pub mod params;
pub mod registry;
pub mod saved;
pub mod search;
pub mod stores;
pub mod tags;
pub mod validation;

pub use attributes::{AttributeFilter, AttributeFilters};
pub use changelog::{ChangeAction, ChangeLog, ObjectId};
pub use config::FilterSetOptions;
pub use context::FilterContext;
pub use custom_fields::{CustomField, CustomFieldStore, CustomFieldType, FilterLogic};
pub use errors::{ApiError, FilterSetError};
pub use expander::FilterMap;
pub use filter::{Filter, FilterCategory, FilterKind, FilterMethod, FilterValue};
pub use filterset::{BoundFilter, FilterSet, FilterSetDefinition, ModelFamily};
pub use lookups::Lookup;
pub use params::QueryParams;
pub use saved::{SavedFilter, SavedFilterStore};
pub use tags::{TagIndex, TagRef};
pub use validation::{ValidationError, ValidationErrors};
