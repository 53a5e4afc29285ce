use std::sync::Arc;

use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection};

use crate::changelog::ChangeLog;
use crate::config::FilterSetOptions;
use crate::custom_fields::CustomFieldStore;
use crate::saved::SavedFilterStore;
use crate::stores::{MemoryChangeLog, MemoryCustomFields, MemorySavedFilters, MemoryTags, SeaStore};
use crate::tags::TagIndex;

/// Everything a filter set needs besides the request parameters.
///
/// Cheap to clone; share one per application (e.g. as axum state).
#[derive(Clone)]
pub struct FilterContext {
    pub options: FilterSetOptions,
    pub backend: DatabaseBackend,
    pub saved_filters: Arc<dyn SavedFilterStore>,
    pub custom_fields: Arc<dyn CustomFieldStore>,
    pub change_log: Arc<dyn ChangeLog>,
    pub tags: Arc<dyn TagIndex>,
}

impl FilterContext {
    /// Context with empty in-memory stores.
    #[must_use]
    pub fn new(backend: DatabaseBackend) -> Self {
        Self {
            options: FilterSetOptions::default(),
            backend,
            saved_filters: Arc::new(MemorySavedFilters::default()),
            custom_fields: Arc::new(MemoryCustomFields::default()),
            change_log: Arc::new(MemoryChangeLog::default()),
            tags: Arc::new(MemoryTags::default()),
        }
    }

    /// Context reading every collaborator from the tables of `db`.
    #[must_use]
    pub fn from_connection(db: &DatabaseConnection) -> Self {
        let store = Arc::new(SeaStore::new(db.clone()));
        Self {
            options: FilterSetOptions::default(),
            backend: db.get_database_backend(),
            saved_filters: store.clone(),
            custom_fields: store.clone(),
            change_log: store.clone(),
            tags: store,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: FilterSetOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_saved_filters(mut self, store: Arc<dyn SavedFilterStore>) -> Self {
        self.saved_filters = store;
        self
    }

    #[must_use]
    pub fn with_custom_fields(mut self, store: Arc<dyn CustomFieldStore>) -> Self {
        self.custom_fields = store;
        self
    }

    #[must_use]
    pub fn with_change_log(mut self, change_log: Arc<dyn ChangeLog>) -> Self {
        self.change_log = change_log;
        self
    }

    #[must_use]
    pub fn with_tags(mut self, tags: Arc<dyn TagIndex>) -> Self {
        self.tags = tags;
        self
    }
}

impl std::fmt::Debug for FilterContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterContext")
            .field("options", &self.options)
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}
