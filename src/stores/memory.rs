//! In-memory collaborator stores.
//!
//! Useful for tests and for applications that keep their saved filters,
//! custom fields and tags in configuration rather than in the database.

use std::collections::BTreeSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use sea_orm::DbErr;
use uuid::Uuid;

use crate::changelog::{ChangeAction, ChangeLog, ObjectId};
use crate::custom_fields::{CustomField, CustomFieldStore};
use crate::saved::{SavedFilter, SavedFilterStore};
use crate::tags::{TagIndex, TagRef};

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, DbErr> {
    lock.read()
        .map_err(|_| DbErr::Custom("in-memory store lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, DbErr> {
    lock.write()
        .map_err(|_| DbErr::Custom("in-memory store lock poisoned".to_string()))
}

#[derive(Debug, Default)]
pub struct MemorySavedFilters {
    filters: RwLock<Vec<SavedFilter>>,
}

impl MemorySavedFilters {
    pub fn new(filters: impl IntoIterator<Item = SavedFilter>) -> Self {
        Self {
            filters: RwLock::new(filters.into_iter().collect()),
        }
    }

    /// # Errors
    ///
    /// Fails only if the store lock is poisoned.
    pub fn insert(&self, filter: SavedFilter) -> Result<(), DbErr> {
        write(&self.filters)?.push(filter);
        Ok(())
    }
}

#[async_trait]
impl SavedFilterStore for MemorySavedFilters {
    async fn lookup(&self, slugs: &[String], ids: &[i64]) -> Result<Vec<SavedFilter>, DbErr> {
        Ok(read(&self.filters)?
            .iter()
            .filter(|filter| slugs.contains(&filter.slug) || ids.contains(&filter.id))
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct MemoryCustomFields {
    fields: RwLock<Vec<CustomField>>,
}

impl MemoryCustomFields {
    pub fn new(fields: impl IntoIterator<Item = CustomField>) -> Self {
        Self {
            fields: RwLock::new(fields.into_iter().collect()),
        }
    }

    /// # Errors
    ///
    /// Fails only if the store lock is poisoned.
    pub fn insert(&self, field: CustomField) -> Result<(), DbErr> {
        write(&self.fields)?.push(field);
        Ok(())
    }
}

#[async_trait]
impl CustomFieldStore for MemoryCustomFields {
    async fn list_for_content_type(&self, content_type: &str) -> Result<Vec<CustomField>, DbErr> {
        Ok(read(&self.fields)?
            .iter()
            .filter(|field| field.object_types.iter().any(|t| t == content_type))
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone)]
struct ChangeRecord {
    content_type: String,
    object_id: ObjectId,
    request_id: Uuid,
    action: ChangeAction,
}

#[derive(Debug, Default)]
pub struct MemoryChangeLog {
    records: RwLock<Vec<ChangeRecord>>,
}

impl MemoryChangeLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `request_id` applied `action` to an object.
    ///
    /// # Errors
    ///
    /// Fails only if the store lock is poisoned.
    pub fn record(
        &self,
        content_type: impl Into<String>,
        object_id: ObjectId,
        request_id: Uuid,
        action: ChangeAction,
    ) -> Result<(), DbErr> {
        write(&self.records)?.push(ChangeRecord {
            content_type: content_type.into(),
            object_id,
            request_id,
            action,
        });
        Ok(())
    }
}

#[async_trait]
impl ChangeLog for MemoryChangeLog {
    async fn object_ids_for_request(
        &self,
        content_type: &str,
        request_id: Uuid,
        actions: &[ChangeAction],
    ) -> Result<Vec<ObjectId>, DbErr> {
        let ids: BTreeSet<ObjectId> = read(&self.records)?
            .iter()
            .filter(|record| {
                record.request_id == request_id
                    && record.content_type == content_type
                    && actions.contains(&record.action)
            })
            .map(|record| record.object_id)
            .collect();
        Ok(ids.into_iter().collect())
    }
}

#[derive(Debug, Default)]
struct TagTables {
    /// (id, slug)
    tags: Vec<(i64, String)>,
    /// (tag id, content type, object id)
    assignments: Vec<(i64, String, ObjectId)>,
}

#[derive(Debug, Default)]
pub struct MemoryTags {
    tables: RwLock<TagTables>,
}

impl MemoryTags {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Fails only if the store lock is poisoned.
    pub fn add_tag(&self, id: i64, slug: impl Into<String>) -> Result<(), DbErr> {
        write(&self.tables)?.tags.push((id, slug.into()));
        Ok(())
    }

    /// # Errors
    ///
    /// Fails only if the store lock is poisoned.
    pub fn tag_object(
        &self,
        tag_id: i64,
        content_type: impl Into<String>,
        object_id: ObjectId,
    ) -> Result<(), DbErr> {
        write(&self.tables)?
            .assignments
            .push((tag_id, content_type.into(), object_id));
        Ok(())
    }
}

#[async_trait]
impl TagIndex for MemoryTags {
    async fn tagged_object_ids(
        &self,
        content_type: &str,
        tag: &TagRef,
    ) -> Result<Option<Vec<ObjectId>>, DbErr> {
        let tables = read(&self.tables)?;
        let tag_id = tables.tags.iter().find_map(|(id, slug)| {
            let matches = match tag {
                TagRef::Slug(wanted) => slug == wanted,
                TagRef::Id(wanted) => id == wanted,
            };
            matches.then_some(*id)
        });
        let Some(tag_id) = tag_id else {
            return Ok(None);
        };

        let ids: BTreeSet<ObjectId> = tables
            .assignments
            .iter()
            .filter(|(assigned, ct, _)| *assigned == tag_id && ct == content_type)
            .map(|(_, _, object_id)| *object_id)
            .collect();
        Ok(Some(ids.into_iter().collect()))
    }
}
