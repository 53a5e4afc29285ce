//! Collaborator stores over a Sea-ORM connection.

use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use uuid::Uuid;

use super::entities::{custom_field, object_change, saved_filter, tag, tagged_item};
use crate::changelog::{ChangeAction, ChangeLog, ObjectId};
use crate::custom_fields::{CustomField, CustomFieldStore};
use crate::saved::{SavedFilter, SavedFilterStore};
use crate::tags::{TagIndex, TagRef};

/// All four stores over one database connection.
#[derive(Debug, Clone)]
pub struct SeaStore {
    db: DatabaseConnection,
}

impl SeaStore {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    #[must_use]
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl SavedFilterStore for SeaStore {
    async fn lookup(&self, slugs: &[String], ids: &[i64]) -> Result<Vec<SavedFilter>, DbErr> {
        let references = Condition::any()
            .add(saved_filter::Column::Slug.is_in(slugs.iter().cloned()))
            .add(saved_filter::Column::Id.is_in(ids.iter().copied()));

        let models = saved_filter::Entity::find()
            .filter(references)
            .filter(saved_filter::Column::Enabled.eq(true))
            .order_by_asc(saved_filter::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(SavedFilter::from).collect())
    }
}

#[async_trait]
impl CustomFieldStore for SeaStore {
    async fn list_for_content_type(&self, content_type: &str) -> Result<Vec<CustomField>, DbErr> {
        let models = custom_field::Entity::find()
            .order_by_asc(custom_field::Column::Weight)
            .order_by_asc(custom_field::Column::Name)
            .all(&self.db)
            .await?;

        let mut fields = Vec::new();
        for model in models.into_iter().filter(|m| m.applies_to(content_type)) {
            let name = model.name.clone();
            match CustomField::try_from(model) {
                Ok(field) => fields.push(field),
                Err(err) => tracing::warn!(custom_field = %name, error = %err, "skipping unreadable custom field"),
            }
        }
        Ok(fields)
    }
}

#[async_trait]
impl ChangeLog for SeaStore {
    async fn object_ids_for_request(
        &self,
        content_type: &str,
        request_id: Uuid,
        actions: &[ChangeAction],
    ) -> Result<Vec<ObjectId>, DbErr> {
        object_change::Entity::find()
            .select_only()
            .column(object_change::Column::ChangedObjectId)
            .distinct()
            .filter(object_change::Column::ChangedObjectType.eq(content_type))
            .filter(object_change::Column::RequestId.eq(request_id))
            .filter(object_change::Column::Action.is_in(actions.iter().map(|a| a.as_str())))
            .order_by_asc(object_change::Column::ChangedObjectId)
            .into_tuple::<ObjectId>()
            .all(&self.db)
            .await
    }
}

#[async_trait]
impl TagIndex for SeaStore {
    async fn tagged_object_ids(
        &self,
        content_type: &str,
        tag_ref: &TagRef,
    ) -> Result<Option<Vec<ObjectId>>, DbErr> {
        let by_reference = match tag_ref {
            TagRef::Slug(slug) => tag::Column::Slug.eq(slug.as_str()),
            TagRef::Id(id) => tag::Column::Id.eq(*id),
        };
        let Some(found) = tag::Entity::find().filter(by_reference).one(&self.db).await? else {
            return Ok(None);
        };

        let ids = tagged_item::Entity::find()
            .select_only()
            .column(tagged_item::Column::ObjectId)
            .distinct()
            .filter(tagged_item::Column::TagId.eq(found.id))
            .filter(tagged_item::Column::ContentType.eq(content_type))
            .into_tuple::<ObjectId>()
            .all(&self.db)
            .await?;
        Ok(Some(ids))
    }
}
