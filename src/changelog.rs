//! Change-log lookups behind the `*_by_request` filters.

use async_trait::async_trait;
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Primary key of a filtered object.
pub type ObjectId = i64;

/// Kind of change recorded against an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
}

impl ChangeAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

pub const CREATED_BY_REQUEST: &[ChangeAction] = &[ChangeAction::Create];
pub const UPDATED_BY_REQUEST: &[ChangeAction] = &[ChangeAction::Update];
pub const MODIFIED_BY_REQUEST: &[ChangeAction] = &[ChangeAction::Create, ChangeAction::Update];

/// Index of recorded object changes.
#[async_trait]
pub trait ChangeLog: Send + Sync {
    /// Ids of objects of `content_type` changed by `request_id` with one of `actions`.
    /// Unknown request ids yield an empty list.
    async fn object_ids_for_request(
        &self,
        content_type: &str,
        request_id: Uuid,
        actions: &[ChangeAction],
    ) -> Result<Vec<ObjectId>, DbErr>;
}
