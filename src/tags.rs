//! Tag lookups behind the `tag` and `tag_id` filters.

use async_trait::async_trait;
use sea_orm::DbErr;

use crate::changelog::ObjectId;

/// Name of the virtual field targeted by tag filters.
pub const TAGS_FIELD: &str = "tags";

/// Reference to a tag as given in a query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagRef {
    Slug(String),
    Id(i64),
}

impl std::fmt::Display for TagRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Slug(slug) => f.write_str(slug),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

/// Index of tag assignments.
#[async_trait]
pub trait TagIndex: Send + Sync {
    /// Ids of objects of `content_type` carrying `tag`, or `None` if the tag does not exist.
    async fn tagged_object_ids(
        &self,
        content_type: &str,
        tag: &TagRef,
    ) -> Result<Option<Vec<ObjectId>>, DbErr>;
}
