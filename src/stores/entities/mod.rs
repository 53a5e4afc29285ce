//! Tables backing the Sea-ORM collaborator stores.

pub mod custom_field;
pub mod object_change;
pub mod saved_filter;
pub mod tag;
pub mod tagged_item;
