//! Implementations of the collaborator traits.
//!
//! [`memory`] keeps everything in process; [`sea`] reads the NetBox-style
//! tables described in [`entities`] through a Sea-ORM connection.

pub mod entities;
pub mod memory;
pub mod sea;

pub use memory::{MemoryChangeLog, MemoryCustomFields, MemorySavedFilters, MemoryTags};
pub use sea::SeaStore;
