//! Storage Module
//!
//! The understanding layer never owns notes, flashcards or schedule entries.
//! It asks a `StorageCollaborator` to list, create, delete and update them and
//! treats the store as the source of truth for existence and counts.

pub mod items;
pub mod json_file;
pub mod memory;

use crate::error::Result;

// Re-export main types
pub use items::{Flashcard, ItemKind, ItemPatch, NewItem, Note, ScheduleEntry, StoredItem};
pub use json_file::JsonFileStore;
pub use memory::InMemoryStore;

/// CRUD surface over the persisted study items.
///
/// Implementations must give read-after-write consistency to a single caller;
/// no cross-process locking is expected.
pub trait StorageCollaborator: Send + Sync {
    fn list(&self, kind: ItemKind) -> Result<Vec<StoredItem>>;

    fn create(&self, kind: ItemKind, item: NewItem) -> Result<StoredItem>;

    /// Remove every item of `kind` matching `predicate`, returning how many went.
    fn delete(&self, kind: ItemKind, predicate: &dyn Fn(&StoredItem) -> bool) -> Result<usize>;

    fn update(&self, kind: ItemKind, id: &str, patch: ItemPatch) -> Result<StoredItem>;
}
