use crate::error::{Error, Result};
use crate::storage::{ItemKind, ItemPatch, NewItem, StorageCollaborator, StoredItem};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};

/// Items grouped per kind; shared by the in-memory and JSON file stores
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemCollections {
    #[serde(default)]
    pub notes: Vec<StoredItem>,
    #[serde(default)]
    pub flashcards: Vec<StoredItem>,
    #[serde(default)]
    pub schedule: Vec<StoredItem>,
}

impl ItemCollections {
    fn bucket(&self, kind: ItemKind) -> &Vec<StoredItem> {
        match kind {
            ItemKind::Notes => &self.notes,
            ItemKind::Flashcards => &self.flashcards,
            ItemKind::Schedule => &self.schedule,
        }
    }

    fn bucket_mut(&mut self, kind: ItemKind) -> &mut Vec<StoredItem> {
        match kind {
            ItemKind::Notes => &mut self.notes,
            ItemKind::Flashcards => &mut self.flashcards,
            ItemKind::Schedule => &mut self.schedule,
        }
    }

    pub fn list(&self, kind: ItemKind) -> Vec<StoredItem> {
        self.bucket(kind).clone()
    }

    pub fn create(&mut self, kind: ItemKind, item: NewItem) -> Result<StoredItem> {
        if item.kind() != kind {
            return Err(Error::storage(format!(
                "cannot store a {} item among {}",
                item.kind(),
                kind
            )));
        }
        let stored = item.into_stored();
        self.bucket_mut(kind).push(stored.clone());
        Ok(stored)
    }

    pub fn delete(&mut self, kind: ItemKind, predicate: &dyn Fn(&StoredItem) -> bool) -> usize {
        let bucket = self.bucket_mut(kind);
        let before = bucket.len();
        bucket.retain(|item| !predicate(item));
        before - bucket.len()
    }

    pub fn update(&mut self, kind: ItemKind, id: &str, patch: &ItemPatch) -> Result<StoredItem> {
        let item = self
            .bucket_mut(kind)
            .iter_mut()
            .find(|item| item.id() == id)
            .ok_or_else(|| Error::storage(format!("no {} item with id '{}'", kind, id)))?;
        patch.apply(item);
        Ok(item.clone())
    }

    pub fn total(&self) -> usize {
        self.notes.len() + self.flashcards.len() + self.schedule.len()
    }
}

/// Volatile store, the default when no storage file is configured
#[derive(Debug, Default)]
pub struct InMemoryStore {
    items: Mutex<ItemCollections>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, ItemCollections>> {
        self.items
            .lock()
            .map_err(|_| Error::storage("in-memory store lock poisoned"))
    }

    pub fn len(&self) -> usize {
        self.lock().map(|items| items.total()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageCollaborator for InMemoryStore {
    fn list(&self, kind: ItemKind) -> Result<Vec<StoredItem>> {
        Ok(self.lock()?.list(kind))
    }

    fn create(&self, kind: ItemKind, item: NewItem) -> Result<StoredItem> {
        self.lock()?.create(kind, item)
    }

    fn delete(&self, kind: ItemKind, predicate: &dyn Fn(&StoredItem) -> bool) -> Result<usize> {
        Ok(self.lock()?.delete(kind, predicate))
    }

    fn update(&self, kind: ItemKind, id: &str, patch: ItemPatch) -> Result<StoredItem> {
        self.lock()?.update(kind, id, &patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(question: &str, category: &str) -> NewItem {
        NewItem::Flashcard {
            question: question.to_string(),
            answer: "answer".to_string(),
            category: category.to_string(),
        }
    }

    #[test]
    fn test_create_and_list() {
        let store = InMemoryStore::new();
        store
            .create(ItemKind::Flashcards, card("Q1", "chemistry"))
            .unwrap();
        store
            .create(ItemKind::Flashcards, card("Q2", "physics"))
            .unwrap();

        assert_eq!(store.list(ItemKind::Flashcards).unwrap().len(), 2);
        assert!(store.list(ItemKind::Notes).unwrap().is_empty());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_rejects_kind_mismatch() {
        let store = InMemoryStore::new();
        let result = store.create(ItemKind::Notes, card("Q1", "chemistry"));
        assert!(matches!(result, Err(Error::StorageOperationFailed { .. })));
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_by_predicate() {
        let store = InMemoryStore::new();
        store.create(ItemKind::Flashcards, card("Q1", "chemistry")).unwrap();
        store.create(ItemKind::Flashcards, card("Q2", "physics")).unwrap();

        let removed = store
            .delete(ItemKind::Flashcards, &|item| item.matches_topic("chemistry"))
            .unwrap();
        assert_eq!(removed, 1);
        let left = store.list(ItemKind::Flashcards).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].category(), "physics");
    }

    #[test]
    fn test_update_unknown_id_fails() {
        let store = InMemoryStore::new();
        let result = store.update(ItemKind::Notes, "note_missing", ItemPatch::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_update_applies_patch() {
        let store = InMemoryStore::new();
        let created = store.create(ItemKind::Flashcards, card("Q1", "chemistry")).unwrap();
        let patch = ItemPatch {
            content: Some("new answer".to_string()),
            ..ItemPatch::default()
        };
        let updated = store
            .update(ItemKind::Flashcards, created.id(), patch)
            .unwrap();
        match updated {
            StoredItem::Flashcard(c) => assert_eq!(c.answer, "new answer"),
            _ => panic!("expected flashcard"),
        }
    }
}
