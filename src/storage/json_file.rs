use crate::error::{Error, Result};
use crate::storage::memory::ItemCollections;
use crate::storage::{ItemKind, ItemPatch, NewItem, StorageCollaborator, StoredItem};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Store that mirrors every mutation to a pretty-printed JSON file
#[derive(Debug)]
pub struct JsonFileStore {
    storage_path: PathBuf,
    items: Mutex<ItemCollections>,
}

impl JsonFileStore {
    /// Open the store at `path`, loading existing items if the file exists
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let storage_path = path.as_ref().to_path_buf();
        let items = Self::load_items(&storage_path)?;
        tracing::debug!(path = %storage_path.display(), items = items.total(), "Opened item store.");
        Ok(Self {
            storage_path,
            items: Mutex::new(items),
        })
    }

    pub fn path(&self) -> &Path {
        &self.storage_path
    }

    fn load_items(path: &Path) -> Result<ItemCollections> {
        if !path.exists() {
            return Ok(ItemCollections::default());
        }

        let contents = fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(ItemCollections::default());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn save_items(&self, items: &ItemCollections) -> Result<()> {
        if let Some(parent) = self.storage_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(items)?;
        fs::write(&self.storage_path, json)?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, ItemCollections>> {
        self.items
            .lock()
            .map_err(|_| Error::storage("item store lock poisoned"))
    }

    /// Run a mutation and persist; the in-memory state is rolled back if the write fails
    fn mutate<T>(&self, op: impl FnOnce(&mut ItemCollections) -> Result<T>) -> Result<T> {
        let mut items = self.lock()?;
        let snapshot = items.clone();
        let value = op(&mut items)?;
        if let Err(e) = self.save_items(&items) {
            *items = snapshot;
            return Err(Error::storage(format!(
                "failed to write {}: {}",
                self.storage_path.display(),
                e
            )));
        }
        Ok(value)
    }
}

impl StorageCollaborator for JsonFileStore {
    fn list(&self, kind: ItemKind) -> Result<Vec<StoredItem>> {
        Ok(self.lock()?.list(kind))
    }

    fn create(&self, kind: ItemKind, item: NewItem) -> Result<StoredItem> {
        self.mutate(|items| items.create(kind, item))
    }

    fn delete(&self, kind: ItemKind, predicate: &dyn Fn(&StoredItem) -> bool) -> Result<usize> {
        self.mutate(|items| Ok(items.delete(kind, predicate)))
    }

    fn update(&self, kind: ItemKind, id: &str, patch: ItemPatch) -> Result<StoredItem> {
        self.mutate(|items| items.update(kind, id, &patch))
    }
}
