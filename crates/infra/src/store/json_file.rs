//! Single-file JSON store.
//!
//! The whole document is rewritten on every write (temp file + rename), which
//! is fine at kennel scale. A write that fails on disk leaves both the file and
//! the in-memory copy at their previous state.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use kennel_core::ItemId;
use kennel_inventory::{
    ActivityLog, AlertGate, InventoryItem, Kind, PresetRegistry, ReorderBook, Settings,
};

use super::document::{LedgerDocument, StoredDocument};
use super::{Commit, LedgerStore, StoreError, StoreSections};

#[derive(Debug)]
pub struct JsonFileLedgerStore {
    path: PathBuf,
    document: RwLock<LedgerDocument>,
}

impl JsonFileLedgerStore {
    /// Open `path`, starting from an empty ledger if the file does not exist
    /// yet. Nothing is written until the first mutation.
    pub fn open(path: impl Into<PathBuf>, activity_cap: usize) -> Result<Self, StoreError> {
        let path = path.into();
        let document = match fs::read(&path) {
            Ok(bytes) => {
                let stored: StoredDocument = serde_json::from_slice(&bytes)?;
                LedgerDocument::from_stored(stored, activity_cap)?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => LedgerDocument::new(activity_cap),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        tracing::debug!(path = %path.display(), items = document.items.len(), "opened ledger file");

        Ok(Self {
            path,
            document: RwLock::new(document),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read<T>(&self, f: impl FnOnce(&LedgerDocument) -> T) -> Result<T, StoreError> {
        let doc = self.document.read().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&doc))
    }

    /// Apply `f` to a copy, persist the copy, then publish it in memory.
    fn write<T>(&self, f: impl FnOnce(&mut LedgerDocument) -> T) -> Result<T, StoreError> {
        let mut doc = self.document.write().map_err(|_| StoreError::Poisoned)?;
        let mut next = doc.clone();
        let out = f(&mut next);
        self.persist(&next)?;
        *doc = next;
        Ok(out)
    }

    fn persist(&self, doc: &LedgerDocument) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let bytes = serde_json::to_vec_pretty(&doc.to_stored())?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl LedgerStore for JsonFileLedgerStore {
    fn get_item(&self, item_id: ItemId) -> Result<Option<InventoryItem>, StoreError> {
        self.read(|doc| doc.items.get(&item_id).cloned())
    }

    fn list_items(&self) -> Result<Vec<InventoryItem>, StoreError> {
        self.read(|doc| doc.items.values().cloned().collect())
    }

    fn commit(&self, commit: Commit) -> Result<(), StoreError> {
        self.write(|doc| doc.apply_commit(commit))
    }

    fn activity(&self) -> Result<ActivityLog, StoreError> {
        self.read(|doc| doc.activity.clone())
    }

    fn clear_activity(&self, kind: Kind) -> Result<usize, StoreError> {
        self.write(|doc| doc.activity.clear(kind))
    }

    fn settings(&self) -> Result<Settings, StoreError> {
        self.read(|doc| doc.settings.clone())
    }

    fn presets(&self) -> Result<PresetRegistry, StoreError> {
        self.read(|doc| doc.presets.clone())
    }

    fn reorders(&self) -> Result<ReorderBook, StoreError> {
        self.read(|doc| doc.reorders.clone())
    }

    fn alert_gate(&self) -> Result<AlertGate, StoreError> {
        self.read(|doc| doc.alerts.clone())
    }

    fn put_alert_gate(&self, gate: AlertGate) -> Result<(), StoreError> {
        self.write(|doc| doc.alerts = gate)
    }

    fn replace_sections(&self, sections: StoreSections) -> Result<(), StoreError> {
        self.write(|doc| doc.apply_sections(sections))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kennel_inventory::{ActivityEvent, NewItem};

    fn kibble() -> InventoryItem {
        InventoryItem::create(
            ItemId::new(),
            NewItem::new("Kibble", Kind::Edible).with_seed(3.0),
            "On hand",
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn missing_file_starts_empty_and_is_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let store = JsonFileLedgerStore::open(&path, 10).unwrap();
        assert!(store.list_items().unwrap().is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn commits_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.json");
        let item = kibble();
        let event = ActivityEvent::created(&item, Utc::now());

        {
            let store = JsonFileLedgerStore::open(&path, 10).unwrap();
            store.commit(Commit::item(item.clone(), Some(event.clone()))).unwrap();
        }

        let reopened = JsonFileLedgerStore::open(&path, 10).unwrap();
        assert_eq!(reopened.get_item(item.item_id()).unwrap(), Some(item));
        assert_eq!(reopened.activity().unwrap().to_vec(), vec![event]);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        fs::write(&path, b"{ not json").unwrap();
        assert!(matches!(
            JsonFileLedgerStore::open(&path, 10),
            Err(StoreError::Serialization(_))
        ));
    }
}
