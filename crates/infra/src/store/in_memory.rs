//! In-memory ledger store for tests/dev.

use std::sync::RwLock;

use kennel_core::ItemId;
use kennel_inventory::{
    ActivityLog, AlertGate, DEFAULT_ACTIVITY_CAP, InventoryItem, Kind, PresetRegistry,
    ReorderBook, Settings,
};

use super::document::LedgerDocument;
use super::{Commit, LedgerStore, StoreError, StoreSections};

#[derive(Debug)]
pub struct InMemoryLedgerStore {
    document: RwLock<LedgerDocument>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::with_activity_cap(DEFAULT_ACTIVITY_CAP)
    }

    pub fn with_activity_cap(cap: usize) -> Self {
        Self::from_document(LedgerDocument::new(cap))
    }

    pub fn from_document(document: LedgerDocument) -> Self {
        Self {
            document: RwLock::new(document),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&LedgerDocument) -> T) -> Result<T, StoreError> {
        let doc = self.document.read().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&doc))
    }

    fn write<T>(&self, f: impl FnOnce(&mut LedgerDocument) -> T) -> Result<T, StoreError> {
        let mut doc = self.document.write().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&mut doc))
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStore for InMemoryLedgerStore {
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
