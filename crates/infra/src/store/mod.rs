//! Ledger persistence.
//!
//! [`LedgerStore`] exposes per-record writes: a [`Commit`] carries the items,
//! audit entries and reorder book touched by one operation and is applied as a
//! unit. Backends:
//!
//! - [`InMemoryLedgerStore`] for tests/dev
//! - [`JsonFileLedgerStore`] rewriting one JSON document atomically per write

pub mod document;
pub mod in_memory;
pub mod json_file;

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use kennel_core::ItemId;
use kennel_inventory::{
    ActivityEvent, ActivityLog, AlertGate, InventoryItem, Kind, PresetRegistry, ReorderBook,
    Settings,
};

pub use document::{LedgerDocument, StoredDocument};
pub use in_memory::InMemoryLedgerStore;
pub use json_file::JsonFileLedgerStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to (de)serialize ledger document: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("ledger document is corrupt: {0}")]
    Corrupt(String),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Records written together by one ledger operation.
#[derive(Debug, Clone, Default)]
pub struct Commit {
    pub items: Vec<InventoryItem>,
    /// Appended oldest-first, so the last entry ends up most recent.
    pub activity: Vec<ActivityEvent>,
    pub reorders: Option<ReorderBook>,
}

impl Commit {
    pub fn item(item: InventoryItem, activity: Option<ActivityEvent>) -> Self {
        Self {
            items: vec![item],
            activity: activity.into_iter().collect(),
            reorders: None,
        }
    }
}

/// Whole-section replacement (imports, configuration edits). `None` leaves a
/// section untouched.
#[derive(Debug, Clone, Default)]
pub struct StoreSections {
    pub items: Option<Vec<InventoryItem>>,
    pub activity: Option<Vec<ActivityEvent>>,
    pub settings: Option<Settings>,
    pub presets: Option<PresetRegistry>,
    pub reorders: Option<ReorderBook>,
}

/// Persistence contract for the ledger.
///
/// Reads return owned copies; writers hold no borrow into the store.
pub trait LedgerStore: Send + Sync {
    fn get_item(&self, item_id: ItemId) -> Result<Option<InventoryItem>, StoreError>;

    /// Every stored item, ordered by id.
    fn list_items(&self) -> Result<Vec<InventoryItem>, StoreError>;

    fn commit(&self, commit: Commit) -> Result<(), StoreError>;

    fn activity(&self) -> Result<ActivityLog, StoreError>;

    /// Remove one kind's events; returns how many were dropped.
    fn clear_activity(&self, kind: Kind) -> Result<usize, StoreError>;

    fn settings(&self) -> Result<Settings, StoreError>;

    fn presets(&self) -> Result<PresetRegistry, StoreError>;

    fn reorders(&self) -> Result<ReorderBook, StoreError>;

    fn alert_gate(&self) -> Result<AlertGate, StoreError>;

    fn put_alert_gate(&self, gate: AlertGate) -> Result<(), StoreError>;

    fn replace_sections(&self, sections: StoreSections) -> Result<(), StoreError>;
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn get_item(&self, item_id: ItemId) -> Result<Option<InventoryItem>, StoreError> {
        (**self).get_item(item_id)
    }

    fn list_items(&self) -> Result<Vec<InventoryItem>, StoreError> {
        (**self).list_items()
    }

    fn commit(&self, commit: Commit) -> Result<(), StoreError> {
        (**self).commit(commit)
    }

    fn activity(&self) -> Result<ActivityLog, StoreError> {
        (**self).activity()
    }

    fn clear_activity(&self, kind: Kind) -> Result<usize, StoreError> {
        (**self).clear_activity(kind)
    }

    fn settings(&self) -> Result<Settings, StoreError> {
        (**self).settings()
    }

    fn presets(&self) -> Result<PresetRegistry, StoreError> {
        (**self).presets()
    }

    fn reorders(&self) -> Result<ReorderBook, StoreError> {
        (**self).reorders()
    }

    fn alert_gate(&self) -> Result<AlertGate, StoreError> {
        (**self).alert_gate()
    }

    fn put_alert_gate(&self, gate: AlertGate) -> Result<(), StoreError> {
        (**self).put_alert_gate(gate)
    }

    fn replace_sections(&self, sections: StoreSections) -> Result<(), StoreError> {
        (**self).replace_sections(sections)
    }
}
