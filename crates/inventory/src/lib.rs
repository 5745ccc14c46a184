//! Inventory location-bucket ledger (pure domain).
//!
//! Items, their per-location quantities, the bounded activity log, low-stock
//! rules, presets, settings and reorder requests. No IO lives here; storage,
//! locking and notification fan-out are in `kennel-infra`.

pub mod activity;
pub mod item;
pub mod kind;
pub mod ledger;
pub mod low_stock;
pub mod notification;
pub mod presets;
pub mod reorder;
pub mod settings;
pub mod snapshot;

pub use activity::{ActivityEvent, ActivityLog, ActivityType, DEFAULT_ACTIVITY_CAP};
pub use item::{Identifier, InventoryItem, ItemPatch, NewItem};
pub use kind::Kind;
pub use ledger::{ReduceMode, ReduceReason};
pub use low_stock::{AlertGate, LowStockAlert, LowStockEntry, LowStockEvaluator, StockStatus};
pub use notification::{LedgerChange, LedgerNotification};
pub use presets::{KindPresets, PresetRegistry, PresetType};
pub use reorder::{ReorderBook, ReorderRequest};
pub use settings::{DEFAULT_SOURCE_BUCKET, KindSettings, Settings, SettingsPatch};
pub use snapshot::{SNAPSHOT_VERSION, SnapshotBundle};
