//! Messages published after ledger changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kennel_core::ItemId;

use crate::kind::Kind;
use crate::low_stock::LowStockAlert;

/// What changed on an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LedgerChange {
    Created,
    Updated,
    Archived,
    Unarchived,
    Added,
    Reduced,
    Transferred,
    Reset,
    Reordered,
    ReorderReceived,
    ReorderCancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum LedgerNotification {
    /// An item was committed to the store.
    #[serde(rename_all = "camelCase")]
    Mutated {
        item_id: ItemId,
        kind: Kind,
        change: LedgerChange,
        at: DateTime<Utc>,
    },
    /// The first low-stock alert of the day for a kind.
    LowStock(LowStockAlert),
    /// Settings or presets of a kind changed.
    #[serde(rename_all = "camelCase")]
    ConfigurationChanged { kind: Kind, at: DateTime<Utc> },
    /// A snapshot import replaced one or more sections.
    #[serde(rename_all = "camelCase")]
    Imported { at: DateTime<Utc> },
}

impl LedgerNotification {
    pub fn item_id(&self) -> Option<ItemId> {
        match self {
            LedgerNotification::Mutated { item_id, .. } => Some(*item_id),
            _ => None,
        }
    }
}
