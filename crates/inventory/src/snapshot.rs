//! Export/import bundle.
//!
//! Every section is optional on import: a present section replaces the stored
//! one wholesale, an absent section leaves stored data alone.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kennel_core::{DomainError, DomainResult};

use crate::activity::ActivityEvent;
use crate::item::InventoryItem;
use crate::presets::PresetRegistry;
use crate::reorder::{ReorderBook, ReorderRequest};
use crate::settings::Settings;

/// Bundle format written by this version.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotBundle {
    #[serde(default)]
    pub exported_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<InventoryItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<Vec<ActivityEvent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presets: Option<PresetRegistry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reorders: Option<Vec<ReorderRequest>>,
    /// Missing in hand-written bundles; 0 is rejected by [`Self::validate`].
    #[serde(default)]
    pub version: u32,
}

impl SnapshotBundle {
    /// A bundle with every section present.
    pub fn full(
        exported_at: DateTime<Utc>,
        items: Vec<InventoryItem>,
        activity: Vec<ActivityEvent>,
        settings: Settings,
        presets: PresetRegistry,
        reorders: Vec<ReorderRequest>,
    ) -> Self {
        Self {
            exported_at,
            items: Some(items),
            activity: Some(activity),
            settings: Some(settings),
            presets: Some(presets),
            reorders: Some(reorders),
            version: SNAPSHOT_VERSION,
        }
    }

    /// Shape checks for a well-formed bundle.
    pub fn validate(&self) -> DomainResult<()> {
        if self.version != SNAPSHOT_VERSION {
            return Err(DomainError::validation(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                self.version
            )));
        }

        if let Some(items) = &self.items {
            let mut seen = HashSet::with_capacity(items.len());
            for item in items {
                if !seen.insert(item.item_id()) {
                    return Err(DomainError::validation(format!(
                        "duplicate item id {}",
                        item.item_id()
                    )));
                }
                item.validate()?;
            }
        }

        if let Some(activity) = &self.activity {
            for event in activity {
                event.validate()?;
            }
        }

        if let Some(settings) = &self.settings {
            settings.validate()?;
        }

        if let Some(reorders) = &self.reorders {
            ReorderBook::from_requests(reorders.clone())?;
        }

        Ok(())
    }
}
