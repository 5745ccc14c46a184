//! The ledger state shared by every store backend.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use kennel_core::ItemId;
use kennel_inventory::{
    ActivityEvent, ActivityLog, AlertGate, InventoryItem, PresetRegistry, ReorderBook,
    ReorderRequest, Settings, ledger,
};

use super::{Commit, StoreError, StoreSections};

/// On-disk layout: independent sections correlated by `itemId` / `kind`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument {
    #[serde(default)]
    pub items: Vec<InventoryItem>,
    #[serde(default)]
    pub activity: Vec<ActivityEvent>,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub presets: PresetRegistry,
    #[serde(default)]
    pub reorders: Vec<ReorderRequest>,
    #[serde(default)]
    pub alerts: AlertGate,
}

/// In-memory form of the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerDocument {
    pub items: BTreeMap<ItemId, InventoryItem>,
    pub activity: ActivityLog,
    pub settings: Settings,
    pub presets: PresetRegistry,
    pub reorders: ReorderBook,
    pub alerts: AlertGate,
}

impl LedgerDocument {
    pub fn new(activity_cap: usize) -> Self {
        let settings = Settings::default();
        Self {
            items: BTreeMap::new(),
            activity: ActivityLog::new(activity_cap),
            presets: PresetRegistry::with_defaults(&settings),
            settings,
            reorders: ReorderBook::new(),
            alerts: AlertGate::new(),
        }
    }

    /// Load a stored document, migrating legacy items and restoring preset
    /// invariants.
    pub fn from_stored(stored: StoredDocument, activity_cap: usize) -> Result<Self, StoreError> {
        let settings = stored.settings;
        let mut items = BTreeMap::new();
        for mut item in stored.items {
            let kind = item.kind();
            ledger::normalize(&mut item, settings.default_bucket(kind));
            if items.insert(item.item_id(), item).is_some() {
                return Err(StoreError::Corrupt("duplicate item id".to_string()));
            }
        }

        let mut presets = stored.presets;
        presets.reconcile(&settings);

        let reorders = ReorderBook::from_requests(stored.reorders)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        Ok(Self {
            items,
            activity: ActivityLog::from_events(stored.activity, activity_cap),
            settings,
            presets,
            reorders,
            alerts: stored.alerts,
        })
    }

    pub fn to_stored(&self) -> StoredDocument {
        StoredDocument {
            items: self.items.values().cloned().collect(),
            activity: self.activity.to_vec(),
            settings: self.settings.clone(),
            presets: self.presets.clone(),
            reorders: self.reorders.requests().to_vec(),
            alerts: self.alerts.clone(),
        }
    }

    pub fn apply_commit(&mut self, commit: Commit) {
        for item in commit.items {
            self.items.insert(item.item_id(), item);
        }
        for event in commit.activity {
            self.activity.append(event);
        }
        if let Some(reorders) = commit.reorders {
            self.reorders = reorders;
        }
    }

    pub fn apply_sections(&mut self, sections: StoreSections) {
        if let Some(items) = sections.items {
            self.items = items.into_iter().map(|i| (i.item_id(), i)).collect();
        }
        if let Some(activity) = sections.activity {
            self.activity = ActivityLog::from_events(activity, self.activity.cap());
        }
        if let Some(settings) = sections.settings {
            self.settings = settings;
        }
        if let Some(presets) = sections.presets {
            self.presets = presets;
        }
        if let Some(reorders) = sections.reorders {
            self.reorders = reorders;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kennel_inventory::{Kind, NewItem, PresetType};

    #[test]
    fn loading_migrates_items_without_locations() {
        let json = serde_json::json!({
            "items": [{ "itemId": ItemId::new(), "name": "Kibble", "kind": "edible", "qty": 12 }],
            "settings": {
                "edible": { "defaultMinOnHand": 0, "enableLowAlerts": true, "defaultSourceBucketName": "Pantry" }
            }
        });
        let stored: StoredDocument = serde_json::from_value(json).unwrap();
        let doc = LedgerDocument::from_stored(stored, 10).unwrap();

        let item = doc.items.values().next().unwrap();
        assert_eq!(item.bucket("Pantry"), Some(12.0));
        assert_eq!(doc.presets.list(Kind::Edible, PresetType::Source), ["Pantry"]);
    }

    #[test]
    fn commit_appends_activity_in_order() {
        let mut doc = LedgerDocument::new(10);
        let item = InventoryItem::create(
            ItemId::new(),
            NewItem::new("Kibble", Kind::Edible),
            "On hand",
            Utc::now(),
        )
        .unwrap();
        let first = ActivityEvent::created(&item, Utc::now());
        let second = ActivityEvent::added(&item, "On hand", 1.0, Utc::now());

        doc.apply_commit(Commit {
            items: vec![item],
            activity: vec![first, second.clone()],
            reorders: None,
        });

        assert_eq!(doc.items.len(), 1);
        assert_eq!(doc.activity.iter().next(), Some(&second));
    }
}
