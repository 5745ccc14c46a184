//! Bounded audit trail of ledger mutations.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kennel_core::{DomainError, DomainResult, ItemId};
use kennel_events::Event;

use crate::item::InventoryItem;
use crate::kind::Kind;
use crate::ledger::ReduceReason;

/// Retained events when no cap is configured.
pub const DEFAULT_ACTIVITY_CAP: usize = 500;

/// What happened to an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ActivityType {
    Create,
    AddQuantity,
    ReduceQuantity { reason: ReduceReason },
    TransferQuantity,
    Reorder,
    Reset,
}

/// Immutable audit record.
///
/// `quantity` is always the amount that actually changed (e.g. the clamped
/// amount of a reduction, the previous total of a reset).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    #[serde(flatten)]
    pub activity: ActivityType,
    pub kind: Kind,
    pub item_id: ItemId,
    pub item_name: String,
    pub quantity: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

impl ActivityEvent {
    fn base(activity: ActivityType, item: &InventoryItem, quantity: f64, at: DateTime<Utc>) -> Self {
        Self {
            activity,
            kind: item.kind(),
            item_id: item.item_id(),
            item_name: item.name().to_string(),
            quantity,
            timestamp: at,
            note: None,
            location: None,
            from: None,
            to: None,
        }
    }

    pub fn created(item: &InventoryItem, at: DateTime<Utc>) -> Self {
        Self::base(ActivityType::Create, item, item.quantity(), at)
    }

    pub fn added(item: &InventoryItem, location: &str, quantity: f64, at: DateTime<Utc>) -> Self {
        Self {
            location: Some(location.to_string()),
            ..Self::base(ActivityType::AddQuantity, item, quantity, at)
        }
    }

    pub fn reduced(
        item: &InventoryItem,
        location: &str,
        quantity: f64,
        reason: ReduceReason,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            location: Some(location.to_string()),
            ..Self::base(ActivityType::ReduceQuantity { reason }, item, quantity, at)
        }
    }

    pub fn transferred(
        item: &InventoryItem,
        from: &str,
        to: &str,
        quantity: f64,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            note: Some(format!("{from} -> {to}")),
            from: Some(from.to_string()),
            to: Some(to.to_string()),
            ..Self::base(ActivityType::TransferQuantity, item, quantity, at)
        }
    }

    pub fn reordered(item: &InventoryItem, vendor: &str, quantity: f64, at: DateTime<Utc>) -> Self {
        Self {
            note: Some(format!("ordered from {vendor}")),
            ..Self::base(ActivityType::Reorder, item, quantity, at)
        }
    }

    pub fn reset(item: &InventoryItem, previous_total: f64, at: DateTime<Utc>) -> Self {
        Self::base(ActivityType::Reset, item, previous_total, at)
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub(crate) fn validate(&self) -> DomainResult<()> {
        if !self.quantity.is_finite() || self.quantity < 0.0 {
            return Err(DomainError::validation(format!(
                "activity for item {} has invalid quantity {}",
                self.item_id, self.quantity
            )));
        }
        Ok(())
    }
}

impl Event for ActivityEvent {
    fn event_type(&self) -> &'static str {
        match self.activity {
            ActivityType::Create => "inventory.item.created",
            ActivityType::AddQuantity => "inventory.quantity.added",
            ActivityType::ReduceQuantity { .. } => "inventory.quantity.reduced",
            ActivityType::TransferQuantity => "inventory.quantity.transferred",
            ActivityType::Reorder => "inventory.item.reordered",
            ActivityType::Reset => "inventory.item.reset",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Most-recent-first ring buffer of [`ActivityEvent`]s.
///
/// Appending beyond the cap silently drops the oldest entries.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityLog {
    events: VecDeque<ActivityEvent>,
    cap: usize,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(DEFAULT_ACTIVITY_CAP)
    }
}

impl ActivityLog {
    /// A cap of zero is treated as one.
    pub fn new(cap: usize) -> Self {
        Self {
            events: VecDeque::new(),
            cap: cap.max(1),
        }
    }

    /// Rebuild from a stored most-recent-first list, truncating to `cap`.
    pub fn from_events(events: Vec<ActivityEvent>, cap: usize) -> Self {
        let mut log = Self::new(cap);
        log.events = events.into();
        log.events.truncate(log.cap);
        log
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn append(&mut self, event: ActivityEvent) {
        self.events.push_front(event);
        self.events.truncate(self.cap);
    }

    /// All events, most recent first.
    pub fn iter(&self) -> impl Iterator<Item = &ActivityEvent> {
        self.events.iter()
    }

    pub fn to_vec(&self) -> Vec<ActivityEvent> {
        self.events.iter().cloned().collect()
    }

    pub fn list_by_kind(&self, kind: Kind, limit: usize) -> Vec<ActivityEvent> {
        self.events
            .iter()
            .filter(|e| e.kind == kind)
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn list_for_item(&self, item_id: ItemId, limit: usize) -> Vec<ActivityEvent> {
        self.events
            .iter()
            .filter(|e| e.item_id == item_id)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Drop one kind's history; returns how many events were removed.
    pub fn clear(&mut self, kind: Kind) -> usize {
        let before = self.events.len();
        self.events.retain(|e| e.kind != kind);
        before - self.events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::NewItem;

    fn item(name: &str, kind: Kind) -> InventoryItem {
        InventoryItem::create(ItemId::new(), NewItem::new(name, kind), "On hand", Utc::now())
            .unwrap()
    }

    #[test]
    fn newest_first_and_bounded() {
        let kibble = item("Kibble", Kind::Edible);
        let mut log = ActivityLog::new(3);
        for q in 1..=5 {
            log.append(ActivityEvent::added(&kibble, "On hand", q as f64, Utc::now()));
        }

        assert_eq!(log.len(), 3);
        let quantities: Vec<f64> = log.iter().map(|e| e.quantity).collect();
        assert_eq!(quantities, [5.0, 4.0, 3.0]);
    }

    #[test]
    fn clear_only_touches_one_kind() {
        let kibble = item("Kibble", Kind::Edible);
        let leash = item("Leash", Kind::Inedible);
        let mut log = ActivityLog::default();
        log.append(ActivityEvent::created(&kibble, Utc::now()));
        log.append(ActivityEvent::created(&leash, Utc::now()));
        log.append(ActivityEvent::added(&kibble, "On hand", 1.0, Utc::now()));

        assert_eq!(log.clear(Kind::Edible), 2);
        assert_eq!(log.len(), 1);
        assert_eq!(log.list_by_kind(Kind::Inedible, 10).len(), 1);
        assert!(log.list_by_kind(Kind::Edible, 10).is_empty());
    }

    #[test]
    fn list_respects_limit_and_item_filter() {
        let kibble = item("Kibble", Kind::Edible);
        let treats = item("Treats", Kind::Edible);
        let mut log = ActivityLog::default();
        for _ in 0..4 {
            log.append(ActivityEvent::added(&kibble, "On hand", 1.0, Utc::now()));
            log.append(ActivityEvent::added(&treats, "On hand", 1.0, Utc::now()));
        }

        assert_eq!(log.list_by_kind(Kind::Edible, 5).len(), 5);
        let for_kibble = log.list_for_item(kibble.item_id(), 100);
        assert_eq!(for_kibble.len(), 4);
        assert!(for_kibble.iter().all(|e| e.item_id == kibble.item_id()));
    }

    #[test]
    fn serializes_reason_alongside_type() {
        let kibble = item("Kibble", Kind::Edible);
        let event = ActivityEvent::reduced(&kibble, "On hand", 2.0, ReduceReason::Discarded, Utc::now());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "reduceQuantity");
        assert_eq!(json["reason"], "discarded");
        assert_eq!(json["itemName"], "Kibble");

        let back: ActivityEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.event_type(), "inventory.quantity.reduced");
        assert_eq!(back.occurred_at(), event.timestamp);
    }
}
