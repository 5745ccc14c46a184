//! Low-stock evaluation (read side only).

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use kennel_core::ItemId;

use crate::item::InventoryItem;
use crate::kind::Kind;
use crate::settings::Settings;

/// Derived stock status of one item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockStatus {
    pub on_hand: f64,
    pub threshold: f64,
    pub low: bool,
}

/// One line of a low-stock alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockEntry {
    pub item_id: ItemId,
    pub name: String,
    pub on_hand: f64,
    pub threshold: f64,
}

/// The once-a-day notification for one kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockAlert {
    pub kind: Kind,
    pub date: NaiveDate,
    pub items: Vec<LowStockEntry>,
}

/// Pure low-stock rules over a [`Settings`] document.
#[derive(Debug, Clone, Copy)]
pub struct LowStockEvaluator<'a> {
    settings: &'a Settings,
}

impl<'a> LowStockEvaluator<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Quantity in the kind's default source bucket, or the aggregate when the
    /// item has no bucket of that name.
    pub fn on_hand_quantity(&self, item: &InventoryItem) -> f64 {
        item.bucket(self.settings.default_bucket(item.kind()))
            .unwrap_or_else(|| item.quantity())
    }

    /// The item's own `minOnHand`, else the kind default.
    pub fn threshold(&self, item: &InventoryItem) -> f64 {
        item.min_on_hand()
            .unwrap_or(self.settings.for_kind(item.kind()).default_min_on_hand)
    }

    /// Archived items and a threshold of 0 never count as low.
    pub fn is_low(&self, item: &InventoryItem) -> bool {
        let threshold = self.threshold(item);
        !item.is_archived() && threshold > 0.0 && self.on_hand_quantity(item) <= threshold
    }

    pub fn status(&self, item: &InventoryItem) -> StockStatus {
        StockStatus {
            on_hand: self.on_hand_quantity(item),
            threshold: self.threshold(item),
            low: self.is_low(item),
        }
    }

    /// Active items of `kind` that are low, sorted by name.
    pub fn low_items<'i>(
        &self,
        items: impl IntoIterator<Item = &'i InventoryItem>,
        kind: Kind,
    ) -> Vec<&'i InventoryItem> {
        let mut low: Vec<&InventoryItem> = items
            .into_iter()
            .filter(|item| item.is_listed(kind, false) && self.is_low(item))
            .collect();
        low.sort_by(|a, b| {
            a.name()
                .to_lowercase()
                .cmp(&b.name().to_lowercase())
                .then_with(|| a.item_id().cmp(&b.item_id()))
        });
        low
    }

    /// Produce today's alert for `kind` if alerts are enabled, something is
    /// low, and the gate has not fired for `(kind, date)` yet.
    pub fn daily_alert<'i>(
        &self,
        gate: &mut AlertGate,
        items: impl IntoIterator<Item = &'i InventoryItem>,
        kind: Kind,
        date: NaiveDate,
    ) -> Option<LowStockAlert> {
        if !self.settings.for_kind(kind).enable_low_alerts || gate.has_fired(kind, date) {
            return None;
        }
        let low = self.low_items(items, kind);
        if low.is_empty() {
            return None;
        }
        if !gate.try_fire(kind, date) {
            return None;
        }
        Some(LowStockAlert {
            kind,
            date,
            items: low
                .into_iter()
                .map(|item| LowStockEntry {
                    item_id: item.item_id(),
                    name: item.name().to_string(),
                    on_hand: self.on_hand_quantity(item),
                    threshold: self.threshold(item),
                })
                .collect(),
        })
    }
}

/// Cooldown ensuring at most one alert per `(kind, calendar date)`.
///
/// Only the most recent firing date per kind is kept; a date at or before it
/// never fires again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertGate {
    last_fired: BTreeMap<Kind, NaiveDate>,
}

impl AlertGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_fired(&self, kind: Kind, date: NaiveDate) -> bool {
        self.last_fired.get(&kind).is_some_and(|last| *last >= date)
    }

    /// Record a firing; returns `false` when one already happened for the key.
    pub fn try_fire(&mut self, kind: Kind, date: NaiveDate) -> bool {
        if self.has_fired(kind, date) {
            return false;
        }
        self.last_fired.insert(kind, date);
        true
    }

    pub fn last_fired(&self, kind: Kind) -> Option<NaiveDate> {
        self.last_fired.get(&kind).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    use crate::item::{ItemPatch, NewItem};
    use crate::ledger::{self, ReduceMode};

    fn item(name: &str, kind: Kind, on_hand: f64, min: Option<f64>) -> InventoryItem {
        let mut fields = NewItem::new(name, kind).with_seed(on_hand);
        fields.min_on_hand = min;
        InventoryItem::create(ItemId::new(), fields, "On hand", Utc::now()).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn threshold_boundaries() {
        let settings = Settings::default();
        let eval = LowStockEvaluator::new(&settings);

        let mut kibble = item("Kibble", Kind::Edible, 2.0, Some(2.0));
        assert!(eval.is_low(&kibble));

        ledger::add(&mut kibble, "On hand", 1.0).unwrap();
        assert!(!eval.is_low(&kibble));

        kibble
            .apply_patch(
                ItemPatch {
                    min_on_hand: Some(Some(0.0)),
                    ..ItemPatch::default()
                },
                Utc::now(),
            )
            .unwrap();
        ledger::reduce(&mut kibble, "On hand", 3.0, ReduceMode::Clamped).unwrap();
        assert_eq!(eval.on_hand_quantity(&kibble), 0.0);
        assert!(!eval.is_low(&kibble));
    }

    #[test]
    fn kind_default_applies_without_override() {
        let mut settings = Settings::default();
        settings.edible.default_min_on_hand = 5.0;
        let eval = LowStockEvaluator::new(&settings);

        let treats = item("Treats", Kind::Edible, 4.0, None);
        let leash = item("Leash", Kind::Inedible, 0.0, None);
        assert_eq!(eval.threshold(&treats), 5.0);
        assert!(eval.is_low(&treats));
        assert!(!eval.is_low(&leash));
    }

    #[test]
    fn on_hand_falls_back_to_aggregate() {
        let mut settings = Settings::default();
        let kibble = item("Kibble", Kind::Edible, 7.0, Some(1.0));
        settings.edible.default_source_bucket_name = "Pantry".into();
        let eval = LowStockEvaluator::new(&settings);
        assert_eq!(eval.on_hand_quantity(&kibble), 7.0);
    }

    #[test]
    fn on_hand_ignores_other_buckets() {
        let settings = Settings::default();
        let eval = LowStockEvaluator::new(&settings);
        let mut kibble = item("Kibble", Kind::Edible, 1.0, Some(2.0));
        ledger::add(&mut kibble, "Freezer", 40.0).unwrap();
        assert_eq!(eval.on_hand_quantity(&kibble), 1.0);
        assert!(eval.is_low(&kibble));
    }

    #[test]
    fn low_items_skips_archived_and_other_kinds() {
        let settings = Settings::default();
        let eval = LowStockEvaluator::new(&settings);
        let mut archived = item("Bones", Kind::Edible, 0.0, Some(1.0));
        archived.archive(Utc::now());
        let items = vec![
            item("treats", Kind::Edible, 0.0, Some(1.0)),
            item("Apples", Kind::Edible, 1.0, Some(1.0)),
            item("Kibble", Kind::Edible, 9.0, Some(1.0)),
            item("Leash", Kind::Inedible, 0.0, Some(1.0)),
            archived,
        ];

        let names: Vec<_> = eval
            .low_items(&items, Kind::Edible)
            .into_iter()
            .map(|i| i.name())
            .collect();
        assert_eq!(names, ["Apples", "treats"]);
    }

    #[test]
    fn archived_item_is_never_low() {
        let settings = Settings::default();
        let eval = LowStockEvaluator::new(&settings);
        let mut bones = item("Bones", Kind::Edible, 0.0, Some(3.0));
        assert!(eval.is_low(&bones));

        bones.archive(Utc::now());
        let status = eval.status(&bones);
        assert!(!status.low);
        assert_eq!(status.on_hand, 0.0);
        assert_eq!(status.threshold, 3.0);

        bones.unarchive(Utc::now());
        assert!(eval.is_low(&bones));
    }

    #[test]
    fn daily_alert_fires_once_per_kind_and_day() {
        let settings = Settings::default();
        let eval = LowStockEvaluator::new(&settings);
        let items = vec![
            item("Kibble", Kind::Edible, 0.0, Some(1.0)),
            item("Treats", Kind::Edible, 0.0, Some(1.0)),
            item("Leash", Kind::Inedible, 0.0, Some(1.0)),
        ];
        let mut gate = AlertGate::new();

        let alert = eval.daily_alert(&mut gate, &items, Kind::Edible, day(1)).unwrap();
        assert_eq!(alert.items.len(), 2);
        assert!(eval.daily_alert(&mut gate, &items, Kind::Edible, day(1)).is_none());
        assert!(eval.daily_alert(&mut gate, &items, Kind::Inedible, day(1)).is_some());
        assert!(eval.daily_alert(&mut gate, &items, Kind::Edible, day(2)).is_some());
        assert!(eval.daily_alert(&mut gate, &items, Kind::Edible, day(1)).is_none());
    }

    #[test]
    fn daily_alert_respects_toggle_and_empty_days() {
        let mut settings = Settings::default();
        settings.edible.enable_low_alerts = false;
        let eval = LowStockEvaluator::new(&settings);
        let mut gate = AlertGate::new();

        let low = vec![item("Kibble", Kind::Edible, 0.0, Some(1.0))];
        assert!(eval.daily_alert(&mut gate, &low, Kind::Edible, day(3)).is_none());

        let fine = vec![item("Leash", Kind::Inedible, 5.0, Some(1.0))];
        assert!(eval.daily_alert(&mut gate, &fine, Kind::Inedible, day(3)).is_none());
        // Nothing fired, so a later low item on the same day still alerts.
        assert!(!gate.has_fired(Kind::Inedible, day(3)));
    }

    proptest! {
        /// Property: `is_low` flips exactly at the threshold.
        #[test]
        fn is_low_is_monotone_in_on_hand(threshold in 1u32..500, on_hand in 0u32..1000) {
            let settings = Settings::default();
            let eval = LowStockEvaluator::new(&settings);
            let it = item("Kibble", Kind::Edible, on_hand as f64, Some(threshold as f64));
            prop_assert_eq!(eval.is_low(&it), on_hand <= threshold);
        }

        /// Property: however often it is asked, the gate opens once per key.
        #[test]
        fn gate_opens_once(calls in 1usize..50) {
            let mut gate = AlertGate::new();
            let opened = (0..calls).filter(|_| gate.try_fire(Kind::Edible, day(9))).count();
            prop_assert_eq!(opened, 1);
        }
    }
}
