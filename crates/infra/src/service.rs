//! Ledger service: the single mutation path of the inventory ledger.
//!
//! Every write runs the same pipeline:
//!
//! ```text
//! call
//!   ↓
//! 1. Lock the item (per-ItemId mutex under the shared barrier)
//!   ↓
//! 2. Load + normalize the item
//!   ↓
//! 3. Apply the pure ledger operation (fails without side effects)
//!   ↓
//! 4. Commit item + audit entry to the store in one write
//!   ↓
//! 5. Publish `LedgerNotification`s to subscribers
//! ```
//!
//! Reads go straight to the store and the pure [`LowStockEvaluator`].
//! The service owns no global state; construct one and pass it by reference.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use kennel_core::{DomainError, DomainResult, ItemId};
use kennel_events::{Event, EventBus, Subscription};
use kennel_inventory::{
    ActivityEvent, Identifier, InventoryItem, ItemPatch, Kind, KindSettings, LedgerChange,
    LedgerNotification, LowStockAlert, LowStockEvaluator, NewItem, PresetRegistry, PresetType,
    ReduceMode, ReduceReason, ReorderBook, ReorderRequest, Settings,
    SettingsPatch, SnapshotBundle, StockStatus, item, ledger,
};

use crate::clock::{Clock, SystemClock};
use crate::error::{LedgerError, LedgerResult};
use crate::locks::ItemLocks;
use crate::store::{Commit, LedgerStore, StoreSections};

/// Outcome of a quantity operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantityChange {
    pub item: InventoryItem,
    /// Amount actually added, removed, moved or reset (0 for a no-op).
    pub quantity: f64,
}

#[derive(Debug)]
pub struct LedgerService<S, B> {
    store: S,
    bus: B,
    clock: Arc<dyn Clock>,
    locks: ItemLocks,
    reduce_mode: ReduceMode,
}

impl<S, B> LedgerService<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self {
            store,
            bus,
            clock: Arc::new(SystemClock),
            locks: ItemLocks::new(),
            reduce_mode: ReduceMode::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_reduce_mode(mut self, mode: ReduceMode) -> Self {
        self.reduce_mode = mode;
        self
    }

    pub fn reduce_mode(&self) -> ReduceMode {
        self.reduce_mode
    }

    #[cfg(test)]
    pub(crate) fn tracked_item_locks(&self) -> usize {
        self.locks.tracked()
    }
}

impl<S, B> LedgerService<S, B>
where
    S: LedgerStore,
    B: EventBus<LedgerNotification>,
{
    pub fn subscribe(&self) -> Subscription<LedgerNotification> {
        self.bus.subscribe()
    }

    // ---------------------------------------------------------------------
    // Items
    // ---------------------------------------------------------------------

    pub fn create_item(&self, fields: NewItem) -> LedgerResult<InventoryItem> {
        let shared = self.locks.shared()?;
        let settings = self.store.settings()?;
        let now = self.clock.now();

        let bucket = settings.default_bucket(fields.kind);
        let item = InventoryItem::create(ItemId::new(), fields, bucket, now)?;

        let event = ActivityEvent::created(&item, now);
        self.store.commit(Commit::item(item.clone(), Some(event)))?;
        drop(shared);

        tracing::info!(item_id = %item.item_id(), kind = %item.kind(), name = item.name(), qty = item.quantity(), "item created");
        self.notify_mutated(&item, LedgerChange::Created, now);
        self.after_mutation(item.kind());
        Ok(item)
    }

    pub fn find_item(&self, item_id: ItemId) -> LedgerResult<InventoryItem> {
        let settings = self.store.settings()?;
        self.load(item_id, &settings)
    }

    /// Items of `kind`, sorted by name.
    pub fn list_items(&self, kind: Kind, include_archived: bool) -> LedgerResult<Vec<InventoryItem>> {
        let mut items: Vec<_> = self
            .all_items()?
            .into_iter()
            .filter(|i| i.is_listed(kind, include_archived))
            .collect();
        item::sort_by_name(&mut items);
        Ok(items)
    }

    /// Look an item up by its external identifier; active items win over
    /// archived ones.
    pub fn find_by_identifier(
        &self,
        kind: Kind,
        identifier: &Identifier,
    ) -> LedgerResult<Option<InventoryItem>> {
        let mut matches: Vec<_> = self
            .all_items()?
            .into_iter()
            .filter(|i| i.kind() == kind && i.identifier() == Some(identifier))
            .collect();
        matches.sort_by_key(|i| (i.is_archived(), i.item_id()));
        Ok(matches.into_iter().next())
    }

    pub fn update_item(&self, item_id: ItemId, patch: ItemPatch) -> LedgerResult<InventoryItem> {
        self.edit(item_id, LedgerChange::Updated, |item, now| {
            item.apply_patch(patch, now)
        })
    }

    pub fn archive_item(&self, item_id: ItemId) -> LedgerResult<InventoryItem> {
        self.edit(item_id, LedgerChange::Archived, |item, now| {
            item.archive(now);
            Ok(())
        })
    }

    pub fn unarchive_item(&self, item_id: ItemId) -> LedgerResult<InventoryItem> {
        self.edit(item_id, LedgerChange::Unarchived, |item, now| {
            item.unarchive(now);
            Ok(())
        })
    }

    // ---------------------------------------------------------------------
    // Ledger operations
    // ---------------------------------------------------------------------

    pub fn add_quantity(&self, item_id: ItemId, location: &str, amount: f64) -> LedgerResult<QuantityChange> {
        self.mutate(item_id, LedgerChange::Added, |item, now| {
            let added = ledger::add(item, location, amount)?;
            let location = ledger::validate_location(location)?;
            Ok(Some(ActivityEvent::added(item, location, added, now)))
        })
    }

    /// Reduce using the service's configured [`ReduceMode`].
    pub fn reduce_quantity(
        &self,
        item_id: ItemId,
        location: &str,
        amount: f64,
        reason: ReduceReason,
    ) -> LedgerResult<QuantityChange> {
        self.reduce_quantity_with_mode(item_id, location, amount, reason, self.reduce_mode)
    }

    pub fn reduce_quantity_with_mode(
        &self,
        item_id: ItemId,
        location: &str,
        amount: f64,
        reason: ReduceReason,
        mode: ReduceMode,
    ) -> LedgerResult<QuantityChange> {
        self.mutate(item_id, LedgerChange::Reduced, |item, now| {
            let removed = ledger::reduce(item, location, amount, mode)?;
            if removed <= 0.0 {
                return Ok(None);
            }
            let location = ledger::validate_location(location)?;
            Ok(Some(ActivityEvent::reduced(item, location, removed, reason, now)))
        })
    }

    pub fn transfer(
        &self,
        item_id: ItemId,
        from: &str,
        to: &str,
        amount: f64,
    ) -> LedgerResult<QuantityChange> {
        self.mutate(item_id, LedgerChange::Transferred, |item, now| {
            let moved = ledger::transfer(item, from, to, amount)?;
            if moved <= 0.0 {
                return Ok(None);
            }
            let from = ledger::validate_location(from)?;
            let to = ledger::validate_location(to)?;
            Ok(Some(ActivityEvent::transferred(item, from, to, moved, now)))
        })
    }

    /// Zero every bucket of an item.
    pub fn reset_item(&self, item_id: ItemId) -> LedgerResult<QuantityChange> {
        self.mutate(item_id, LedgerChange::Reset, |item, now| {
            let previous = ledger::reset(item);
            Ok(Some(ActivityEvent::reset(item, previous, now)))
        })
    }

    // ---------------------------------------------------------------------
    // Low stock
    // ---------------------------------------------------------------------

    pub fn on_hand_quantity(&self, item_id: ItemId) -> LedgerResult<f64> {
        let settings = self.store.settings()?;
        let item = self.load(item_id, &settings)?;
        Ok(LowStockEvaluator::new(&settings).on_hand_quantity(&item))
    }

    pub fn is_low(&self, item_id: ItemId) -> LedgerResult<bool> {
        Ok(self.stock_status(item_id)?.low)
    }

    pub fn stock_status(&self, item_id: ItemId) -> LedgerResult<StockStatus> {
        let settings = self.store.settings()?;
        let item = self.load(item_id, &settings)?;
        Ok(LowStockEvaluator::new(&settings).status(&item))
    }

    pub fn low_items(&self, kind: Kind) -> LedgerResult<Vec<InventoryItem>> {
        let settings = self.store.settings()?;
        let items = self.all_items()?;
        Ok(LowStockEvaluator::new(&settings)
            .low_items(&items, kind)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Evaluate today's alert for `kind`, publishing it if the gate opens.
    pub fn check_low_stock(&self, kind: Kind) -> LedgerResult<Option<LowStockAlert>> {
        let _shared = self.locks.shared()?;
        let _sections = self.locks.sections()?;

        let today = self.clock.today();
        let mut gate = self.store.alert_gate()?;
        if gate.has_fired(kind, today) {
            return Ok(None);
        }

        let settings = self.store.settings()?;
        let items = self.all_items()?;
        let alert = LowStockEvaluator::new(&settings).daily_alert(&mut gate, &items, kind, today);

        if let Some(alert) = &alert {
            self.store.put_alert_gate(gate)?;
            tracing::info!(kind = %kind, date = %alert.date, items = alert.items.len(), "low stock alert");
            self.publish(LedgerNotification::LowStock(alert.clone()));
        }
        Ok(alert)
    }

    // ---------------------------------------------------------------------
    // Activity
    // ---------------------------------------------------------------------

    pub fn list_activity(&self, kind: Kind, limit: usize) -> LedgerResult<Vec<ActivityEvent>> {
        Ok(self.store.activity()?.list_by_kind(kind, limit))
    }

    pub fn item_activity(&self, item_id: ItemId, limit: usize) -> LedgerResult<Vec<ActivityEvent>> {
        Ok(self.store.activity()?.list_for_item(item_id, limit))
    }

    pub fn clear_activity(&self, kind: Kind) -> LedgerResult<usize> {
        let _shared = self.locks.shared()?;
        let removed = self.store.clear_activity(kind)?;
        tracing::info!(kind = %kind, removed, "activity cleared");
        Ok(removed)
    }

    // ---------------------------------------------------------------------
    // Settings & presets
    // ---------------------------------------------------------------------

    pub fn settings(&self, kind: Kind) -> LedgerResult<KindSettings> {
        Ok(self.store.settings()?.for_kind(kind).clone())
    }

    pub fn all_settings(&self) -> LedgerResult<Settings> {
        Ok(self.store.settings()?)
    }

    /// Update one kind's settings; the new default source is added to the
    /// kind's source presets.
    pub fn update_settings(&self, kind: Kind, patch: SettingsPatch) -> LedgerResult<KindSettings> {
        let updated = {
            let _shared = self.locks.shared()?;
            let _sections = self.locks.sections()?;

            let mut settings = self.store.settings()?;
            settings.for_kind_mut(kind).apply(patch)?;
            let mut presets = self.store.presets()?;
            presets.ensure_default_source(kind, settings.default_bucket(kind));

            let updated = settings.for_kind(kind).clone();
            self.store.replace_sections(StoreSections {
                settings: Some(settings),
                presets: Some(presets),
                ..StoreSections::default()
            })?;
            updated
        };

        tracing::info!(kind = %kind, default_min_on_hand = updated.default_min_on_hand, alerts = updated.enable_low_alerts, bucket = %updated.default_source_bucket_name, "settings updated");
        self.publish(LedgerNotification::ConfigurationChanged {
            kind,
            at: self.clock.now(),
        });
        self.after_mutation(kind);
        Ok(updated)
    }

    pub fn presets(&self, kind: Kind, ty: PresetType) -> LedgerResult<Vec<String>> {
        Ok(self.store.presets()?.list(kind, ty).to_vec())
    }

    /// Returns `false` when a case-insensitive duplicate already exists.
    pub fn add_preset(&self, kind: Kind, ty: PresetType, name: &str) -> LedgerResult<bool> {
        self.edit_presets(kind, |presets, _| presets.add(kind, ty, name))
    }

    /// Returns `false` when nothing matched or `name` is the default source.
    /// Buckets with that name are left alone.
    pub fn remove_preset(&self, kind: Kind, ty: PresetType, name: &str) -> LedgerResult<bool> {
        self.edit_presets(kind, |presets, settings| {
            presets.remove(kind, ty, name, settings.default_bucket(kind))
        })
    }

    // ---------------------------------------------------------------------
    // Reorders
    // ---------------------------------------------------------------------

    /// Place a reorder, replacing the item's pending request.
    pub fn place_reorder(
        &self,
        item_id: ItemId,
        vendor: &str,
        quantity: f64,
        notes: Option<String>,
    ) -> LedgerResult<ReorderRequest> {
        let now = self.clock.now();
        let (item, request) = {
            let _shared = self.locks.shared()?;
            let lease = self.locks.item(item_id)?;
            let _item = lease.lock()?;
            let _sections = self.locks.sections()?;

            let settings = self.store.settings()?;
            let item = self.load(item_id, &settings)?;
            let request = ReorderRequest::new(item_id, vendor, quantity, notes, now)?;

            let mut book = self.store.reorders()?;
            if let Some(replaced) = book.place(request.clone()) {
                tracing::debug!(item_id = %item_id, vendor = %replaced.vendor, "replacing pending reorder");
            }
            let event = ActivityEvent::reordered(&item, &request.vendor, request.quantity_ordered, now);
            self.store.commit(Commit {
                items: Vec::new(),
                activity: vec![event],
                reorders: Some(book),
            })?;
            (item, request)
        };

        tracing::info!(item_id = %item_id, vendor = %request.vendor, qty = request.quantity_ordered, "reorder placed");
        self.notify_mutated(&item, LedgerChange::Reordered, now);
        Ok(request)
    }

    /// Mark the open request received and add its quantity to `location`
    /// (the kind's on-hand bucket when `None`).
    pub fn receive_reorder(
        &self,
        item_id: ItemId,
        location: Option<&str>,
    ) -> LedgerResult<(ReorderRequest, QuantityChange)> {
        let now = self.clock.now();
        let (request, item) = {
            let _shared = self.locks.shared()?;
            let lease = self.locks.item(item_id)?;
            let _item = lease.lock()?;
            let _sections = self.locks.sections()?;

            let settings = self.store.settings()?;
            let mut item = self.load(item_id, &settings)?;
            let mut book = self.store.reorders()?;
            let request = book.mark_received(item_id, now)?;

            let location = location.unwrap_or(settings.default_bucket(item.kind()));
            let added = ledger::add(&mut item, location, request.quantity_ordered)?;
            let location = ledger::validate_location(location)?;
            item.touch(now);
            let event = ActivityEvent::added(&item, location, added, now)
                .with_note(format!("received from {}", request.vendor));

            self.store.commit(Commit {
                items: vec![item.clone()],
                activity: vec![event],
                reorders: Some(book),
            })?;
            (request, item)
        };

        tracing::info!(item_id = %item_id, qty = request.quantity_ordered, "reorder received");
        self.notify_mutated(&item, LedgerChange::ReorderReceived, now);
        self.after_mutation(item.kind());
        let quantity = request.quantity_ordered;
        Ok((request, QuantityChange { item, quantity }))
    }

    pub fn cancel_reorder(&self, item_id: ItemId) -> LedgerResult<ReorderRequest> {
        let now = self.clock.now();
        let (request, kind) = {
            let _shared = self.locks.shared()?;
            let _sections = self.locks.sections()?;

            let settings = self.store.settings()?;
            let item = self.load(item_id, &settings)?;
            let mut book = self.store.reorders()?;
            let request = book.cancel(item_id)?;
            self.store.commit(Commit {
                reorders: Some(book),
                ..Commit::default()
            })?;
            (request, item.kind())
        };

        tracing::info!(item_id = %item_id, "reorder cancelled");
        self.publish(LedgerNotification::Mutated {
            item_id,
            kind,
            change: LedgerChange::ReorderCancelled,
            at: now,
        });
        Ok(request)
    }

    pub fn open_reorders(&self) -> LedgerResult<Vec<ReorderRequest>> {
        Ok(self.store.reorders()?.open().cloned().collect())
    }

    pub fn open_reorder(&self, item_id: ItemId) -> LedgerResult<Option<ReorderRequest>> {
        Ok(self.store.reorders()?.open_for(item_id).cloned())
    }

    // ---------------------------------------------------------------------
    // Snapshot
    // ---------------------------------------------------------------------

    pub fn export_snapshot(&self) -> LedgerResult<SnapshotBundle> {
        let _exclusive = self.locks.exclusive()?;
        Ok(SnapshotBundle::full(
            self.clock.now(),
            self.all_items()?,
            self.store.activity()?.to_vec(),
            self.store.settings()?,
            self.store.presets()?,
            self.store.reorders()?.into_requests(),
        ))
    }

    pub fn export_json(&self) -> LedgerResult<String> {
        let bundle = self.export_snapshot()?;
        serde_json::to_string_pretty(&bundle).map_err(|e| LedgerError::Store(e.into()))
    }

    /// Parse and import a JSON bundle. Nothing changes unless the whole
    /// payload is accepted.
    pub fn import_json(&self, json: &str) -> LedgerResult<()> {
        let bundle: SnapshotBundle =
            serde_json::from_str(json).map_err(|e| LedgerError::Parse(e.to_string()))?;
        self.import_snapshot(bundle)
    }

    /// Replace every section present in `bundle`.
    pub fn import_snapshot(&self, bundle: SnapshotBundle) -> LedgerResult<()> {
        bundle.validate()?;

        let exclusive = self.locks.exclusive()?;
        let settings = match &bundle.settings {
            Some(settings) => settings.clone(),
            None => self.store.settings()?,
        };

        let items = bundle.items.map(|items| {
            items
                .into_iter()
                .map(|mut item| {
                    let kind = item.kind();
                    ledger::normalize(&mut item, settings.default_bucket(kind));
                    item
                })
                .collect::<Vec<_>>()
        });

        let presets = match bundle.presets {
            Some(presets) => Some(presets),
            None if bundle.settings.is_some() => Some(self.store.presets()?),
            None => None,
        }
        .map(|mut presets: PresetRegistry| {
            presets.reconcile(&settings);
            presets
        });

        let reorders = bundle
            .reorders
            .map(ReorderBook::from_requests)
            .transpose()?;

        let counts = (
            items.as_ref().map(Vec::len),
            bundle.activity.as_ref().map(Vec::len),
            reorders.as_ref().map(|b| b.requests().len()),
        );

        self.store.replace_sections(StoreSections {
            items,
            activity: bundle.activity,
            settings: bundle.settings,
            presets,
            reorders,
        })?;
        drop(exclusive);

        tracing::info!(items = ?counts.0, activity = ?counts.1, reorders = ?counts.2, "snapshot imported");
        self.publish(LedgerNotification::Imported {
            at: self.clock.now(),
        });
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn all_items(&self) -> LedgerResult<Vec<InventoryItem>> {
        let settings = self.store.settings()?;
        Ok(self
            .store
            .list_items()?
            .into_iter()
            .map(|mut item| {
                let kind = item.kind();
                ledger::normalize(&mut item, settings.default_bucket(kind));
                item
            })
            .collect())
    }

    fn load(&self, item_id: ItemId, settings: &Settings) -> LedgerResult<InventoryItem> {
        let mut item = self
            .store
            .get_item(item_id)?
            .ok_or_else(|| DomainError::not_found(format!("item {item_id}")))?;
        let kind = item.kind();
        if ledger::normalize(&mut item, settings.default_bucket(kind)) {
            tracing::debug!(item_id = %item_id, "migrated legacy quantity into default bucket");
        }
        Ok(item)
    }

    /// Run a quantity operation under the item lock. `op` returns `None` for
    /// a no-op, in which case nothing is written or published.
    fn mutate<F>(&self, item_id: ItemId, change: LedgerChange, op: F) -> LedgerResult<QuantityChange>
    where
        F: FnOnce(&mut InventoryItem, DateTime<Utc>) -> DomainResult<Option<ActivityEvent>>,
    {
        let now = self.clock.now();
        let (item, event) = {
            let _shared = self.locks.shared()?;
            let lease = self.locks.item(item_id)?;
            let _item = lease.lock()?;

            let settings = self.store.settings()?;
            let mut item = self.load(item_id, &settings)?;
            let Some(event) = op(&mut item, now)? else {
                tracing::debug!(item_id = %item_id, change = ?change, "no quantity available; nothing changed");
                return Ok(QuantityChange { item, quantity: 0.0 });
            };

            item.touch(now);
            self.store
                .commit(Commit::item(item.clone(), Some(event.clone())))?;
            (item, event)
        };

        tracing::info!(
            item_id = %item_id,
            kind = %item.kind(),
            event = event.event_type(),
            qty = event.quantity,
            total = item.quantity(),
            "ledger updated"
        );
        self.notify_mutated(&item, change, now);
        self.after_mutation(item.kind());
        Ok(QuantityChange {
            quantity: event.quantity,
            item,
        })
    }

    /// Descriptive edits: no audit entry, but still committed and published.
    fn edit<F>(&self, item_id: ItemId, change: LedgerChange, op: F) -> LedgerResult<InventoryItem>
    where
        F: FnOnce(&mut InventoryItem, DateTime<Utc>) -> DomainResult<()>,
    {
        let now = self.clock.now();
        let item = {
            let _shared = self.locks.shared()?;
            let lease = self.locks.item(item_id)?;
            let _item = lease.lock()?;

            let settings = self.store.settings()?;
            let mut item = self.load(item_id, &settings)?;
            op(&mut item, now)?;
            self.store.commit(Commit::item(item.clone(), None))?;
            item
        };

        tracing::info!(item_id = %item_id, change = ?change, "item updated");
        self.notify_mutated(&item, change, now);
        self.after_mutation(item.kind());
        Ok(item)
    }

    fn edit_presets<F>(&self, kind: Kind, op: F) -> LedgerResult<bool>
    where
        F: FnOnce(&mut PresetRegistry, &Settings) -> DomainResult<bool>,
    {
        let changed = {
            let _shared = self.locks.shared()?;
            let _sections = self.locks.sections()?;

            let settings = self.store.settings()?;
            let mut presets = self.store.presets()?;
            let changed = op(&mut presets, &settings)?;
            if changed {
                self.store.replace_sections(StoreSections {
                    presets: Some(presets),
                    ..StoreSections::default()
                })?;
            }
            changed
        };

        if changed {
            tracing::info!(kind = %kind, "presets updated");
            self.publish(LedgerNotification::ConfigurationChanged {
                kind,
                at: self.clock.now(),
            });
        }
        Ok(changed)
    }

    fn notify_mutated(&self, item: &InventoryItem, change: LedgerChange, at: DateTime<Utc>) {
        self.publish(LedgerNotification::Mutated {
            item_id: item.item_id(),
            kind: item.kind(),
            change,
            at,
        });
    }

    /// Give the daily alert a chance to fire. A failure here never undoes the
    /// committed mutation.
    fn after_mutation(&self, kind: Kind) {
        if let Err(e) = self.check_low_stock(kind) {
            tracing::warn!(kind = %kind, error = %e, "low stock check failed");
        }
    }

    fn publish(&self, notification: LedgerNotification) {
        if let Err(e) = self.bus.publish(notification) {
            tracing::warn!(error = ?e, "failed to publish ledger notification");
        }
    }
}
