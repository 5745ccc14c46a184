//! Location-bucket ledger operations.
//!
//! These functions are the only code that changes bucket quantities. Each one
//! either fails without touching the item or mutates it and re-establishes the
//! aggregate invariant through [`normalize`] before returning:
//!
//! - every bucket value is finite and `>= 0`
//! - `item.quantity() == item.locations().values().sum()`

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use kennel_core::{DomainError, DomainResult};

use crate::item::InventoryItem;

/// How a reduction that exceeds the bucket is handled.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReduceMode {
    /// Remove only what is available.
    #[default]
    Clamped,
    /// Fail with `InsufficientQuantity` and leave the bucket untouched.
    Strict,
}

impl FromStr for ReduceMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clamped" => Ok(ReduceMode::Clamped),
            "strict" => Ok(ReduceMode::Strict),
            other => Err(DomainError::validation(format!("unknown reduce mode: {other}"))),
        }
    }
}

/// Why stock left a bucket.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReduceReason {
    Used,
    Discarded,
}

impl FromStr for ReduceReason {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "used" => Ok(ReduceReason::Used),
            "discarded" => Ok(ReduceReason::Discarded),
            other => Err(DomainError::validation(format!("unknown reduce reason: {other}"))),
        }
    }
}

/// Accept only finite, strictly positive amounts.
pub fn validate_amount(amount: f64) -> DomainResult<f64> {
    if amount.is_finite() && amount > 0.0 {
        Ok(amount)
    } else {
        Err(DomainError::invalid_amount(amount))
    }
}

/// Trim surrounding whitespace and reject empty names. Case is preserved:
/// bucket keys are exact-match.
pub fn validate_location(name: &str) -> DomainResult<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("location name cannot be empty"));
    }
    Ok(trimmed)
}

/// Re-establish the aggregate invariant.
///
/// An item that arrives without any bucket (older records only carried a bare
/// `qty`) gets that quantity migrated into `default_bucket`. Bucket values that
/// are negative or not finite are repaired to zero.
///
/// Returns `true` when a legacy quantity was migrated.
pub fn normalize(item: &mut InventoryItem, default_bucket: &str) -> bool {
    let migrated = item.locations.is_empty();
    if migrated {
        let legacy = if item.quantity.is_finite() {
            item.quantity.max(0.0)
        } else {
            0.0
        };
        item.locations.insert(default_bucket.to_string(), legacy);
    }

    for qty in item.locations.values_mut() {
        if !qty.is_finite() || *qty < 0.0 {
            *qty = 0.0;
        }
    }
    item.quantity = item.locations.values().sum();
    migrated
}

/// Add `amount` to `location`, creating the bucket if needed.
///
/// Returns the amount added.
pub fn add(item: &mut InventoryItem, location: &str, amount: f64) -> DomainResult<f64> {
    let amount = validate_amount(amount)?;
    let location = validate_location(location)?;

    let next = item.bucket(location).unwrap_or(0.0) + amount;
    ensure_representable(item, &[(location, next)], amount)?;
    item.locations.insert(location.to_string(), next);
    recompute(item);
    Ok(amount)
}

/// Remove up to `amount` from `location`.
///
/// In [`ReduceMode::Clamped`] only the available quantity is removed; in
/// [`ReduceMode::Strict`] an over-reduction fails. Returns the amount actually
/// removed (0 when the bucket is empty or absent).
pub fn reduce(
    item: &mut InventoryItem,
    location: &str,
    amount: f64,
    mode: ReduceMode,
) -> DomainResult<f64> {
    let amount = validate_amount(amount)?;
    let location = validate_location(location)?;

    let available = item.bucket(location).unwrap_or(0.0);
    if mode == ReduceMode::Strict && amount > available {
        return Err(DomainError::insufficient(available, amount));
    }

    let removed = amount.min(available);
    if removed <= 0.0 {
        return Ok(0.0);
    }
    take(item, location, removed, available);
    recompute(item);
    Ok(removed)
}

/// Move up to `amount` from `from` to `to`; the item's total is unchanged.
///
/// Returns the amount actually moved (0 when the source is empty or absent, in
/// which case nothing changes and the destination bucket is not created).
pub fn transfer(item: &mut InventoryItem, from: &str, to: &str, amount: f64) -> DomainResult<f64> {
    let amount = validate_amount(amount)?;
    let from = validate_location(from)?;
    let to = validate_location(to)?;
    if from == to {
        return Err(DomainError::validation(
            "source and destination must be different locations",
        ));
    }

    let available = item.bucket(from).unwrap_or(0.0);
    let moved = amount.min(available);
    if moved <= 0.0 {
        return Ok(0.0);
    }

    let next = item.bucket(to).unwrap_or(0.0) + moved;
    ensure_representable(item, &[(from, remainder(available, moved)), (to, next)], amount)?;

    take(item, from, moved, available);
    item.locations.insert(to.to_string(), next);
    recompute(item);
    Ok(moved)
}

/// Zero every bucket, keeping bucket names. Returns the previous total.
pub fn reset(item: &mut InventoryItem) -> f64 {
    let previous = item.quantity;
    for qty in item.locations.values_mut() {
        *qty = 0.0;
    }
    recompute(item);
    previous
}

fn take(item: &mut InventoryItem, location: &str, qty: f64, available: f64) {
    if let Some(bucket) = item.locations.get_mut(location) {
        *bucket = remainder(available, qty);
    }
}

/// What is left after taking `qty`; emptying lands on exactly zero rather
/// than float residue.
fn remainder(available: f64, qty: f64) -> f64 {
    if qty >= available {
        0.0
    } else {
        (available - qty).max(0.0)
    }
}

/// Reject a change whose new bucket values or aggregate would overflow `f64`.
/// `updates` lists the buckets the change would write, with their new values.
fn ensure_representable(
    item: &InventoryItem,
    updates: &[(&str, f64)],
    amount: f64,
) -> DomainResult<()> {
    let untouched: f64 = item
        .locations
        .iter()
        .filter(|(name, _)| !updates.iter().any(|(u, _)| *u == name.as_str()))
        .map(|(_, qty)| qty)
        .sum();
    let total = updates.iter().fold(untouched, |sum, (_, qty)| sum + qty);
    if total.is_finite() && updates.iter().all(|(_, qty)| qty.is_finite()) {
        Ok(())
    } else {
        Err(DomainError::invalid_amount(amount))
    }
}

fn recompute(item: &mut InventoryItem) {
    item.quantity = item.locations.values().sum();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kennel_core::ItemId;
    use proptest::prelude::*;

    use crate::item::NewItem;
    use crate::kind::Kind;

    const ON_HAND: &str = "On hand";

    fn kibble(seed: f64) -> InventoryItem {
        InventoryItem::create(
            ItemId::new(),
            NewItem::new("Kibble", Kind::Edible).with_seed(seed),
            ON_HAND,
            Utc::now(),
        )
        .unwrap()
    }

    fn assert_invariant(item: &InventoryItem) {
        let sum: f64 = item.locations().values().sum();
        assert_eq!(item.quantity(), sum);
        assert!(item.locations().values().all(|q| *q >= 0.0));
    }

    #[test]
    fn kibble_walkthrough() {
        let mut item = kibble(10.0);

        assert_eq!(add(&mut item, ON_HAND, 5.0).unwrap(), 5.0);
        assert_eq!(item.bucket(ON_HAND), Some(15.0));

        assert_eq!(transfer(&mut item, ON_HAND, "Freezer", 6.0).unwrap(), 6.0);
        assert_eq!(item.bucket(ON_HAND), Some(9.0));
        assert_eq!(item.bucket("Freezer"), Some(6.0));
        assert_eq!(item.quantity(), 15.0);

        let removed = reduce(&mut item, ON_HAND, 20.0, ReduceMode::Clamped).unwrap();
        assert_eq!(removed, 9.0);
        assert_eq!(item.bucket(ON_HAND), Some(0.0));
        assert_eq!(item.bucket("Freezer"), Some(6.0));
        assert_eq!(item.quantity(), 6.0);
        assert_invariant(&item);
    }

    #[test]
    fn invalid_amounts_leave_item_untouched() {
        let mut item = kibble(3.0);
        let before = item.clone();

        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(add(&mut item, ON_HAND, bad), Err(DomainError::InvalidAmount(_))));
            assert!(matches!(
                reduce(&mut item, ON_HAND, bad, ReduceMode::Clamped),
                Err(DomainError::InvalidAmount(_))
            ));
            assert!(matches!(
                transfer(&mut item, ON_HAND, "Truck", bad),
                Err(DomainError::InvalidAmount(_))
            ));
        }
        assert_eq!(item, before);
    }

    #[test]
    fn overflowing_add_is_rejected_without_change() {
        let mut item = kibble(0.0);
        add(&mut item, ON_HAND, 1e308).unwrap();
        let before = item.clone();

        assert_eq!(add(&mut item, ON_HAND, 1e308), Err(DomainError::InvalidAmount(1e308)));
        assert_eq!(add(&mut item, "Freezer", 1e308), Err(DomainError::InvalidAmount(1e308)));
        assert_eq!(item, before);
        assert!(item.quantity().is_finite());
    }

    #[test]
    fn overflowing_transfer_destination_is_rejected() {
        let json = serde_json::json!({
            "itemId": ItemId::new(),
            "name": "Kibble",
            "kind": "edible",
            "locations": { "On hand": 1e308, "Freezer": 1e308 },
            "qty": 0.0
        });
        let mut item: InventoryItem = serde_json::from_value(json).unwrap();
        let before = item.clone();

        assert!(matches!(
            transfer(&mut item, ON_HAND, "Freezer", 1e308),
            Err(DomainError::InvalidAmount(_))
        ));
        assert_eq!(item, before);
    }

    #[test]
    fn transfer_at_the_limit_still_moves() {
        let mut item = kibble(0.0);
        add(&mut item, ON_HAND, f64::MAX).unwrap();

        assert_eq!(transfer(&mut item, ON_HAND, "Freezer", f64::MAX).unwrap(), f64::MAX);
        assert_eq!(item.bucket(ON_HAND), Some(0.0));
        assert_eq!(item.bucket("Freezer"), Some(f64::MAX));
        assert_invariant(&item);
    }

    #[test]
    fn strict_reduce_refuses_overdraw() {
        let mut item = kibble(4.0);
        let err = reduce(&mut item, ON_HAND, 5.0, ReduceMode::Strict).unwrap_err();
        assert_eq!(err, DomainError::insufficient(4.0, 5.0));
        assert_eq!(item.bucket(ON_HAND), Some(4.0));

        assert_eq!(reduce(&mut item, ON_HAND, 4.0, ReduceMode::Strict).unwrap(), 4.0);
        assert_eq!(item.quantity(), 0.0);
    }

    #[test]
    fn reduce_on_missing_bucket_removes_nothing() {
        let mut item = kibble(4.0);
        assert_eq!(reduce(&mut item, "Truck", 1.0, ReduceMode::Clamped).unwrap(), 0.0);
        assert_eq!(item.bucket("Truck"), None);
    }

    #[test]
    fn transfer_from_empty_source_is_a_noop() {
        let mut item = kibble(0.0);
        let before = item.clone();
        assert_eq!(transfer(&mut item, ON_HAND, "Freezer", 2.0).unwrap(), 0.0);
        assert_eq!(transfer(&mut item, "Nowhere", "Freezer", 2.0).unwrap(), 0.0);
        assert_eq!(item, before);
    }

    #[test]
    fn transfer_to_same_bucket_is_rejected() {
        let mut item = kibble(2.0);
        assert!(matches!(
            transfer(&mut item, ON_HAND, " On hand ", 1.0),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn bucket_names_are_case_sensitive() {
        let mut item = kibble(2.0);
        add(&mut item, "freezer", 1.0).unwrap();
        add(&mut item, "Freezer", 1.0).unwrap();
        assert_eq!(item.locations().len(), 3);
    }

    #[test]
    fn reset_zeroes_buckets_but_keeps_names() {
        let mut item = kibble(5.0);
        add(&mut item, "Truck", 2.0).unwrap();
        assert_eq!(reset(&mut item), 7.0);
        assert_eq!(item.bucket("Truck"), Some(0.0));
        assert_eq!(item.quantity(), 0.0);
    }

    #[test]
    fn normalize_migrates_bare_quantity() {
        let json = serde_json::json!({
            "itemId": ItemId::new(),
            "name": "Treats",
            "kind": "edible",
            "qty": 7.5
        });
        let mut item: InventoryItem = serde_json::from_value(json).unwrap();
        assert!(item.locations().is_empty());

        assert!(normalize(&mut item, ON_HAND));
        assert_eq!(item.bucket(ON_HAND), Some(7.5));
        assert_eq!(item.quantity(), 7.5);

        assert!(!normalize(&mut item, ON_HAND));
    }

    #[test]
    fn normalize_repairs_negative_buckets() {
        let json = serde_json::json!({
            "itemId": ItemId::new(),
            "name": "Treats",
            "kind": "edible",
            "locations": { "On hand": -2.0, "Freezer": 3.0 },
            "qty": 99.0
        });
        let mut item: InventoryItem = serde_json::from_value(json).unwrap();
        normalize(&mut item, ON_HAND);
        assert_eq!(item.bucket(ON_HAND), Some(0.0));
        assert_eq!(item.quantity(), 3.0);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(usize, f64),
        Reduce(usize, f64),
        Transfer(usize, usize, f64),
    }

    const BUCKETS: [&str; 3] = [ON_HAND, "Freezer", "Truck"];

    fn op_strategy() -> impl Strategy<Value = Op> {
        let amount = 0.25f64..50.0;
        prop_oneof![
            (0..3usize, amount.clone()).prop_map(|(b, a)| Op::Add(b, a)),
            (0..3usize, amount.clone()).prop_map(|(b, a)| Op::Reduce(b, a)),
            (0..3usize, 0..3usize, amount).prop_map(|(f, t, a)| Op::Transfer(f, t, a)),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: after any sequence of operations the aggregate equals the
        /// bucket sum and no bucket is negative.
        #[test]
        fn invariant_holds_for_any_sequence(
            seed in 0.0f64..100.0,
            ops in prop::collection::vec(op_strategy(), 1..40)
        ) {
            let mut item = kibble(seed);
            for op in ops {
                let _ = match op {
                    Op::Add(b, a) => add(&mut item, BUCKETS[b], a),
                    Op::Reduce(b, a) => reduce(&mut item, BUCKETS[b], a, ReduceMode::Clamped),
                    Op::Transfer(f, t, a) => transfer(&mut item, BUCKETS[f], BUCKETS[t], a),
                };
                let sum: f64 = item.locations().values().sum();
                prop_assert_eq!(item.quantity(), sum);
                prop_assert!(item.locations().values().all(|q| *q >= 0.0));
            }
        }

        /// Property: a transfer never changes the total (up to float rounding).
        #[test]
        fn transfer_conserves_total(
            seed in 0.0f64..100.0,
            extra in 0.0f64..100.0,
            amount in 0.01f64..300.0
        ) {
            let mut item = kibble(seed);
            if extra > 0.0 {
                add(&mut item, "Freezer", extra).unwrap();
            }
            let before = item.quantity();
            let moved = transfer(&mut item, ON_HAND, "Freezer", amount).unwrap();
            prop_assert!(moved <= amount);
            prop_assert!((item.quantity() - before).abs() < 1e-9);
        }

        /// Property: adding then using the same amount restores the bucket.
        #[test]
        fn add_then_use_restores_bucket(seed in 0u32..1000, n in 1u32..1000) {
            let mut item = kibble(seed as f64);
            add(&mut item, ON_HAND, n as f64).unwrap();
            let removed = reduce(&mut item, ON_HAND, n as f64, ReduceMode::Clamped).unwrap();
            prop_assert_eq!(removed, n as f64);
            prop_assert_eq!(item.bucket(ON_HAND), Some(seed as f64));
        }
    }
}
