use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kennel_core::{DomainError, DomainResult, ItemId};

use crate::kind::Kind;
use crate::ledger;

/// External identifier attached to an item (e.g. a scanned barcode).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    /// Identifier scheme, e.g. "upc" or "qr".
    #[serde(rename = "type")]
    pub scheme: String,
    pub value: String,
}

impl Identifier {
    pub fn new(scheme: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            value: value.into(),
        }
    }

    fn validate(&self) -> DomainResult<()> {
        if self.scheme.trim().is_empty() || self.value.trim().is_empty() {
            return Err(DomainError::validation(
                "identifier type and value cannot be empty",
            ));
        }
        Ok(())
    }
}

/// An inventory item and its location ledger.
///
/// `locations` maps bucket name to quantity. `qty` is the aggregate and is
/// only ever written by [`ledger::normalize`], which keeps it equal to the sum
/// of the buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    item_id: ItemId,
    name: String,
    kind: Kind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    identifier: Option<Identifier>,
    #[serde(default)]
    unit: String,
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    min_on_hand: Option<f64>,
    #[serde(default)]
    pub(crate) locations: BTreeMap<String, f64>,
    #[serde(rename = "qty", default)]
    pub(crate) quantity: f64,
    #[serde(default)]
    created_at: DateTime<Utc>,
    #[serde(default)]
    updated_at: DateTime<Utc>,
}

/// Fields accepted when creating an item.
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub name: String,
    pub kind: Kind,
    pub identifier: Option<Identifier>,
    pub unit: String,
    pub min_on_hand: Option<f64>,
    /// Initial quantity of the default bucket (0 when absent).
    pub seed_quantity: Option<f64>,
}

impl NewItem {
    pub fn new(name: impl Into<String>, kind: Kind) -> Self {
        Self {
            name: name.into(),
            kind,
            identifier: None,
            unit: String::new(),
            min_on_hand: None,
            seed_quantity: None,
        }
    }

    pub fn with_seed(mut self, quantity: f64) -> Self {
        self.seed_quantity = Some(quantity);
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_min_on_hand(mut self, min: f64) -> Self {
        self.min_on_hand = Some(min);
        self
    }

    pub fn with_identifier(mut self, identifier: Identifier) -> Self {
        self.identifier = Some(identifier);
        self
    }
}

/// Partial update of an item's descriptive fields.
///
/// Quantities are never patched; they only move through the ledger operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub unit: Option<String>,
    /// `Some(None)` removes the identifier.
    pub identifier: Option<Option<Identifier>>,
    /// `Some(None)` clears the override so the kind default applies.
    pub min_on_hand: Option<Option<f64>>,
}

impl InventoryItem {
    /// Build a fresh item with a single default bucket.
    pub fn create(
        item_id: ItemId,
        fields: NewItem,
        default_bucket: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = validate_name(&fields.name)?;
        let bucket = ledger::validate_location(default_bucket)?;
        let seed = match fields.seed_quantity {
            None => 0.0,
            Some(q) if q.is_finite() && q >= 0.0 => q,
            Some(q) => return Err(DomainError::invalid_amount(q)),
        };
        if let Some(min) = fields.min_on_hand {
            validate_threshold(min)?;
        }
        if let Some(identifier) = &fields.identifier {
            identifier.validate()?;
        }

        let mut item = Self {
            item_id,
            name,
            kind: fields.kind,
            identifier: fields.identifier,
            unit: fields.unit.trim().to_string(),
            archived: false,
            min_on_hand: fields.min_on_hand,
            locations: BTreeMap::from([(bucket.to_string(), seed)]),
            quantity: 0.0,
            created_at: now,
            updated_at: now,
        };
        ledger::normalize(&mut item, bucket);
        Ok(item)
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn identifier(&self) -> Option<&Identifier> {
        self.identifier.as_ref()
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn is_archived(&self) -> bool {
        self.archived
    }

    pub fn min_on_hand(&self) -> Option<f64> {
        self.min_on_hand
    }

    pub fn locations(&self) -> &BTreeMap<String, f64> {
        &self.locations
    }

    /// Quantity held in one bucket, if the bucket exists.
    pub fn bucket(&self, location: &str) -> Option<f64> {
        self.locations.get(location).copied()
    }

    /// Aggregate quantity across all buckets.
    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Record that the item changed at `now`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    /// Returns `true` when the flag actually changed.
    pub fn archive(&mut self, now: DateTime<Utc>) -> bool {
        self.set_archived(true, now)
    }

    /// Returns `true` when the flag actually changed.
    pub fn unarchive(&mut self, now: DateTime<Utc>) -> bool {
        self.set_archived(false, now)
    }

    fn set_archived(&mut self, archived: bool, now: DateTime<Utc>) -> bool {
        if self.archived == archived {
            return false;
        }
        self.archived = archived;
        self.updated_at = now;
        true
    }

    /// Apply a descriptive patch. Validation happens before any field changes.
    pub fn apply_patch(&mut self, patch: ItemPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let name = patch.name.as_deref().map(validate_name).transpose()?;
        if let Some(Some(min)) = patch.min_on_hand {
            validate_threshold(min)?;
        }
        if let Some(Some(identifier)) = &patch.identifier {
            identifier.validate()?;
        }

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(unit) = patch.unit {
            self.unit = unit.trim().to_string();
        }
        if let Some(identifier) = patch.identifier {
            self.identifier = identifier;
        }
        if let Some(min) = patch.min_on_hand {
            self.min_on_hand = min;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Whether the item shows up in a listing for `kind`.
    pub fn is_listed(&self, kind: Kind, include_archived: bool) -> bool {
        self.kind == kind && (include_archived || !self.archived)
    }

    /// Structural checks used when accepting items from outside the ledger
    /// (imports, persisted documents).
    pub fn validate(&self) -> DomainResult<()> {
        validate_name(&self.name)?;
        if let Some(min) = self.min_on_hand {
            validate_threshold(min)?;
        }
        for (location, qty) in &self.locations {
            ledger::validate_location(location)?;
            if !qty.is_finite() || *qty < 0.0 {
                return Err(DomainError::validation(format!(
                    "item {}: bucket {location:?} holds invalid quantity {qty}",
                    self.item_id
                )));
            }
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> DomainResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn validate_threshold(min: f64) -> DomainResult<()> {
    if !min.is_finite() || min < 0.0 {
        return Err(DomainError::validation(format!(
            "threshold must be a finite, non-negative number (got {min})"
        )));
    }
    Ok(())
}

/// Sort items by display name, ties broken by id so listings are stable.
pub fn sort_by_name(items: &mut [InventoryItem]) {
    items.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
}
