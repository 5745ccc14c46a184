//! Vendor reorder requests: at most one open request per item.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kennel_core::{DomainError, DomainResult, ItemId};

use crate::ledger;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    pub item_id: ItemId,
    pub vendor: String,
    pub quantity_ordered: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub placed_at: DateTime<Utc>,
    #[serde(default)]
    pub received: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_at: Option<DateTime<Utc>>,
}

impl ReorderRequest {
    pub fn new(
        item_id: ItemId,
        vendor: &str,
        quantity_ordered: f64,
        notes: Option<String>,
        placed_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let quantity_ordered = ledger::validate_amount(quantity_ordered)?;
        let vendor = vendor.trim();
        if vendor.is_empty() {
            return Err(DomainError::validation("vendor cannot be empty"));
        }
        Ok(Self {
            item_id,
            vendor: vendor.to_string(),
            quantity_ordered,
            notes: notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            placed_at,
            received: false,
            received_at: None,
        })
    }

    pub fn is_open(&self) -> bool {
        !self.received
    }
}

/// Reorder collection. Received requests stay as history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReorderBook {
    requests: Vec<ReorderRequest>,
}

impl ReorderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_requests(requests: Vec<ReorderRequest>) -> DomainResult<Self> {
        let book = Self { requests };
        book.validate()?;
        Ok(book)
    }

    pub fn requests(&self) -> &[ReorderRequest] {
        &self.requests
    }

    pub fn into_requests(self) -> Vec<ReorderRequest> {
        self.requests
    }

    /// Place `request`, replacing the item's pending one. Returns the
    /// replaced request, if any.
    pub fn place(&mut self, request: ReorderRequest) -> Option<ReorderRequest> {
        let replaced = self
            .requests
            .iter()
            .position(|r| r.item_id == request.item_id && r.is_open())
            .map(|idx| self.requests.remove(idx));
        self.requests.push(request);
        replaced
    }

    pub fn open_for(&self, item_id: ItemId) -> Option<&ReorderRequest> {
        self.requests
            .iter()
            .find(|r| r.item_id == item_id && r.is_open())
    }

    pub fn open(&self) -> impl Iterator<Item = &ReorderRequest> {
        self.requests.iter().filter(|r| r.is_open())
    }

    pub fn mark_received(&mut self, item_id: ItemId, at: DateTime<Utc>) -> DomainResult<ReorderRequest> {
        let request = self
            .requests
            .iter_mut()
            .find(|r| r.item_id == item_id && r.is_open())
            .ok_or_else(|| DomainError::not_found(format!("open reorder for item {item_id}")))?;
        request.received = true;
        request.received_at = Some(at);
        Ok(request.clone())
    }

    pub fn cancel(&mut self, item_id: ItemId) -> DomainResult<ReorderRequest> {
        let idx = self
            .requests
            .iter()
            .position(|r| r.item_id == item_id && r.is_open())
            .ok_or_else(|| DomainError::not_found(format!("open reorder for item {item_id}")))?;
        Ok(self.requests.remove(idx))
    }

    pub fn validate(&self) -> DomainResult<()> {
        let mut open: Vec<ItemId> = Vec::new();
        for request in &self.requests {
            ledger::validate_amount(request.quantity_ordered).map_err(|_| {
                DomainError::validation(format!(
                    "reorder for item {} has invalid quantity {}",
                    request.item_id, request.quantity_ordered
                ))
            })?;
            if request.is_open() {
                if open.contains(&request.item_id) {
                    return Err(DomainError::validation(format!(
                        "more than one open reorder for item {}",
                        request.item_id
                    )));
                }
                open.push(request.item_id);
            }
        }
        Ok(())
    }
}
