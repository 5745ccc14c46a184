//! Errors surfaced by the ledger service.

use thiserror::Error;

use kennel_core::DomainError;

use crate::store::StoreError;

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Deterministic domain failure (validation, amounts, lookups).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Persistence failed; the operation did not take effect.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An import payload was not valid JSON for a snapshot bundle.
    #[error("failed to parse snapshot: {0}")]
    Parse(String),
}

impl LedgerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::Domain(DomainError::NotFound(_)))
    }

    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            LedgerError::Domain(e) => Some(e),
            _ => None,
        }
    }
}
