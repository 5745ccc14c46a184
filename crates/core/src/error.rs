//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// quantities, lookups). Storage and parsing concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// A value failed validation (e.g. empty name, unsupported version).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A quantity was zero, negative, NaN or infinite.
    #[error("invalid amount: {0}")]
    InvalidAmount(f64),

    /// A strict reduction asked for more than the bucket holds.
    #[error("insufficient quantity (available: {available}, requested: {requested})")]
    InsufficientQuantity { available: f64, requested: f64 },

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested record was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_amount(amount: f64) -> Self {
        Self::InvalidAmount(amount)
    }

    pub fn insufficient(available: f64, requested: f64) -> Self {
        Self::InsufficientQuantity {
            available,
            requested,
        }
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}
