//! Domain error model.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::id::AccountNumber;

/// Result type used across the domain layer.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger-level error taxonomy.
///
/// Every variant is distinguishable so callers can pick the right retry
/// behavior: `Storage` is retryable (same idempotency key), the rest are not.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A value failed validation (e.g. non-positive amount, empty name).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The referenced account does not exist.
    #[error("account not found: {0}")]
    AccountNotFound(AccountNumber),

    /// A withdrawal exceeded the available balance. Detected inside the
    /// atomic check-and-update; no partial mutation occurred.
    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        available: Decimal,
        requested: Decimal,
    },

    /// An idempotency key was reused with a materially different request.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Storage or transport failure. The ledger transaction rolled back;
    /// retrying with the same idempotency key is the expected recovery path.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Whether a caller should retry the operation as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}
