//! Storage error model and SQLx error mapping.

use rust_decimal::Decimal;
use thiserror::Error;

use ledgerd_core::{AccountNumber, LedgerError};

/// Storage-layer error.
///
/// `AccountNotFound` and `InsufficientFunds` are detected *inside* the atomic
/// storage transaction and guarantee a clean rollback; the remaining variants
/// are infrastructure failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("account not found: {0}")]
    AccountNotFound(AccountNumber),

    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        available: Decimal,
        requested: Decimal,
    },

    /// A unique constraint rejected an insert (e.g. account-number
    /// collision).
    #[error("duplicate row: {0}")]
    Duplicate(String),

    /// A persisted value could not be decoded (e.g. malformed decimal).
    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Whether `err` is a unique-constraint violation.
    pub fn is_unique_violation(err: &sqlx::Error) -> bool {
        matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AccountNotFound(number) => LedgerError::AccountNotFound(number),
            StoreError::InsufficientFunds {
                available,
                requested,
            } => LedgerError::InsufficientFunds {
                available,
                requested,
            },
            other => LedgerError::storage(other.to_string()),
        }
    }
}
