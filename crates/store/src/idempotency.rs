//! Idempotency-record storage abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use ledgerd_core::{AccountNumber, IdempotencyKey, TransactionKind};

use crate::error::StoreError;

/// A memoized mutating response, keyed by (operation, account, key).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyRecord {
    /// Amount of the original request, kept for conflict detection when the
    /// same key arrives with a different body.
    pub amount: Decimal,
    /// Serialized response payload exactly as the first caller saw it.
    pub response: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Maps (operation, account, key) to a previously produced result.
///
/// Records are written only after a successful mutation and are read-only
/// until expiry; an expired record never satisfies a lookup. Concurrency for
/// one key is serialized by the engine's per-account lock, which spans the
/// whole lookup → execute → store region.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Return the record for this key, or `None` on miss or expiry.
    async fn lookup(
        &self,
        operation: TransactionKind,
        number: &AccountNumber,
        key: &IdempotencyKey,
    ) -> Result<Option<IdempotencyRecord>, StoreError>;

    /// Upsert a record with a fresh expiry (`now + ttl`).
    async fn store(
        &self,
        operation: TransactionKind,
        number: &AccountNumber,
        key: &IdempotencyKey,
        amount: Decimal,
        response: &str,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Delete expired records; housekeeping only, returns the rows removed.
    async fn purge_expired(&self) -> Result<u64, StoreError>;
}
