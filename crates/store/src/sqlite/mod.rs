//! SQLite-backed store.
//!
//! One [`SqliteStore`] implements both [`crate::LedgerStore`] and
//! [`crate::IdempotencyStore`] over a single connection pool. Monetary
//! amounts are persisted as canonical decimal TEXT; timestamps as RFC 3339
//! TEXT via the `chrono` SQLx feature.

mod idempotency;
mod ledger;

#[cfg(test)]
mod tests;

use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::error::StoreError;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS accounts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        account_number TEXT NOT NULL UNIQUE,
        holder_name TEXT NOT NULL,
        balance TEXT NOT NULL DEFAULT '0',
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS transactions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        account_id INTEGER NOT NULL REFERENCES accounts (id),
        kind TEXT NOT NULL,
        amount TEXT NOT NULL,
        balance_after TEXT NOT NULL,
        idempotency_key TEXT,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS idempotency_keys (
        operation TEXT NOT NULL,
        account_number TEXT NOT NULL,
        idem_key TEXT NOT NULL,
        amount TEXT NOT NULL,
        response TEXT NOT NULL,
        created_at TEXT NOT NULL,
        expires_at TEXT NOT NULL,
        PRIMARY KEY (operation, account_number, idem_key)
    )",
    "CREATE INDEX IF NOT EXISTS idx_transactions_account ON transactions (account_id, id)",
    "CREATE INDEX IF NOT EXISTS idx_idempotency_expiry ON idempotency_keys (expires_at)",
];

/// SQLite-backed ledger + idempotency store.
///
/// Cloneable and `Send + Sync`; all operations go through the SQLx pool,
/// which handles connection management. Writes to one account are further
/// serialized by the engine's per-account lock, so pool-level contention only
/// occurs across unrelated accounts.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) a database at `url` and bootstrap the schema.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(5));
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// In-memory database for tests and local development.
    ///
    /// The pool is capped at one connection: each `:memory:` connection is
    /// its own database, so a larger pool would see an empty schema.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Decode a persisted decimal TEXT column.
pub(crate) fn decode_decimal(raw: &str) -> Result<Decimal, StoreError> {
    Decimal::from_str(raw).map_err(|e| StoreError::Corrupt(format!("bad decimal {raw:?}: {e}")))
}
