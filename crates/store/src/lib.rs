//! `ledgerd-store` — durable ledger storage.
//!
//! The store is the single source of truth for balances and transaction
//! history. It exposes two narrow traits — [`LedgerStore`] for accounts and
//! transactions, [`IdempotencyStore`] for memoized mutating responses — and a
//! SQLite implementation of both over one connection pool.

pub mod error;
pub mod idempotency;
pub mod ledger;
pub mod sqlite;

pub use error::StoreError;
pub use idempotency::{IdempotencyRecord, IdempotencyStore};
pub use ledger::LedgerStore;
pub use sqlite::SqliteStore;
