//! `ledgerd-engine` — the account ledger engine.
//!
//! Orchestrates create/query/deposit/withdraw: input validation, the
//! idempotency protocol, the atomic balance mutation via the store, and
//! event emission towards the notification hub. Mutations on one account are
//! serialized through a keyed lock table; unrelated accounts never contend.

pub mod config;
pub mod engine;
mod locks;

#[cfg(test)]
mod integration_tests;

pub use config::EngineConfig;
pub use engine::LedgerEngine;
