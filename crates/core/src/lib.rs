//! `ledgerd-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! typed identifiers, money validation, the domain error taxonomy, and the
//! account/transaction entities shared by the storage and engine layers.

pub mod account;
pub mod error;
pub mod event;
pub mod id;
pub mod money;

pub use account::{Account, Transaction, TransactionKind, TransactionResult};
pub use error::{LedgerError, LedgerResult};
pub use event::TransactionEvent;
pub use id::{AccountNumber, IdempotencyKey, TransactionId};
