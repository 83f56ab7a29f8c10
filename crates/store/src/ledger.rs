//! Ledger storage abstraction.

use async_trait::async_trait;
use rust_decimal::Decimal;

use ledgerd_core::{Account, AccountNumber, IdempotencyKey, Transaction, TransactionKind};

use crate::error::StoreError;

/// Durable table of accounts and transactions.
///
/// `apply_transaction` carries the atomicity contract: balance check, balance
/// mutation and transaction insert are one indivisible storage transaction.
/// No concurrent operation observes an intermediate state, and any failure
/// leaves the account exactly as it was.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Insert a new account with a zero balance.
    ///
    /// Fails with [`StoreError::Duplicate`] if the account number is already
    /// taken; the caller regenerates and retries.
    async fn insert_account(
        &self,
        number: &AccountNumber,
        holder_name: &str,
    ) -> Result<Account, StoreError>;

    /// Look up an account by its external number.
    async fn fetch_account(&self, number: &AccountNumber)
        -> Result<Option<Account>, StoreError>;

    /// Atomically apply a deposit or withdrawal and record the transaction.
    ///
    /// For withdrawals the balance guard runs inside the same storage
    /// transaction; an insufficient balance rolls back with
    /// [`StoreError::InsufficientFunds`].
    async fn apply_transaction(
        &self,
        number: &AccountNumber,
        kind: TransactionKind,
        amount: Decimal,
        idempotency_key: Option<&IdempotencyKey>,
    ) -> Result<Transaction, StoreError>;

    /// Transaction history for an account, newest first.
    async fn transactions(
        &self,
        number: &AccountNumber,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Transaction>, StoreError>;
}
