//! Account and transaction entities.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::id::{AccountNumber, IdempotencyKey, TransactionId};

/// A bank account row as seen by callers.
///
/// `id` is the internal storage row id and stays server-side; `number` is the
/// externally visible identifier. The balance is mutated only through the
/// engine's atomic operations and is never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(skip)]
    pub id: i64,
    pub number: AccountNumber,
    pub holder_name: String,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Direction of a committed transaction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
}

impl TransactionKind {
    /// Stable wire/storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "DEPOSIT",
            Self::Withdrawal => "WITHDRAWAL",
        }
    }

    pub fn parse(s: &str) -> Result<Self, LedgerError> {
        match s {
            "DEPOSIT" => Ok(Self::Deposit),
            "WITHDRAWAL" => Ok(Self::Withdrawal),
            other => Err(LedgerError::validation(format!(
                "unknown transaction kind {other:?}"
            ))),
        }
    }
}

impl core::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A committed ledger transaction. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_number: AccountNumber,
    pub kind: TransactionKind,
    pub amount: Decimal,
    /// Balance snapshot immediately after this transaction committed.
    pub balance_after: Decimal,
    pub created_at: DateTime<Utc>,
    /// Key the client supplied when creating this transaction, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<IdempotencyKey>,
}

/// Result of a deposit or withdrawal as returned to the caller.
///
/// This is also the payload memoized by the idempotency layer, so it must
/// serialize stably: a replay returns the stored payload byte-for-byte with
/// only `idempotent_replay` flipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    pub transaction_id: TransactionId,
    pub account_number: AccountNumber,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub resulting_balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub idempotent_replay: bool,
}

impl TransactionResult {
    /// Build the caller-facing result from a freshly committed transaction.
    pub fn committed(tx: &Transaction) -> Self {
        Self {
            transaction_id: tx.id,
            account_number: tx.account_number.clone(),
            kind: tx.kind,
            amount: tx.amount,
            resulting_balance: tx.balance_after,
            created_at: tx.created_at,
            idempotent_replay: false,
        }
    }

    /// Mark this result as served from the idempotency cache.
    pub fn into_replay(mut self) -> Self {
        self.idempotent_replay = true;
        self
    }
}
