//! Domain events emitted after a ledger commit.

use serde::{Deserialize, Serialize};

use crate::account::Transaction;
use crate::id::AccountNumber;

/// Notification payload describing a committed transaction.
///
/// Published to the hub after the storage transaction commits; events are
/// stored-first, so a dropped delivery never loses ledger state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEvent {
    pub account_number: AccountNumber,
    pub transaction: Transaction,
}

impl TransactionEvent {
    pub fn new(transaction: Transaction) -> Self {
        Self {
            account_number: transaction.account_number.clone(),
            transaction,
        }
    }
}
