//! Keyed per-account locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use ledgerd_core::AccountNumber;

/// Lock table mapping account numbers to exclusive async locks.
///
/// Entries are created on first use and live for the process lifetime; the
/// table grows with the number of distinct accounts touched, which is the
/// same order as the accounts table itself.
#[derive(Debug, Default)]
pub(crate) struct AccountLocks {
    table: Mutex<HashMap<AccountNumber, Arc<AsyncMutex<()>>>>,
}

impl AccountLocks {
    /// Acquire the exclusive lock for one account.
    ///
    /// The returned guard must span the whole idempotency
    /// lookup → execute → store region so that concurrent retries bearing
    /// the same key serialize instead of double-executing.
    pub(crate) async fn acquire(&self, number: &AccountNumber) -> OwnedMutexGuard<()> {
        let lock = {
            let mut table = self.table.lock().expect("lock table poisoned");
            table.entry(number.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }
}
