//! Deposit/withdraw/create/query orchestration.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, instrument, warn};

use ledgerd_core::{
    Account, AccountNumber, IdempotencyKey, LedgerError, LedgerResult, Transaction,
    TransactionEvent, TransactionKind, TransactionResult, money,
};
use ledgerd_notify::EventPublisher;
use ledgerd_store::{IdempotencyStore, LedgerStore, StoreError};

use crate::config::EngineConfig;
use crate::locks::AccountLocks;

/// Attempts at generating a non-colliding account number before giving up.
const ACCOUNT_NUMBER_ATTEMPTS: usize = 8;

/// The transaction-processing engine.
///
/// Generic over the store (ledger + idempotency tables) and the event
/// publisher, mirroring the layering: the engine is the only component that
/// mutates balances (through the store) and the only caller of `publish`.
pub struct LedgerEngine<S, P> {
    store: Arc<S>,
    publisher: P,
    config: EngineConfig,
    locks: AccountLocks,
}

impl<S, P> LedgerEngine<S, P>
where
    S: LedgerStore + IdempotencyStore,
    P: EventPublisher,
{
    pub fn new(store: Arc<S>, publisher: P) -> Self {
        Self::with_config(store, publisher, EngineConfig::default())
    }

    pub fn with_config(store: Arc<S>, publisher: P, config: EngineConfig) -> Self {
        Self {
            store,
            publisher,
            config,
            locks: AccountLocks::default(),
        }
    }

    /// Create a new account with a zero balance.
    #[instrument(skip(self, holder_name), err)]
    pub async fn create_account(&self, holder_name: &str) -> LedgerResult<Account> {
        let name = holder_name.trim();
        if name.is_empty() {
            return Err(LedgerError::validation("holder name must not be empty"));
        }

        for _ in 0..ACCOUNT_NUMBER_ATTEMPTS {
            let number = AccountNumber::generate();
            match self.store.insert_account(&number, name).await {
                Ok(account) => return Ok(account),
                // Collision on the unique index; roll a new number.
                Err(StoreError::Duplicate(_)) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(LedgerError::storage(
            "could not allocate a unique account number",
        ))
    }

    /// Look up an account by its external number.
    pub async fn account(&self, number: &AccountNumber) -> LedgerResult<Account> {
        self.store
            .fetch_account(number)
            .await
            .map_err(LedgerError::from)?
            .ok_or_else(|| LedgerError::AccountNotFound(number.clone()))
    }

    /// Deposit `amount` into the account.
    pub async fn deposit(
        &self,
        number: &AccountNumber,
        amount: Decimal,
        idempotency_key: Option<IdempotencyKey>,
    ) -> LedgerResult<TransactionResult> {
        self.mutate(TransactionKind::Deposit, number, amount, idempotency_key)
            .await
    }

    /// Withdraw `amount` from the account; fails with
    /// [`LedgerError::InsufficientFunds`] when the balance does not cover it.
    pub async fn withdraw(
        &self,
        number: &AccountNumber,
        amount: Decimal,
        idempotency_key: Option<IdempotencyKey>,
    ) -> LedgerResult<TransactionResult> {
        self.mutate(TransactionKind::Withdrawal, number, amount, idempotency_key)
            .await
    }

    /// Transaction history, newest first. `limit` falls back to the
    /// configured default and is clamped to the configured maximum.
    pub async fn history(
        &self,
        number: &AccountNumber,
        limit: Option<u32>,
        offset: u32,
    ) -> LedgerResult<Vec<Transaction>> {
        let limit = limit
            .unwrap_or(self.config.default_history_limit)
            .clamp(1, self.config.max_history_limit);
        self.store
            .transactions(number, limit, offset)
            .await
            .map_err(Into::into)
    }

    /// Housekeeping: drop expired idempotency records.
    pub async fn purge_expired_keys(&self) -> LedgerResult<u64> {
        self.store.purge_expired().await.map_err(Into::into)
    }

    #[instrument(skip(self), fields(account = %number, kind = %kind, amount = %amount), err)]
    async fn mutate(
        &self,
        kind: TransactionKind,
        number: &AccountNumber,
        amount: Decimal,
        idempotency_key: Option<IdempotencyKey>,
    ) -> LedgerResult<TransactionResult> {
        let amount = money::validate_amount(amount)?;

        // The guard spans lookup, execution and memoization: a concurrent
        // retry with the same key waits here and then observes the winner's
        // stored result instead of executing a second mutation.
        let _guard = self.locks.acquire(number).await;

        if let Some(key) = &idempotency_key {
            if let Some(record) = self
                .store
                .lookup(kind, number, key)
                .await
                .map_err(LedgerError::from)?
            {
                if record.amount != amount {
                    return Err(LedgerError::conflict(format!(
                        "idempotency key {key} was first used with amount {}",
                        record.amount
                    )));
                }
                let stored: TransactionResult =
                    serde_json::from_str(&record.response).map_err(|e| {
                        LedgerError::storage(format!("corrupt idempotency payload: {e}"))
                    })?;
                debug!(account = %number, %key, "served idempotent replay");
                return Ok(stored.into_replay());
            }
        }

        let transaction = self
            .store
            .apply_transaction(number, kind, amount, idempotency_key.as_ref())
            .await?;
        let result = TransactionResult::committed(&transaction);

        // Failed mutations are never memoized; only this success path is.
        // Failing to memoize is logged, not surfaced: the ledger already
        // committed and the caller must see the result.
        if let Some(key) = &idempotency_key {
            match serde_json::to_string(&result) {
                Ok(payload) => {
                    if let Err(err) = self
                        .store
                        .store(kind, number, key, amount, &payload, self.config.idempotency_ttl)
                        .await
                    {
                        warn!(account = %number, %key, error = %err, "failed to memoize idempotent response");
                    }
                }
                Err(err) => {
                    warn!(account = %number, %key, error = %err, "failed to serialize idempotent response");
                }
            }
        }

        self.publisher.publish(TransactionEvent::new(transaction));
        Ok(result)
    }
}
