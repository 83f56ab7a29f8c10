//! End-to-end engine tests over an in-memory SQLite store.

use std::sync::Arc;

use chrono::Duration;
use rust_decimal::Decimal;

use ledgerd_core::{AccountNumber, IdempotencyKey, LedgerError};
use ledgerd_notify::{HubConfig, NotificationHub, NotifyMessage};
use ledgerd_store::SqliteStore;

use crate::config::EngineConfig;
use crate::engine::LedgerEngine;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

async fn engine() -> LedgerEngine<SqliteStore, ()> {
    ledgerd_observability::init();
    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    LedgerEngine::new(store, ())
}

async fn engine_with_account() -> (LedgerEngine<SqliteStore, ()>, AccountNumber) {
    let engine = engine().await;
    let account = engine.create_account("Alice").await.unwrap();
    (engine, account.number)
}

#[tokio::test]
async fn create_account_validates_holder_name() {
    let engine = engine().await;
    assert!(matches!(
        engine.create_account("").await,
        Err(LedgerError::Validation(_))
    ));
    assert!(matches!(
        engine.create_account("   ").await,
        Err(LedgerError::Validation(_))
    ));

    let account = engine.create_account("  Alice  ").await.unwrap();
    assert_eq!(account.holder_name, "Alice");
    assert_eq!(account.balance, Decimal::ZERO);
}

#[tokio::test]
async fn unknown_accounts_are_not_found() {
    let engine = engine().await;
    let number: AccountNumber = "0000000000".parse().unwrap();

    assert!(matches!(
        engine.account(&number).await,
        Err(LedgerError::AccountNotFound(_))
    ));
    assert!(matches!(
        engine.deposit(&number, dec("10"), None).await,
        Err(LedgerError::AccountNotFound(_))
    ));
    assert!(matches!(
        engine.history(&number, None, 0).await,
        Err(LedgerError::AccountNotFound(_))
    ));
}

#[tokio::test]
async fn deposits_and_withdrawals_validate_amounts() {
    let (engine, number) = engine_with_account().await;
    for bad in ["0", "-5"] {
        assert!(matches!(
            engine.deposit(&number, dec(bad), None).await,
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            engine.withdraw(&number, dec(bad), None).await,
            Err(LedgerError::Validation(_))
        ));
    }
}

// The reference walk-through: create, deposit 100, withdraw 30, page the
// history, bounce an overdraft.
#[tokio::test]
async fn deposit_withdraw_history_scenario() {
    let (engine, number) = engine_with_account().await;
    assert_eq!(engine.account(&number).await.unwrap().balance, Decimal::ZERO);

    let deposit = engine.deposit(&number, dec("100"), None).await.unwrap();
    assert_eq!(deposit.resulting_balance, dec("100"));
    assert!(!deposit.idempotent_replay);

    let withdrawal = engine.withdraw(&number, dec("30"), None).await.unwrap();
    assert_eq!(withdrawal.resulting_balance, dec("70"));
    assert!(withdrawal.transaction_id > deposit.transaction_id);

    let latest = engine.history(&number, Some(1), 0).await.unwrap();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].id, withdrawal.transaction_id);

    let err = engine.withdraw(&number, dec("1000"), None).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientFunds { available, requested }
            if available == dec("70") && requested == dec("1000")
    ));
    assert_eq!(engine.account(&number).await.unwrap().balance, dec("70"));
}

#[tokio::test]
async fn sequential_replay_executes_exactly_once() {
    let (engine, number) = engine_with_account().await;
    let key = IdempotencyKey::from("dep-1");

    let first = engine
        .deposit(&number, dec("100"), Some(key.clone()))
        .await
        .unwrap();
    let second = engine
        .deposit(&number, dec("100"), Some(key.clone()))
        .await
        .unwrap();

    assert!(!first.idempotent_replay);
    assert!(second.idempotent_replay);
    // Identical payload aside from the replay flag.
    assert_eq!(second.clone().into_replay(), first.clone().into_replay());

    // One balance increase, one transaction row.
    assert_eq!(engine.account(&number).await.unwrap().balance, dec("100"));
    assert_eq!(engine.history(&number, None, 0).await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_replay_executes_exactly_once() {
    let (engine, number) = engine_with_account().await;
    let key = IdempotencyKey::from("dep-1");

    let (a, b) = tokio::join!(
        engine.deposit(&number, dec("100"), Some(key.clone())),
        engine.deposit(&number, dec("100"), Some(key.clone())),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    // Exactly one execution; the loser observed the winner's stored result.
    assert_ne!(a.idempotent_replay, b.idempotent_replay);
    assert_eq!(a.transaction_id, b.transaction_id);
    assert_eq!(engine.account(&number).await.unwrap().balance, dec("100"));
    assert_eq!(engine.history(&number, None, 0).await.unwrap().len(), 1);
}

#[tokio::test]
async fn key_reuse_with_different_amount_conflicts() {
    let (engine, number) = engine_with_account().await;
    let key = IdempotencyKey::from("dep-1");

    engine
        .deposit(&number, dec("100"), Some(key.clone()))
        .await
        .unwrap();
    let err = engine
        .deposit(&number, dec("250"), Some(key))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)));
    // The original amount stands.
    assert_eq!(engine.account(&number).await.unwrap().balance, dec("100"));
}

#[tokio::test]
async fn expired_keys_execute_as_new_operations() {
    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    let engine = LedgerEngine::with_config(
        store,
        (),
        EngineConfig {
            idempotency_ttl: Duration::zero(),
            ..EngineConfig::default()
        },
    );
    let number = engine.create_account("Alice").await.unwrap().number;
    let key = IdempotencyKey::from("dep-1");

    engine
        .deposit(&number, dec("100"), Some(key.clone()))
        .await
        .unwrap();
    let second = engine.deposit(&number, dec("100"), Some(key)).await.unwrap();

    // The record expired immediately, so the retry is a brand-new deposit.
    assert!(!second.idempotent_replay);
    assert_eq!(engine.account(&number).await.unwrap().balance, dec("200"));
}

#[tokio::test]
async fn failed_withdrawals_are_not_memoized() {
    let (engine, number) = engine_with_account().await;
    let key = IdempotencyKey::from("wd-1");

    let err = engine
        .withdraw(&number, dec("50"), Some(key.clone()))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds { .. }));

    // After topping up, the same key succeeds for real.
    engine.deposit(&number, dec("80"), None).await.unwrap();
    let retry = engine.withdraw(&number, dec("50"), Some(key)).await.unwrap();
    assert!(!retry.idempotent_replay);
    assert_eq!(retry.resulting_balance, dec("30"));
}

#[tokio::test]
async fn balance_never_goes_negative_under_concurrent_withdrawals() {
    let (engine, number) = engine_with_account().await;
    engine.deposit(&number, dec("100"), None).await.unwrap();

    let outcomes = tokio::join!(
        engine.withdraw(&number, dec("30"), None),
        engine.withdraw(&number, dec("30"), None),
        engine.withdraw(&number, dec("30"), None),
        engine.withdraw(&number, dec("30"), None),
        engine.withdraw(&number, dec("30"), None),
    );
    let outcomes = [outcomes.0, outcomes.1, outcomes.2, outcomes.3, outcomes.4];

    // 100 covers exactly three withdrawals of 30, whatever the interleaving.
    let succeeded = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 3);
    for failure in outcomes.iter().filter(|r| r.is_err()) {
        assert!(matches!(
            failure,
            Err(LedgerError::InsufficientFunds { .. })
        ));
    }
    assert_eq!(engine.account(&number).await.unwrap().balance, dec("10"));
}

#[tokio::test]
async fn committed_transactions_are_published() {
    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    let hub = Arc::new(NotificationHub::new(HubConfig::default()));
    let engine = LedgerEngine::new(store, hub.clone());
    let number = engine.create_account("Alice").await.unwrap().number;

    let mut sub = hub.subscribe(number.clone());
    assert!(matches!(sub.recv().await, Some(NotifyMessage::Connected { .. })));

    // A rejected withdrawal publishes nothing.
    let _ = engine.withdraw(&number, dec("5"), None).await.unwrap_err();

    let deposit = engine.deposit(&number, dec("100"), None).await.unwrap();
    match sub.recv().await {
        Some(NotifyMessage::Transaction { data }) => {
            assert_eq!(data.transaction.id, deposit.transaction_id);
            assert_eq!(data.transaction.balance_after, dec("100"));
        }
        other => panic!("expected transaction event, got {other:?}"),
    }

    // A replay does not publish a second event.
    let key = IdempotencyKey::from("dep-1");
    engine
        .deposit(&number, dec("1"), Some(key.clone()))
        .await
        .unwrap();
    engine.deposit(&number, dec("1"), Some(key)).await.unwrap();
    let mut events = 0;
    while let Ok(msg) = sub.try_recv() {
        if matches!(msg, NotifyMessage::Transaction { .. }) {
            events += 1;
        }
    }
    assert_eq!(events, 1);
}

#[tokio::test]
async fn stuck_subscriber_does_not_stall_the_ledger() {
    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    let hub = Arc::new(NotificationHub::new(HubConfig {
        channel_capacity: 1,
        ..HubConfig::default()
    }));
    let engine = LedgerEngine::new(store, hub.clone());
    let number = engine.create_account("Alice").await.unwrap().number;

    // Never reads; its buffer is already full with the connected ack.
    let _stuck = hub.subscribe(number.clone());

    let result = engine.deposit(&number, dec("100"), None).await.unwrap();
    assert_eq!(result.resulting_balance, dec("100"));
    assert_eq!(hub.subscriber_count(&number), 0);
}
