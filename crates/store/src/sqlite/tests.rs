use chrono::Duration;
use rust_decimal::Decimal;

use ledgerd_core::{AccountNumber, IdempotencyKey, TransactionKind};

use crate::error::StoreError;
use crate::idempotency::IdempotencyStore;
use crate::ledger::LedgerStore;
use crate::sqlite::SqliteStore;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

async fn store_with_account() -> (SqliteStore, AccountNumber) {
    let store = SqliteStore::in_memory().await.unwrap();
    let number = AccountNumber::generate();
    store.insert_account(&number, "Alice").await.unwrap();
    (store, number)
}

#[tokio::test]
async fn account_roundtrip() {
    let (store, number) = store_with_account().await;

    let fetched = store.fetch_account(&number).await.unwrap().unwrap();
    assert_eq!(fetched.number, number);
    assert_eq!(fetched.holder_name, "Alice");
    assert_eq!(fetched.balance, Decimal::ZERO);

    let missing = "0000000000".parse().unwrap();
    assert!(store.fetch_account(&missing).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_account_number_is_rejected() {
    let (store, number) = store_with_account().await;
    let err = store.insert_account(&number, "Bob").await.unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(_)));
}

#[tokio::test]
async fn deposit_then_withdraw_updates_balance() {
    let (store, number) = store_with_account().await;

    let tx = store
        .apply_transaction(&number, TransactionKind::Deposit, dec("100"), None)
        .await
        .unwrap();
    assert_eq!(tx.balance_after, dec("100"));

    let tx = store
        .apply_transaction(&number, TransactionKind::Withdrawal, dec("30"), None)
        .await
        .unwrap();
    assert_eq!(tx.balance_after, dec("70"));

    let account = store.fetch_account(&number).await.unwrap().unwrap();
    assert_eq!(account.balance, dec("70"));
}

#[tokio::test]
async fn overdraft_rolls_back_cleanly() {
    let (store, number) = store_with_account().await;
    store
        .apply_transaction(&number, TransactionKind::Deposit, dec("70"), None)
        .await
        .unwrap();

    let err = store
        .apply_transaction(&number, TransactionKind::Withdrawal, dec("1000"), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::InsufficientFunds { available, requested }
            if available == dec("70") && requested == dec("1000")
    ));

    // Balance unchanged and no transaction row inserted.
    let account = store.fetch_account(&number).await.unwrap().unwrap();
    assert_eq!(account.balance, dec("70"));
    let history = store.transactions(&number, 10, 0).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn unknown_account_is_reported() {
    let store = SqliteStore::in_memory().await.unwrap();
    let number: AccountNumber = "1234567890".parse().unwrap();

    let err = store
        .apply_transaction(&number, TransactionKind::Deposit, dec("1"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::AccountNotFound(n) if n == number));

    let err = store.transactions(&number, 10, 0).await.unwrap_err();
    assert!(matches!(err, StoreError::AccountNotFound(_)));
}

#[tokio::test]
async fn history_is_newest_first_and_paginated() {
    let (store, number) = store_with_account().await;
    for i in 1..=5 {
        store
            .apply_transaction(&number, TransactionKind::Deposit, Decimal::from(i), None)
            .await
            .unwrap();
    }

    let page = store.transactions(&number, 2, 0).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].amount, dec("5"));
    assert_eq!(page[1].amount, dec("4"));
    assert!(page[0].id > page[1].id);

    let next = store.transactions(&number, 2, 2).await.unwrap();
    assert_eq!(next[0].amount, dec("3"));
    assert_eq!(next[1].amount, dec("2"));
}

#[tokio::test]
async fn idempotency_roundtrip_and_expiry() {
    let (store, number) = store_with_account().await;
    let key = IdempotencyKey::from("k1");

    assert!(
        store
            .lookup(TransactionKind::Deposit, &number, &key)
            .await
            .unwrap()
            .is_none()
    );

    store
        .store(
            TransactionKind::Deposit,
            &number,
            &key,
            dec("100"),
            r#"{"ok":true}"#,
            Duration::hours(24),
        )
        .await
        .unwrap();

    let hit = store
        .lookup(TransactionKind::Deposit, &number, &key)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(hit.amount, dec("100"));
    assert_eq!(hit.response, r#"{"ok":true}"#);

    // Same key under the other operation is a distinct record.
    assert!(
        store
            .lookup(TransactionKind::Withdrawal, &number, &key)
            .await
            .unwrap()
            .is_none()
    );

    // A record whose expiry already passed never satisfies a lookup.
    let expired = IdempotencyKey::from("k2");
    store
        .store(
            TransactionKind::Deposit,
            &number,
            &expired,
            dec("1"),
            "{}",
            Duration::seconds(-1),
        )
        .await
        .unwrap();
    assert!(
        store
            .lookup(TransactionKind::Deposit, &number, &expired)
            .await
            .unwrap()
            .is_none()
    );

    let purged = store.purge_expired().await.unwrap();
    assert_eq!(purged, 1);
    assert!(
        store
            .lookup(TransactionKind::Deposit, &number, &key)
            .await
            .unwrap()
            .is_some()
    );
}
