//! `LedgerStore` over SQLite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tracing::instrument;

use ledgerd_core::{
    Account, AccountNumber, IdempotencyKey, Transaction, TransactionId, TransactionKind,
};

use crate::error::StoreError;
use crate::ledger::LedgerStore;

use super::{SqliteStore, decode_decimal};

#[async_trait]
impl LedgerStore for SqliteStore {
    #[instrument(skip(self), fields(account = %number), err)]
    async fn insert_account(
        &self,
        number: &AccountNumber,
        holder_name: &str,
    ) -> Result<Account, StoreError> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO accounts (account_number, holder_name, balance, created_at)
             VALUES (?1, ?2, '0', ?3)",
        )
        .bind(number.as_str())
        .bind(holder_name)
        .bind(now)
        .execute(self.pool())
        .await
        .map_err(|e| {
            if StoreError::is_unique_violation(&e) {
                StoreError::Duplicate(format!("account number {number}"))
            } else {
                e.into()
            }
        })?;

        Ok(Account {
            id: result.last_insert_rowid(),
            number: number.clone(),
            holder_name: holder_name.to_owned(),
            balance: Decimal::ZERO,
            created_at: now,
        })
    }

    async fn fetch_account(
        &self,
        number: &AccountNumber,
    ) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(
            "SELECT id, account_number, holder_name, balance, created_at
             FROM accounts WHERE account_number = ?1",
        )
        .bind(number.as_str())
        .fetch_optional(self.pool())
        .await?;

        row.map(|row| decode_account(&row)).transpose()
    }

    #[instrument(skip(self), fields(account = %number, kind = %kind, amount = %amount), err)]
    async fn apply_transaction(
        &self,
        number: &AccountNumber,
        kind: TransactionKind,
        amount: Decimal,
        idempotency_key: Option<&IdempotencyKey>,
    ) -> Result<Transaction, StoreError> {
        // Everything below runs in one storage transaction. Early returns
        // drop `tx`, which rolls back; the account is left untouched.
        let mut tx = self.pool().begin().await?;

        let row = sqlx::query("SELECT id, balance FROM accounts WHERE account_number = ?1")
            .bind(number.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Err(StoreError::AccountNotFound(number.clone()));
        };
        let account_id: i64 = row.try_get("id")?;
        let balance = decode_decimal(&row.try_get::<String, _>("balance")?)?;

        let balance_after = match kind {
            TransactionKind::Deposit => balance + amount,
            TransactionKind::Withdrawal => {
                if balance < amount {
                    return Err(StoreError::InsufficientFunds {
                        available: balance,
                        requested: amount,
                    });
                }
                balance - amount
            }
        };

        sqlx::query("UPDATE accounts SET balance = ?1 WHERE id = ?2")
            .bind(balance_after.to_string())
            .bind(account_id)
            .execute(&mut *tx)
            .await?;

        let now = Utc::now();
        let inserted = sqlx::query(
            "INSERT INTO transactions (account_id, kind, amount, balance_after, idempotency_key, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(account_id)
        .bind(kind.as_str())
        .bind(amount.to_string())
        .bind(balance_after.to_string())
        .bind(idempotency_key.map(IdempotencyKey::as_str))
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Transaction {
            id: TransactionId::new(inserted.last_insert_rowid()),
            account_number: number.clone(),
            kind,
            amount,
            balance_after,
            created_at: now,
            idempotency_key: idempotency_key.cloned(),
        })
    }

    async fn transactions(
        &self,
        number: &AccountNumber,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Transaction>, StoreError> {
        let account = sqlx::query("SELECT id FROM accounts WHERE account_number = ?1")
            .bind(number.as_str())
            .fetch_optional(self.pool())
            .await?;
        let Some(account) = account else {
            return Err(StoreError::AccountNotFound(number.clone()));
        };
        let account_id: i64 = account.try_get("id")?;

        let rows = sqlx::query(
            "SELECT id, kind, amount, balance_after, idempotency_key, created_at
             FROM transactions WHERE account_id = ?1
             ORDER BY id DESC LIMIT ?2 OFFSET ?3",
        )
        .bind(account_id)
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(|row| decode_transaction(row, number))
            .collect()
    }
}

fn decode_account(row: &SqliteRow) -> Result<Account, StoreError> {
    let number: String = row.try_get("account_number")?;
    let number = number
        .parse::<AccountNumber>()
        .map_err(|e| StoreError::Corrupt(e.to_string()))?;
    Ok(Account {
        id: row.try_get("id")?,
        number,
        holder_name: row.try_get("holder_name")?,
        balance: decode_decimal(&row.try_get::<String, _>("balance")?)?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn decode_transaction(row: &SqliteRow, number: &AccountNumber) -> Result<Transaction, StoreError> {
    let kind: String = row.try_get("kind")?;
    let kind = TransactionKind::parse(&kind).map_err(|e| StoreError::Corrupt(e.to_string()))?;
    Ok(Transaction {
        id: TransactionId::new(row.try_get("id")?),
        account_number: number.clone(),
        kind,
        amount: decode_decimal(&row.try_get::<String, _>("amount")?)?,
        balance_after: decode_decimal(&row.try_get::<String, _>("balance_after")?)?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        idempotency_key: row
            .try_get::<Option<String>, _>("idempotency_key")?
            .map(IdempotencyKey::new),
    })
}
