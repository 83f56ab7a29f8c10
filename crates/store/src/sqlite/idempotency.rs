//! `IdempotencyStore` over SQLite.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sqlx::Row;
use tracing::instrument;

use ledgerd_core::{AccountNumber, IdempotencyKey, TransactionKind};

use crate::error::StoreError;
use crate::idempotency::{IdempotencyRecord, IdempotencyStore};

use super::{SqliteStore, decode_decimal};

#[async_trait]
impl IdempotencyStore for SqliteStore {
    async fn lookup(
        &self,
        operation: TransactionKind,
        number: &AccountNumber,
        key: &IdempotencyKey,
    ) -> Result<Option<IdempotencyRecord>, StoreError> {
        // Expired rows are filtered here rather than deleted; `purge_expired`
        // handles removal.
        let row = sqlx::query(
            "SELECT amount, response, created_at, expires_at
             FROM idempotency_keys
             WHERE operation = ?1 AND account_number = ?2 AND idem_key = ?3
               AND expires_at > ?4",
        )
        .bind(operation.as_str())
        .bind(number.as_str())
        .bind(key.as_str())
        .bind(Utc::now())
        .fetch_optional(self.pool())
        .await?;

        row.map(|row| {
            Ok(IdempotencyRecord {
                amount: decode_decimal(&row.try_get::<String, _>("amount")?)?,
                response: row.try_get("response")?,
                created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
                expires_at: row.try_get::<DateTime<Utc>, _>("expires_at")?,
            })
        })
        .transpose()
    }

    #[instrument(skip(self, response), fields(operation = %operation, account = %number, key = %key), err)]
    async fn store(
        &self,
        operation: TransactionKind,
        number: &AccountNumber,
        key: &IdempotencyKey,
        amount: Decimal,
        response: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let now = Utc::now();
        sqlx::query(
            "INSERT OR REPLACE INTO idempotency_keys
             (operation, account_number, idem_key, amount, response, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(operation.as_str())
        .bind(number.as_str())
        .bind(key.as_str())
        .bind(amount.to_string())
        .bind(response)
        .bind(now)
        .bind(now + ttl)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM idempotency_keys WHERE expires_at <= ?1")
            .bind(Utc::now())
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }
}
