//! Transaction persistence.
//!
//! Rows are inserted in the `Processing` state with a server-assigned
//! timestamp; listings are keyset-paginated by id (ascending) so pages
//! stay stable under concurrent inserts.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::EngineError;
use crate::model::{Transaction, TransactionState};

/// Page size used when the caller passes a non-positive limit.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

const TRANSACTION_COLUMNS: &str = "id, state, time, currency, amount, source, destination";

#[derive(Clone)]
pub struct TransactionStore {
    pool: PgPool,
}

impl TransactionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Durably record a transaction intent.
    ///
    /// The row is written with `state = 'PRC'` and `time = now()`; the
    /// returned record carries the server-assigned timestamp.
    pub async fn create(&self, txn: &Transaction) -> Result<Transaction, EngineError> {
        let row = sqlx::query(
            r#"
            INSERT INTO transactions (id, state, time, currency, amount, source, destination)
            VALUES ($1, $2, now(), $3, $4, $5, $6)
            RETURNING time
            "#,
        )
        .bind(txn.id)
        .bind(TransactionState::Processing.as_code())
        .bind(&txn.currency)
        .bind(txn.amount)
        .bind(txn.source)
        .bind(txn.destination)
        .fetch_one(&self.pool)
        .await?;

        let time: DateTime<Utc> = row.try_get("time")?;
        Ok(Transaction {
            state: TransactionState::Processing,
            time,
            ..txn.clone()
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Transaction>, EngineError> {
        let row = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_transaction).transpose()
    }

    /// Keyset-paginated listing of all transactions, ascending by id.
    pub async fn list(
        &self,
        cursor: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<Transaction>, EngineError> {
        let limit = if limit <= 0 { DEFAULT_PAGE_SIZE } else { limit };

        let rows = match cursor {
            Some(cursor) => {
                sqlx::query(&format!(
                    "SELECT {TRANSACTION_COLUMNS} FROM transactions \
                     WHERE id > $1 ORDER BY id LIMIT $2"
                ))
                .bind(cursor)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {TRANSACTION_COLUMNS} FROM transactions ORDER BY id LIMIT $1"
                ))
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(row_to_transaction).collect()
    }

    /// Transactions originating from one service, keyset-paginated.
    pub async fn list_for_service(
        &self,
        service_id: Uuid,
        cursor: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<Transaction>, EngineError> {
        let limit = if limit <= 0 { DEFAULT_PAGE_SIZE } else { limit };

        let rows = match cursor {
            Some(cursor) => {
                sqlx::query(&format!(
                    "SELECT {TRANSACTION_COLUMNS} FROM transactions \
                     WHERE source = $1 AND id > $2 ORDER BY id LIMIT $3"
                ))
                .bind(service_id)
                .bind(cursor)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {TRANSACTION_COLUMNS} FROM transactions \
                     WHERE source = $1 ORDER BY id LIMIT $2"
                ))
                .bind(service_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(row_to_transaction).collect()
    }
}

fn row_to_transaction(row: &PgRow) -> Result<Transaction, EngineError> {
    let state_code: String = row.try_get("state")?;
    let state = TransactionState::from_code(&state_code)
        .ok_or_else(|| EngineError::Corrupt(format!("unknown transaction state {state_code:?}")))?;

    Ok(Transaction {
        id: row.try_get("id")?,
        state,
        time: row.try_get("time")?,
        currency: row.try_get("currency")?,
        amount: row.try_get("amount")?,
        source: row.try_get("source")?,
        destination: row.try_get("destination")?,
    })
}
