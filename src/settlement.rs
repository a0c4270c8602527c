//! Settlement: the atomic application of one transaction's debit/credit
//! pair to its two services.
//!
//! Everything happens inside a single database transaction. Both service
//! rows are locked `FOR NO KEY UPDATE` in ascending id order; the order
//! must be total across all settlements, otherwise two transfers over the
//! same pair in opposite directions deadlock. On any failure the unit of
//! work is rolled back in full; no partial balance write survives.

use std::time::Duration;

use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::error::EngineError;
use crate::model::{ServiceState, Transaction, TransactionState};
use crate::store::lock_service_for_update;

pub struct SettlementEngine {
    pool: PgPool,
    timeout: Duration,
}

impl SettlementEngine {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Apply one transaction, bounded by the configured deadline.
    ///
    /// On timeout the in-flight database transaction is dropped, which
    /// rolls it back and releases the row locks; the row stays in its
    /// processing state.
    pub async fn settle(&self, txn: &Transaction) -> Result<(), EngineError> {
        match tokio::time::timeout(self.timeout, self.settle_inner(txn)).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::SettleTimeout(self.timeout)),
        }
    }

    async fn settle_inner(&self, txn: &Transaction) -> Result<(), EngineError> {
        if txn.source == txn.destination {
            return Err(EngineError::SameService);
        }

        let mut db_tx = self.pool.begin().await?;

        // Total lock order: ascending service id, regardless of transfer
        // direction.
        let (first_id, second_id) = ordered_pair(txn.source, txn.destination);
        let first = lock_service_for_update(&mut *db_tx, first_id).await?;
        let second = lock_service_for_update(&mut *db_tx, second_id).await?;

        let (mut source, mut destination) = if first.id == txn.source {
            (first, second)
        } else {
            (second, first)
        };

        if source.state != ServiceState::Active {
            return Err(EngineError::InactiveService(source.id));
        }
        source.debit(txn.amount)?;

        if destination.state != ServiceState::Active {
            return Err(EngineError::InactiveService(destination.id));
        }
        destination.credit(txn.amount)?;

        sqlx::query("UPDATE services SET balance = $1 WHERE id = $2")
            .bind(source.balance)
            .bind(source.id)
            .execute(&mut *db_tx)
            .await?;

        sqlx::query("UPDATE services SET balance = $1 WHERE id = $2")
            .bind(destination.balance)
            .bind(destination.id)
            .execute(&mut *db_tx)
            .await?;

        sqlx::query("UPDATE transactions SET state = $1 WHERE id = $2")
            .bind(TransactionState::Success.as_code())
            .bind(txn.id)
            .execute(&mut *db_tx)
            .await?;

        db_tx.commit().await?;

        debug!(
            transaction_id = %txn.id,
            source = %source.id,
            destination = %destination.id,
            amount = %txn.amount,
            "transaction settled"
        );
        Ok(())
    }
}

fn ordered_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a < b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_pair_is_direction_independent() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        assert_eq!(ordered_pair(a, b), ordered_pair(b, a));
    }
}
