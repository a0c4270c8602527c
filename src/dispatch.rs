//! Dispatch: the bounded hand-off between "record a transfer intent" and
//! "apply it".
//!
//! The queue is an explicit object created by the embedder and injected
//! into both halves: the [`Dispatcher`] (producer side, called by the
//! request path) and the [`WorkerPool`] (consumer side). Submission
//! persists the transaction first, then enqueues without blocking: a
//! full queue fails fast and the durable row is left unscheduled.
//!
//! Workers drain the queue until it closes (the last sender is dropped),
//! settling each item and logging failures without retry; a failed
//! settlement leaves the transaction row in its processing state, which
//! from the query API is indistinguishable from one still waiting.

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::EngineError;
use crate::model::Transaction;
use crate::settlement::SettlementEngine;
use crate::store::TransactionStore;

// ============================================================================
// Queue
// ============================================================================

/// Create the bounded dispatch queue.
///
/// Panics when `capacity` is zero: queue sizing is startup configuration,
/// and a queue that can never accept work is a configuration error.
pub fn queue(capacity: usize) -> (QueueSender, QueueReceiver) {
    assert!(capacity >= 1, "dispatch queue capacity must be at least 1");
    let (tx, rx) = mpsc::channel(capacity);
    (QueueSender { tx }, QueueReceiver { rx })
}

/// Producer half of the dispatch queue.
#[derive(Clone)]
pub struct QueueSender {
    tx: mpsc::Sender<Transaction>,
}

impl QueueSender {
    /// Non-blocking enqueue. Fails with [`EngineError::QueueSaturated`]
    /// when the queue is full or closed.
    pub fn try_push(&self, txn: Transaction) -> Result<(), EngineError> {
        self.tx.try_send(txn).map_err(|_| EngineError::QueueSaturated)
    }
}

/// Consumer half of the dispatch queue; consumed by [`WorkerPool::spawn`].
pub struct QueueReceiver {
    rx: mpsc::Receiver<Transaction>,
}

// ============================================================================
// Submission
// ============================================================================

/// A transfer request as received from the boundary: move `amount` of
/// `currency` from `source` to `destination`.
#[derive(Debug, Clone)]
pub struct TransferIntent {
    pub currency: String,
    pub amount: Decimal,
    pub source: Uuid,
    pub destination: Uuid,
}

fn validate(intent: &TransferIntent) -> Result<(), EngineError> {
    if intent.amount.is_sign_negative() {
        return Err(EngineError::InvalidAmount);
    }
    if intent.currency.trim().is_empty() {
        return Err(EngineError::InvalidCurrency);
    }
    if intent.source == intent.destination {
        return Err(EngineError::SameService);
    }
    Ok(())
}

/// Caller-facing entry point: validates, durably records, then schedules.
pub struct Dispatcher {
    transactions: TransactionStore,
    queue: QueueSender,
}

impl Dispatcher {
    pub fn new(transactions: TransactionStore, queue: QueueSender) -> Self {
        Self { transactions, queue }
    }

    /// Accept a transfer request.
    ///
    /// Validation failures reject before anything is persisted. After the
    /// row is durably created the enqueue is non-blocking: on saturation
    /// this returns [`EngineError::QueueSaturated`] and the transaction
    /// exists but is not scheduled; the core never re-submits it.
    pub async fn submit(&self, intent: TransferIntent) -> Result<Uuid, EngineError> {
        validate(&intent)?;

        let txn = Transaction::new(
            intent.currency,
            intent.amount,
            intent.source,
            intent.destination,
        );
        let stored = self.transactions.create(&txn).await?;
        let id = stored.id;

        self.queue.try_push(stored)?;

        debug!(transaction_id = %id, "transaction queued");
        Ok(id)
    }
}

// ============================================================================
// Worker pool
// ============================================================================

/// A fixed set of workers draining the dispatch queue.
///
/// Dropping the last [`QueueSender`] (usually by dropping the
/// [`Dispatcher`]) closes the queue; workers finish the items already
/// queued and exit. An in-flight settlement is never interrupted.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `workers` tasks consuming from `receiver`.
    ///
    /// Panics when `workers` is zero: a pool that can never drain the
    /// queue is a configuration error, caught at startup.
    pub fn spawn(engine: Arc<SettlementEngine>, receiver: QueueReceiver, workers: usize) -> Self {
        assert!(workers >= 1, "worker count must be at least 1");

        let rx = Arc::new(Mutex::new(receiver.rx));
        let handles = (0..workers)
            .map(|worker| tokio::spawn(worker_loop(worker, engine.clone(), rx.clone())))
            .collect();

        Self { handles }
    }

    /// Wait for every worker to exit. Only returns once the queue is
    /// closed and drained.
    pub async fn join(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

async fn worker_loop(
    worker: usize,
    engine: Arc<SettlementEngine>,
    rx: Arc<Mutex<mpsc::Receiver<Transaction>>>,
) {
    loop {
        // Hold the receiver lock only for the dequeue so other workers
        // can pull the next item while this one settles.
        let item = { rx.lock().await.recv().await };

        let Some(txn) = item else {
            debug!(worker, "dispatch queue closed, worker exiting");
            break;
        };

        match engine.settle(&txn).await {
            Ok(()) => {
                debug!(worker, transaction_id = %txn.id, "settlement complete");
            }
            Err(e) => {
                // No retry and no dead-letter: the row stays in its
                // processing state.
                error!(worker, transaction_id = %txn.id, error = %e, "settlement failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(amount: i64) -> TransferIntent {
        TransferIntent {
            currency: "USD".to_string(),
            amount: Decimal::from(amount),
            source: Uuid::now_v7(),
            destination: Uuid::now_v7(),
        }
    }

    fn transaction() -> Transaction {
        Transaction::new("USD", Decimal::ONE, Uuid::now_v7(), Uuid::now_v7())
    }

    #[test]
    fn validate_rejects_negative_amount() {
        let mut bad = intent(0);
        bad.amount = Decimal::from(-1);
        let err = validate(&bad).unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount));
        assert!(err.is_validation());
    }

    #[test]
    fn validate_rejects_blank_currency() {
        let mut bad = intent(10);
        bad.currency = "  ".to_string();
        assert!(matches!(validate(&bad), Err(EngineError::InvalidCurrency)));
    }

    #[test]
    fn validate_rejects_self_transfer() {
        let mut bad = intent(10);
        bad.destination = bad.source;
        assert!(matches!(validate(&bad), Err(EngineError::SameService)));
    }

    #[test]
    fn validate_accepts_zero_amount() {
        assert!(validate(&intent(0)).is_ok());
    }

    #[tokio::test]
    async fn try_push_fails_fast_when_full() {
        let (sender, _receiver) = queue(1);

        sender.try_push(transaction()).unwrap();
        let err = sender.try_push(transaction()).unwrap_err();
        assert!(matches!(err, EngineError::QueueSaturated));
    }

    #[tokio::test]
    async fn try_push_fails_when_closed() {
        let (sender, receiver) = queue(4);
        drop(receiver);

        let err = sender.try_push(transaction()).unwrap_err();
        assert!(matches!(err, EngineError::QueueSaturated));
    }

    #[test]
    #[should_panic(expected = "capacity must be at least 1")]
    fn zero_capacity_queue_panics() {
        let _ = queue(0);
    }
}
