//! teller: transaction processing core for a minimal banking backend.
//!
//! Users own financial services (accounts) with decimal balances; funds
//! move between services via transactions. This crate accepts a transfer
//! request, durably records it, hands it to a bounded dispatch queue, and
//! settles it asynchronously under row locks with full rollback on
//! failure. It is a library: the HTTP boundary that authenticates callers
//! and parses requests lives elsewhere and consumes this crate's API.
//!
//! # Modules
//!
//! - [`model`] - Service and Transaction entities and the ledger rules
//! - [`store`] - PostgreSQL persistence and keyset-paginated reads
//! - [`settlement`] - atomic debit/credit under ordered row locks
//! - [`dispatch`] - bounded queue, submission entry point, worker pool
//! - [`config`] - YAML application configuration
//! - [`logging`] - tracing subscriber setup
//! - [`db`] - connection pool management
//!
//! # Wiring
//!
//! ```ignore
//! let config = AppConfig::load("dev");
//! let _guard = logging::init_logging(&config);
//! let db = Database::connect(config.postgres_url.as_deref().unwrap()).await?;
//!
//! let (queue_tx, queue_rx) = dispatch::queue(config.dispatch.queue_size);
//! let engine = Arc::new(SettlementEngine::new(
//!     db.pool().clone(),
//!     config.dispatch.settle_timeout(),
//! ));
//! let dispatcher = Dispatcher::new(TransactionStore::new(db.pool().clone()), queue_tx);
//! let workers = WorkerPool::spawn(engine, queue_rx, config.dispatch.workers);
//!
//! let id = dispatcher.submit(intent).await?;
//! // ... on shutdown:
//! drop(dispatcher);
//! workers.join().await;
//! ```

pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod model;
pub mod settlement;
pub mod store;

// Convenient re-exports at crate root
pub use config::{AppConfig, DispatchSettings};
pub use db::Database;
pub use dispatch::{Dispatcher, QueueReceiver, QueueSender, TransferIntent, WorkerPool, queue};
pub use error::EngineError;
pub use model::{
    LedgerError, Service, ServiceState, ServiceType, Transaction, TransactionState, permissions,
};
pub use settlement::SettlementEngine;
pub use store::{ServiceStore, TransactionStore, schema::ensure_schema};
