//! Core entities: services (accounts) and the transactions that move
//! funds between them.

mod service;
mod transaction;

pub use service::{LedgerError, Service, ServiceState, ServiceType, permissions};
pub use transaction::{Transaction, TransactionState};
