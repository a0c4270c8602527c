//! Engine error taxonomy.
//!
//! Validation errors are surfaced synchronously at submit time, before
//! anything is persisted. Settlement errors happen after the transaction
//! row is already durable; they reach the worker loop, get logged, and
//! the row stays in its processing state.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::model::LedgerError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid amount: must not be negative")]
    InvalidAmount,

    #[error("invalid currency code")]
    InvalidCurrency,

    #[error("source and destination services are the same")]
    SameService,

    #[error("dispatch queue is full or unavailable")]
    QueueSaturated,

    #[error("service {0} is not active")]
    InactiveService(Uuid),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("settlement timed out after {0:?}")]
    SettleTimeout(Duration),

    #[error("corrupt stored record: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Store(#[from] sqlx::Error),
}

impl EngineError {
    /// True for errors rejected at submit time, before persistence.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidAmount | EngineError::InvalidCurrency | EngineError::SameService
        )
    }
}
