//! The Transaction entity: a record of an intended transfer between two
//! services and, once settled, its outcome.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Transaction lifecycle. Rows are created `Processing`; settlement flips
/// them to `Success`. `Error` is part of the stored code space but the
/// engine never assigns it; a failed settlement leaves the row
/// `Processing` (see the worker loop in `dispatch`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionState {
    Processing,
    Success,
    Error,
}

impl TransactionState {
    pub fn as_code(&self) -> &'static str {
        match self {
            TransactionState::Processing => "PRC",
            TransactionState::Success => "SUC",
            TransactionState::Error => "ERR",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "PRC" => Some(TransactionState::Processing),
            "SUC" => Some(TransactionState::Success),
            "ERR" => Some(TransactionState::Error),
            _ => None,
        }
    }
}

/// A transfer of `amount` from `source` to `destination`.
///
/// `time` is server-assigned when the row is persisted; the value set by
/// the constructor is a placeholder and is replaced by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub state: TransactionState,
    pub time: DateTime<Utc>,
    pub currency: String,
    pub amount: Decimal,
    pub source: Uuid,
    pub destination: Uuid,
}

impl Transaction {
    pub fn new(
        currency: impl Into<String>,
        amount: Decimal,
        source: Uuid,
        destination: Uuid,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            state: TransactionState::Processing,
            time: Utc::now(),
            currency: currency.into(),
            amount,
            source,
            destination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_transaction_starts_processing() {
        let src = Uuid::now_v7();
        let dst = Uuid::now_v7();
        let txn = Transaction::new("USD", Decimal::from(10), src, dst);

        assert_eq!(txn.state, TransactionState::Processing);
        assert_eq!(txn.source, src);
        assert_eq!(txn.destination, dst);
        assert_eq!(txn.amount, Decimal::from(10));
    }

    #[test]
    fn ids_are_time_ordered() {
        // UUIDv7 ids sort by creation time, which keyset pagination
        // relies on.
        let a = Transaction::new("USD", Decimal::ONE, Uuid::now_v7(), Uuid::now_v7());
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = Transaction::new("USD", Decimal::ONE, Uuid::now_v7(), Uuid::now_v7());
        assert!(a.id < b.id);
    }

    #[test]
    fn state_codes_round_trip() {
        for state in [
            TransactionState::Processing,
            TransactionState::Success,
            TransactionState::Error,
        ] {
            assert_eq!(TransactionState::from_code(state.as_code()), Some(state));
        }
        assert_eq!(TransactionState::from_code(""), None);
    }
}
