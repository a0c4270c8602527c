//! The Service entity (an account holding a balance) and the ledger
//! rules that govern balance mutation.
//!
//! `debit`/`credit` are pure in-memory mutations. Persisting the new
//! balances (and doing so atomically with the transaction record) is the
//! settlement engine's job; nothing else may write `balance`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Permission bits
// ============================================================================
pub mod permissions {
    pub const DEBIT: i64 = 1 << 0;
    pub const CREDIT: i64 = 1 << 1;
    pub const OVERDRAFT: i64 = 1 << 2;
    /// Granted to newly created services.
    pub const DEFAULT: i64 = DEBIT | CREDIT;
}

/// Service category. Opaque to the settlement engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceType {
    Savings,
    Chequing,
    Loan,
    LineOfCredit,
    CertificateOfDeposit,
}

impl ServiceType {
    /// Three-letter code stored in the `type` column.
    pub fn as_code(&self) -> &'static str {
        match self {
            ServiceType::Savings => "SAV",
            ServiceType::Chequing => "CHQ",
            ServiceType::Loan => "LOA",
            ServiceType::LineOfCredit => "LOC",
            ServiceType::CertificateOfDeposit => "COD",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "SAV" => Some(ServiceType::Savings),
            "CHQ" => Some(ServiceType::Chequing),
            "LOA" => Some(ServiceType::Loan),
            "LOC" => Some(ServiceType::LineOfCredit),
            "COD" => Some(ServiceType::CertificateOfDeposit),
            _ => None,
        }
    }
}

/// Service lifecycle state. Settlement only proceeds against `Active`
/// services; the permission bitmask is independent of this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceState {
    Requested,
    Active,
    Frozen,
    Closed,
}

impl ServiceState {
    pub fn as_code(&self) -> &'static str {
        match self {
            ServiceState::Requested => "REQ",
            ServiceState::Active => "ACT",
            ServiceState::Frozen => "FRZ",
            ServiceState::Closed => "CLS",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "REQ" => Some(ServiceState::Requested),
            "ACT" => Some(ServiceState::Active),
            "FRZ" => Some(ServiceState::Frozen),
            "CLS" => Some(ServiceState::Closed),
            _ => None,
        }
    }
}

/// Ledger-rule rejection raised by `debit`/`credit`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerError {
    #[error("service {0} does not have debit permission")]
    DebitNotPermitted(Uuid),

    #[error("service {0} does not have credit permission")]
    CreditNotPermitted(Uuid),

    #[error("service {0} does not have overdraft permission")]
    Overdraft(Uuid),
}

/// An account. `init_balance` is a floor offset: a debit may not drive
/// `balance + init_balance` negative unless OVERDRAFT is granted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub kind: ServiceType,
    pub state: ServiceState,
    pub permissions: i64,
    pub currency: String,
    pub init_balance: Decimal,
    pub balance: Decimal,
}

impl Service {
    /// A fresh service: requested, zero balance, debit+credit granted.
    pub fn new(kind: ServiceType, currency: impl Into<String>, init_balance: Decimal) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind,
            state: ServiceState::Requested,
            permissions: permissions::DEFAULT,
            currency: currency.into(),
            init_balance,
            balance: Decimal::ZERO,
        }
    }

    /// Non-zero intersection with the permission bitmask.
    pub fn has_permission(&self, mask: i64) -> bool {
        self.permissions & mask != 0
    }

    /// Remove `amount` from the balance.
    ///
    /// Fails without the DEBIT bit, or when the adjusted balance
    /// (`balance + init_balance`) would go negative without OVERDRAFT.
    /// On failure the balance is untouched.
    pub fn debit(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        if !self.has_permission(permissions::DEBIT) {
            return Err(LedgerError::DebitNotPermitted(self.id));
        }
        let new_balance = self.balance - amount;
        if (new_balance + self.init_balance).is_sign_negative()
            && !self.has_permission(permissions::OVERDRAFT)
        {
            return Err(LedgerError::Overdraft(self.id));
        }
        self.balance = new_balance;
        Ok(())
    }

    /// Add `amount` to the balance. Fails without the CREDIT bit.
    pub fn credit(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        if !self.has_permission(permissions::CREDIT) {
            return Err(LedgerError::CreditNotPermitted(self.id));
        }
        self.balance += amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active_service(balance: i64, perms: i64) -> Service {
        let mut srv = Service::new(ServiceType::Chequing, "USD", Decimal::ZERO);
        srv.state = ServiceState::Active;
        srv.permissions = perms;
        srv.balance = Decimal::from(balance);
        srv
    }

    #[test]
    fn new_service_defaults() {
        let srv = Service::new(ServiceType::Savings, "USD", Decimal::from(50));
        assert_eq!(srv.state, ServiceState::Requested);
        assert_eq!(srv.permissions, permissions::DEFAULT);
        assert_eq!(srv.balance, Decimal::ZERO);
        assert_eq!(srv.init_balance, Decimal::from(50));
        assert!(srv.has_permission(permissions::DEBIT));
        assert!(srv.has_permission(permissions::CREDIT));
        assert!(!srv.has_permission(permissions::OVERDRAFT));
    }

    #[test]
    fn debit_decreases_balance() {
        let mut srv = active_service(100, permissions::DEFAULT);
        srv.debit(Decimal::from(30)).unwrap();
        assert_eq!(srv.balance, Decimal::from(70));
    }

    #[test]
    fn debit_requires_permission() {
        let mut srv = active_service(100, permissions::CREDIT);
        let err = srv.debit(Decimal::from(10)).unwrap_err();
        assert_eq!(err, LedgerError::DebitNotPermitted(srv.id));
        assert_eq!(srv.balance, Decimal::from(100));
    }

    #[test]
    fn debit_past_floor_rejected_without_overdraft() {
        let mut srv = active_service(100, permissions::DEFAULT);
        let err = srv.debit(Decimal::from(101)).unwrap_err();
        assert_eq!(err, LedgerError::Overdraft(srv.id));
        assert_eq!(srv.balance, Decimal::from(100));
    }

    #[test]
    fn debit_past_floor_allowed_with_overdraft() {
        let mut srv = active_service(100, permissions::DEFAULT | permissions::OVERDRAFT);
        srv.debit(Decimal::from(150)).unwrap();
        assert_eq!(srv.balance, Decimal::from(-50));
    }

    #[test]
    fn init_balance_extends_the_floor() {
        // balance 10 + init_balance 20 covers a debit of 30, not 31
        let mut srv = active_service(10, permissions::DEFAULT);
        srv.init_balance = Decimal::from(20);
        srv.debit(Decimal::from(30)).unwrap();
        assert_eq!(srv.balance, Decimal::from(-20));
        assert_eq!(
            srv.debit(Decimal::from(1)),
            Err(LedgerError::Overdraft(srv.id))
        );
    }

    #[test]
    fn credit_requires_credit_bit() {
        // The credit check is on the CREDIT bit; a debit-only service
        // cannot receive funds.
        let mut srv = active_service(0, permissions::DEBIT);
        let err = srv.credit(Decimal::from(10)).unwrap_err();
        assert_eq!(err, LedgerError::CreditNotPermitted(srv.id));
        assert_eq!(srv.balance, Decimal::ZERO);
    }

    #[test]
    fn debit_credit_pair_conserves_total() {
        let mut src = active_service(100, permissions::DEFAULT);
        let mut dst = active_service(0, permissions::DEFAULT);
        let before = src.balance + dst.balance;

        let amount: Decimal = "30.25".parse().unwrap();
        src.debit(amount).unwrap();
        dst.credit(amount).unwrap();

        assert_eq!(src.balance + dst.balance, before);
        assert_eq!(src.balance, "69.75".parse::<Decimal>().unwrap());
        assert_eq!(dst.balance, amount);
    }

    #[test]
    fn state_codes_round_trip() {
        for state in [
            ServiceState::Requested,
            ServiceState::Active,
            ServiceState::Frozen,
            ServiceState::Closed,
        ] {
            assert_eq!(ServiceState::from_code(state.as_code()), Some(state));
        }
        assert_eq!(ServiceState::from_code("XXX"), None);
    }
}
