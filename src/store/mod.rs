pub mod memory;

use std::fmt;
use thiserror::Error;

use crate::config::FinancialSettings;
use crate::gateway::BoletoArtifact;
use crate::lease::{Contract, Owner, Property, Tenant};
use crate::payments::{Payment, SettlementUpdate};
use crate::receipts::{Receipt, ReceiptFilter};
use crate::types::{
    CompetenceMonth, ContractId, IssuerId, OwnerId, PaymentId, PaymentStatus, PropertyId, TenantId,
};

pub use memory::InMemoryStore;

/// uniqueness constraints a store must enforce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// one payment per (contract, competence month)
    PaymentMonth,
    /// one receipt per payment
    ReceiptPayment,
    /// one receipt per (issuer, number)
    ReceiptNumber,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Constraint::PaymentMonth => "payment_contract_month",
            Constraint::ReceiptPayment => "receipt_payment",
            Constraint::ReceiptNumber => "receipt_issuer_number",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: Constraint },

    #[error("store unavailable: {message}")]
    Unavailable { message: String },
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        StoreError::Unavailable {
            message: message.into(),
        }
    }

    pub fn violates(&self, constraint: Constraint) -> bool {
        matches!(self, StoreError::UniqueViolation { constraint: c } if *c == constraint)
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// outcome of an update that only applies while a payment is still pending
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionalUpdate {
    /// the payment was pending and now carries the update
    Applied(Payment),
    /// the payment was no longer pending; current state returned untouched
    Rejected(Payment),
    Missing,
}

/// contracts and the parties around them
pub trait ContractStore: Send + Sync {
    fn contract(&self, id: ContractId) -> StoreResult<Option<Contract>>;

    fn contracts(&self) -> StoreResult<Vec<Contract>>;

    fn property(&self, id: PropertyId) -> StoreResult<Option<Property>>;

    fn owner(&self, id: OwnerId) -> StoreResult<Option<Owner>>;

    fn tenant(&self, id: TenantId) -> StoreResult<Option<Tenant>>;
}

/// payment rows with a conditional-update primitive
pub trait PaymentStore: Send + Sync {
    fn payment(&self, id: PaymentId) -> StoreResult<Option<Payment>>;

    fn payment_for_month(
        &self,
        contract_id: ContractId,
        competence: CompetenceMonth,
    ) -> StoreResult<Option<Payment>>;

    /// ordered by due date
    fn payments_for_contract(&self, contract_id: ContractId) -> StoreResult<Vec<Payment>>;

    fn payments_by_status(&self, status: PaymentStatus) -> StoreResult<Vec<Payment>>;

    /// fails with [`Constraint::PaymentMonth`] if the month is taken
    fn insert_payment(&self, payment: Payment) -> StoreResult<()>;

    /// apply the update only if the payment is still pending, atomically
    fn settle_if_pending(
        &self,
        id: PaymentId,
        update: &SettlementUpdate,
    ) -> StoreResult<ConditionalUpdate>;

    fn attach_charge_if_pending(
        &self,
        id: PaymentId,
        charge: &BoletoArtifact,
    ) -> StoreResult<ConditionalUpdate>;
}

/// issued receipts
pub trait ReceiptStore: Send + Sync {
    fn receipt_for_payment(&self, payment_id: PaymentId) -> StoreResult<Option<Receipt>>;

    /// highest sequence issued for the issuer in the month, 0 if none
    fn last_sequence(&self, issuer_id: IssuerId, competence: CompetenceMonth) -> StoreResult<u32>;

    /// fails with [`Constraint::ReceiptPayment`] or [`Constraint::ReceiptNumber`]
    fn insert_receipt(&self, receipt: Receipt) -> StoreResult<()>;

    /// ordered by competence, then number
    fn receipts(&self, filter: &ReceiptFilter) -> StoreResult<Vec<Receipt>>;
}

/// per-issuer financial settings
pub trait SettingsStore: Send + Sync {
    /// `None` when the issuer never configured anything
    fn financial_settings(&self, issuer_id: IssuerId) -> StoreResult<Option<FinancialSettings>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violates() {
        let err = StoreError::UniqueViolation {
            constraint: Constraint::ReceiptNumber,
        };
        assert!(err.violates(Constraint::ReceiptNumber));
        assert!(!err.violates(Constraint::ReceiptPayment));
        assert!(!StoreError::unavailable("down").violates(Constraint::PaymentMonth));
        assert_eq!(err.to_string(), "unique constraint violated: receipt_issuer_number");
    }
}
