pub mod schedule;
pub mod settlement;
pub mod split;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::SettlementError;
use crate::gateway::BoletoArtifact;
use crate::types::{CompetenceMonth, ContractId, PaymentId, PaymentMethod, PaymentStatus};

pub use schedule::{ScheduleGenerator, ScheduleRequest, ScheduleWindow};
pub use settlement::{SettlementOutcome, SettlementService};
pub use split::{split_settlement, SettlementSplit};

/// one scheduled rent obligation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub contract_id: ContractId,
    pub competence: CompetenceMonth,
    pub due_date: NaiveDate,
    /// rent until settled, then the final amount including late charges
    pub amount: Money,
    pub status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_method: Option<PaymentMethod>,
    pub days_late: u32,
    pub penalty: Money,
    pub interest: Money,
    pub notes: Option<String>,
    /// references to uploaded proofs of payment
    pub proof_refs: Vec<String>,
    /// boleto/PIX artifact, when one was created
    pub charge: Option<BoletoArtifact>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// new pending payment; competence follows the due date
    pub fn scheduled(
        contract_id: ContractId,
        due_date: NaiveDate,
        amount: Money,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            contract_id,
            competence: CompetenceMonth::from_date(due_date),
            due_date,
            amount,
            status: PaymentStatus::Pending,
            paid_at: None,
            payment_method: None,
            days_late: 0,
            penalty: Money::ZERO,
            interest: Money::ZERO,
            notes: None,
            proof_refs: Vec::new(),
            charge: None,
            created_at,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.status == PaymentStatus::Paid
    }

    /// pending and past its due date
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == PaymentStatus::Pending && self.due_date < today
    }

    /// amount owed before late charges
    pub fn original_amount(&self) -> Money {
        self.amount - self.penalty - self.interest
    }

    /// error returned to anyone trying to settle this payment again
    pub(crate) fn already_settled(&self) -> SettlementError {
        SettlementError::AlreadySettled {
            payment_id: self.id,
            paid_at: self.paid_at.unwrap_or(self.created_at),
        }
    }

    /// apply a settlement; callers must have checked the payment is pending
    pub(crate) fn apply_settlement(&mut self, update: &SettlementUpdate) {
        self.status = PaymentStatus::Paid;
        self.paid_at = Some(update.paid_at);
        self.payment_method = Some(update.method);
        self.days_late = update.days_late;
        self.penalty = update.penalty;
        self.interest = update.interest;
        self.amount = update.final_amount;
        self.notes = Some(update.notes.clone());
        self.proof_refs = update.proof_refs.clone();
    }
}

/// the single write applied when a payment moves to paid
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementUpdate {
    pub paid_at: DateTime<Utc>,
    pub method: PaymentMethod,
    pub days_late: u32,
    pub penalty: Money,
    pub interest: Money,
    pub final_amount: Money,
    pub notes: String,
    pub proof_refs: Vec<String>,
}

/// request to settle a payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettleRequest {
    pub payment_id: PaymentId,
    pub method: PaymentMethod,
    pub proof_refs: Vec<String>,
    /// charge daily interest; the flat penalty applies regardless
    pub include_interest: bool,
}

impl SettleRequest {
    pub fn new(payment_id: PaymentId, method: PaymentMethod) -> Self {
        Self {
            payment_id,
            method,
            proof_refs: Vec::new(),
            include_interest: true,
        }
    }

    pub fn with_proof(mut self, proof_ref: impl Into<String>) -> Self {
        self.proof_refs.push(proof_ref.into());
        self
    }

    pub fn waive_interest(mut self) -> Self {
        self.include_interest = false;
        self
    }
}
