use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::gateway::GatewayError;
use crate::store::StoreError;
use crate::types::{CompetenceMonth, ContractId, PaymentId};

#[derive(Error, Debug)]
pub enum SettlementError {
    #[error("validation failed: {message}")]
    Validation {
        message: String,
    },

    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: Uuid,
    },

    #[error("payment {payment_id} already settled at {paid_at}")]
    AlreadySettled {
        payment_id: PaymentId,
        paid_at: DateTime<Utc>,
    },

    #[error("payment already scheduled for contract {contract_id} in {competence}")]
    DuplicateScheduleEntry {
        contract_id: ContractId,
        competence: CompetenceMonth,
    },

    #[error("administration fee percentage out of range [0, 100]: {percentage}")]
    InvalidFeePercentage {
        percentage: Decimal,
    },

    #[error("payment gateway failure: {0}")]
    Gateway(#[from] GatewayError),

    #[error("persistence failure: {message}")]
    Persistence {
        message: String,
    },
}

impl SettlementError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        SettlementError::Validation {
            message: message.into(),
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: Uuid) -> Self {
        SettlementError::NotFound { entity, id }
    }

    pub fn is_already_settled(&self) -> bool {
        matches!(self, SettlementError::AlreadySettled { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SettlementError::NotFound { .. })
    }

    /// bad input, rejected before any mutation
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SettlementError::Validation { .. } | SettlementError::InvalidFeePercentage { .. }
        )
    }
}

impl From<StoreError> for SettlementError {
    fn from(err: StoreError) -> Self {
        SettlementError::Persistence {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SettlementError>;
