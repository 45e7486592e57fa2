pub mod http;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::decimal::Money;
use crate::errors::{Result, SettlementError};
use crate::events::{Event, EventLog};
use crate::payments::Payment;
use crate::store::{ConditionalUpdate, PaymentStore};
use crate::types::{ContractId, PaymentId};

pub use http::HttpProviderGateway;

/// charge creation request sent to the payment provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoletoRequest {
    pub contract_id: ContractId,
    pub payment_id: PaymentId,
    pub amount: Money,
    pub due_date: NaiveDate,
    pub description: String,
}

/// boleto/PIX artifact returned by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoletoArtifact {
    pub boleto_url: String,
    pub pix_code: Option<String>,
    pub provider_payment_id: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("provider did not answer in time")]
    Timeout,

    #[error("provider request failed: {0}")]
    Transport(String),

    #[error("provider rejected the charge ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("provider returned an unreadable response: {0}")]
    InvalidResponse(String),
}

/// external boleto/PIX provider
pub trait ProviderGateway: Send + Sync {
    fn create_boleto(&self, request: &BoletoRequest) -> std::result::Result<BoletoArtifact, GatewayError>;
}

/// creates provider charges for pending payments
///
/// the provider call happens outside any store operation; only a successful
/// artifact is written back, and only while the payment is still pending
pub struct ChargeService {
    payments: Arc<dyn PaymentStore>,
    gateway: Arc<dyn ProviderGateway>,
    events: Arc<EventLog>,
}

impl ChargeService {
    pub fn new(
        payments: Arc<dyn PaymentStore>,
        gateway: Arc<dyn ProviderGateway>,
        events: Arc<EventLog>,
    ) -> Self {
        Self {
            payments,
            gateway,
            events,
        }
    }

    pub fn create_charge(&self, payment_id: PaymentId) -> Result<Payment> {
        let payment = self
            .payments
            .payment(payment_id)?
            .ok_or_else(|| SettlementError::not_found("payment", payment_id))?;

        if payment.is_paid() {
            return Err(payment.already_settled());
        }
        if payment.charge.is_some() {
            return Ok(payment);
        }

        let request = BoletoRequest {
            contract_id: payment.contract_id,
            payment_id: payment.id,
            amount: payment.amount,
            due_date: payment.due_date,
            description: format!("Rent {}", payment.competence),
        };

        let artifact = match self.gateway.create_boleto(&request) {
            Ok(artifact) => artifact,
            Err(e) => {
                error!(payment_id = %payment_id, error = %e, "charge creation failed");
                self.events.emit(Event::ChargeFailed {
                    payment_id,
                    reason: e.to_string(),
                });
                return Err(e.into());
            }
        };

        match self.payments.attach_charge_if_pending(payment_id, &artifact)? {
            ConditionalUpdate::Applied(updated) => {
                info!(
                    payment_id = %payment_id,
                    provider_payment_id = %artifact.provider_payment_id,
                    "charge created"
                );
                self.events.emit(Event::ChargeCreated {
                    payment_id,
                    provider_payment_id: artifact.provider_payment_id,
                });
                Ok(updated)
            }
            ConditionalUpdate::Rejected(current) if current.is_paid() => {
                warn!(payment_id = %payment_id, "payment settled while the charge was being created");
                Err(current.already_settled())
            }
            // another caller attached its charge first
            ConditionalUpdate::Rejected(current) => Ok(current),
            ConditionalUpdate::Missing => Err(SettlementError::not_found("payment", payment_id)),
        }
    }
}
