use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::FinancialSettings;
use crate::errors::{Result, SettlementError};
use crate::events::{Event, EventLog};
use crate::interest::{LateChargeCalculator, LateCharges};
use crate::payments::{split_settlement, Payment, SettleRequest, SettlementUpdate};
use crate::receipts::{Receipt, ReceiptIssuer};
use crate::store::{ConditionalUpdate, ContractStore, PaymentStore};
use crate::types::PaymentMethod;

/// result of a settlement
///
/// a missing receipt never undoes the settlement; `receipt_error` carries the
/// reason and the receipt can be issued again later
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettlementOutcome {
    pub payment: Payment,
    pub receipt: Option<Receipt>,
    pub receipt_error: Option<String>,
}

impl SettlementOutcome {
    pub fn has_receipt(&self) -> bool {
        self.receipt.is_some()
    }
}

/// moves payments from pending to paid, then issues their receipt
pub struct SettlementService {
    contracts: Arc<dyn ContractStore>,
    payments: Arc<dyn PaymentStore>,
    issuer: Arc<ReceiptIssuer>,
    events: Arc<EventLog>,
}

impl SettlementService {
    pub fn new(
        contracts: Arc<dyn ContractStore>,
        payments: Arc<dyn PaymentStore>,
        issuer: Arc<ReceiptIssuer>,
        events: Arc<EventLog>,
    ) -> Self {
        Self {
            contracts,
            payments,
            issuer,
            events,
        }
    }

    /// settle a pending payment at the provider's current time
    ///
    /// a payment that is already paid fails with `AlreadySettled`, including
    /// when a concurrent call wins between the read and the write
    pub fn settle(
        &self,
        request: &SettleRequest,
        settings: &FinancialSettings,
        time: &SafeTimeProvider,
    ) -> Result<SettlementOutcome> {
        settings.validate()?;

        let payment = self
            .payments
            .payment(request.payment_id)?
            .ok_or_else(|| SettlementError::not_found("payment", request.payment_id))?;
        if payment.is_paid() {
            return Err(payment.already_settled());
        }
        let contract = self
            .contracts
            .contract(payment.contract_id)?
            .ok_or_else(|| SettlementError::not_found("contract", payment.contract_id))?;

        let paid_at = time.now();
        let paid_on = paid_at.date_naive();
        let charges = LateChargeCalculator::new(settings.clone()).calculate(
            payment.amount,
            payment.due_date,
            paid_on,
            request.include_interest,
        )?;
        // the fee must split cleanly before the payment becomes paid
        split_settlement(charges.final_amount, contract.admin_fee_percentage)?;

        let update = SettlementUpdate {
            paid_at,
            method: request.method,
            days_late: charges.days_late,
            penalty: charges.penalty,
            interest: charges.interest,
            final_amount: charges.final_amount,
            notes: settlement_notes(request.method, paid_on, &charges, request.include_interest),
            proof_refs: request.proof_refs.clone(),
        };

        let settled = match self.payments.settle_if_pending(payment.id, &update)? {
            ConditionalUpdate::Applied(settled) => settled,
            ConditionalUpdate::Rejected(current) => {
                warn!(payment_id = %payment.id, "payment settled concurrently");
                return Err(current.already_settled());
            }
            ConditionalUpdate::Missing => {
                return Err(SettlementError::not_found("payment", payment.id));
            }
        };

        info!(
            payment_id = %settled.id,
            contract_id = %settled.contract_id,
            method = %request.method,
            days_late = charges.days_late,
            final_amount = %charges.final_amount,
            "payment settled"
        );
        self.events.emit(Event::PaymentSettled {
            payment_id: settled.id,
            contract_id: settled.contract_id,
            method: request.method,
            days_late: charges.days_late,
            penalty: charges.penalty,
            interest: charges.interest,
            final_amount: charges.final_amount,
            timestamp: paid_at,
        });

        let (receipt, receipt_error) = match self.issuer.issue(&settled, settings, time) {
            Ok(receipt) => (Some(receipt), None),
            Err(e) => {
                error!(payment_id = %settled.id, error = %e, "receipt issuance failed; payment stays settled");
                self.events.emit(Event::ReceiptIssuanceFailed {
                    payment_id: settled.id,
                    reason: e.to_string(),
                });
                (None, Some(e.to_string()))
            }
        };

        Ok(SettlementOutcome {
            payment: settled,
            receipt,
            receipt_error,
        })
    }
}

/// human-readable summary stored on the payment
fn settlement_notes(
    method: PaymentMethod,
    paid_on: NaiveDate,
    charges: &LateCharges,
    include_interest: bool,
) -> String {
    if !charges.is_late() {
        return format!("Paid via {} on {}, on time; total {}", method, paid_on, charges.final_amount);
    }

    let interest = if include_interest {
        format!("interest {}", charges.interest)
    } else {
        "interest waived".to_string()
    };
    format!(
        "Paid via {} on {}; {} day(s) late; penalty {}; {}; total {}",
        method, paid_on, charges.days_late, charges.penalty, interest, charges.final_amount
    )
}
