use hourglass_rs::SafeTimeProvider;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::{EngineConfig, FinancialSettings};
use crate::errors::{Result, SettlementError};
use crate::events::{Event, EventLog};
use crate::gateway::{ChargeService, HttpProviderGateway, ProviderGateway};
use crate::lease::Contract;
use crate::payments::{
    Payment, ScheduleGenerator, ScheduleRequest, SettleRequest, SettlementOutcome, SettlementService,
};
use crate::receipts::{Receipt, ReceiptFilter, ReceiptIssuer};
use crate::store::{ContractStore, PaymentStore, ReceiptStore, SettingsStore};
use crate::types::{ContractId, ContractStatus, IssuerId, PaymentId, PaymentStatus};

/// contract the monthly batch could not schedule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailure {
    pub contract_id: ContractId,
    pub reason: String,
}

/// result of a monthly batch run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub contracts_processed: u32,
    /// contracts that are not active
    pub contracts_skipped: u32,
    pub payments_created: u32,
    pub failures: Vec<BatchFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReissueFailure {
    pub payment_id: PaymentId,
    pub reason: String,
}

/// result of re-issuing receipts for paid payments that lack one
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReissueReport {
    pub issued: Vec<Receipt>,
    pub failures: Vec<ReissueFailure>,
}

/// entry point for every schedule, settlement, receipt and charge operation
pub struct SettlementEngine {
    contracts: Arc<dyn ContractStore>,
    payments: Arc<dyn PaymentStore>,
    receipts: Arc<dyn ReceiptStore>,
    settings: Arc<dyn SettingsStore>,
    config: EngineConfig,
    events: Arc<EventLog>,
    schedule: ScheduleGenerator,
    issuer: Arc<ReceiptIssuer>,
    settlement: SettlementService,
    charges: Option<ChargeService>,
}

impl SettlementEngine {
    /// engine over a single backend implementing every store
    pub fn new<S>(store: Arc<S>, config: EngineConfig) -> Self
    where
        S: ContractStore + PaymentStore + ReceiptStore + SettingsStore + 'static,
    {
        Self::from_parts(store.clone(), store.clone(), store.clone(), store, config)
    }

    pub fn from_parts(
        contracts: Arc<dyn ContractStore>,
        payments: Arc<dyn PaymentStore>,
        receipts: Arc<dyn ReceiptStore>,
        settings: Arc<dyn SettingsStore>,
        config: EngineConfig,
    ) -> Self {
        let events = Arc::new(EventLog::new());
        let schedule = ScheduleGenerator::new(payments.clone(), config.schedule.clone(), events.clone());
        let issuer = Arc::new(ReceiptIssuer::new(
            contracts.clone(),
            receipts.clone(),
            config.receipts.clone(),
            events.clone(),
        ));
        let settlement =
            SettlementService::new(contracts.clone(), payments.clone(), issuer.clone(), events.clone());

        Self {
            contracts,
            payments,
            receipts,
            settings,
            config,
            events,
            schedule,
            issuer,
            settlement,
            charges: None,
        }
    }

    /// route charge creation through the given provider
    pub fn with_gateway(mut self, gateway: Arc<dyn ProviderGateway>) -> Self {
        self.charges = Some(ChargeService::new(self.payments.clone(), gateway, self.events.clone()));
        self
    }

    /// connect the HTTP provider from config, if one is configured
    pub fn with_configured_gateway(self) -> Result<Self> {
        match self.config.gateway.clone() {
            Some(gateway) => {
                let http = HttpProviderGateway::new(&gateway)?;
                info!(base_url = %gateway.base_url, "payment gateway configured");
                Ok(self.with_gateway(Arc::new(http)))
            }
            None => Ok(self),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// settings for an issuer, defaults when none are stored
    pub fn settings_for(&self, issuer_id: IssuerId) -> Result<FinancialSettings> {
        let settings = self.settings.financial_settings(issuer_id)?.unwrap_or_default();
        settings.validate()?;
        Ok(settings)
    }

    /// create the missing payments of a contract
    pub fn generate_schedule(
        &self,
        contract_id: ContractId,
        request: ScheduleRequest,
        time: &SafeTimeProvider,
    ) -> Result<Vec<Payment>> {
        let contract = self.load_contract(contract_id)?;
        self.schedule.generate(&contract, &request, time)
    }

    /// mark a payment paid and issue its receipt
    pub fn settle_payment(&self, request: &SettleRequest, time: &SafeTimeProvider) -> Result<SettlementOutcome> {
        let payment = self.load_payment(request.payment_id)?;
        if payment.is_paid() {
            return Err(payment.already_settled());
        }
        let contract = self.load_contract(payment.contract_id)?;
        let settings = self.settings_for(contract.issuer_id)?;

        self.settlement.settle(request, &settings, time)
    }

    /// receipt for a paid payment, issuing it when missing
    pub fn issue_receipt(&self, payment_id: PaymentId, time: &SafeTimeProvider) -> Result<Receipt> {
        let payment = self.load_payment(payment_id)?;
        let contract = self.load_contract(payment.contract_id)?;
        let settings = self.settings_for(contract.issuer_id)?;

        self.issuer.issue(&payment, &settings, time)
    }

    /// issue receipts for every paid payment that has none
    pub fn reissue_missing_receipts(&self, time: &SafeTimeProvider) -> Result<ReissueReport> {
        let mut report = ReissueReport::default();

        for payment in self.payments.payments_by_status(PaymentStatus::Paid)? {
            if self.receipts.receipt_for_payment(payment.id)?.is_some() {
                continue;
            }
            match self.issue_receipt(payment.id, time) {
                Ok(receipt) => report.issued.push(receipt),
                Err(e) => {
                    error!(payment_id = %payment.id, error = %e, "receipt re-issue failed");
                    self.events.emit(Event::ReceiptIssuanceFailed {
                        payment_id: payment.id,
                        reason: e.to_string(),
                    });
                    report.failures.push(ReissueFailure {
                        payment_id: payment.id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            issued = report.issued.len(),
            failures = report.failures.len(),
            "missing receipts re-issued"
        );
        Ok(report)
    }

    pub fn list_receipts(&self, filter: &ReceiptFilter) -> Result<Vec<Receipt>> {
        if let Some(month) = filter.month {
            if !(1..=12).contains(&month) {
                return Err(SettlementError::validation(format!(
                    "month filter must be between 1 and 12, got {}",
                    month
                )));
            }
        }
        Ok(self.receipts.receipts(filter)?)
    }

    /// pending payments whose due date has passed
    pub fn list_overdue(&self, time: &SafeTimeProvider) -> Result<Vec<Payment>> {
        let today = time.now().date_naive();
        Ok(self
            .payments
            .payments_by_status(PaymentStatus::Pending)?
            .into_iter()
            .filter(|p| p.is_overdue(today))
            .collect())
    }

    /// schedule the coming months for every active contract
    ///
    /// a contract that fails is recorded and the run continues
    pub fn run_monthly_batch(&self, months_ahead: u32, time: &SafeTimeProvider) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        let request = ScheduleRequest::months_ahead(months_ahead);

        for contract in self.contracts.contracts()? {
            if contract.status != ContractStatus::Active {
                report.contracts_skipped += 1;
                continue;
            }
            match self.schedule.generate(&contract, &request, time) {
                Ok(created) => {
                    report.contracts_processed += 1;
                    report.payments_created += created.len() as u32;
                }
                Err(e) => {
                    warn!(contract_id = %contract.id, error = %e, "contract skipped by monthly batch");
                    report.failures.push(BatchFailure {
                        contract_id: contract.id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            processed = report.contracts_processed,
            skipped = report.contracts_skipped,
            created = report.payments_created,
            failures = report.failures.len(),
            "monthly batch completed"
        );
        Ok(report)
    }

    /// boleto/PIX charge for a pending payment
    pub fn create_charge(&self, payment_id: PaymentId) -> Result<Payment> {
        let charges = self
            .charges
            .as_ref()
            .ok_or_else(|| SettlementError::validation("no payment gateway configured"))?;
        charges.create_charge(payment_id)
    }

    fn load_contract(&self, id: ContractId) -> Result<Contract> {
        self.contracts
            .contract(id)?
            .ok_or_else(|| SettlementError::not_found("contract", id))
    }

    fn load_payment(&self, id: PaymentId) -> Result<Payment> {
        self.payments
            .payment(id)?
            .ok_or_else(|| SettlementError::not_found("payment", id))
    }
}
