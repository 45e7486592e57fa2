use hourglass_rs::SafeTimeProvider;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{FinancialSettings, ReceiptConfig};
use crate::errors::{Result, SettlementError};
use crate::events::{Event, EventLog};
use crate::lease::Contract;
use crate::payments::{split_settlement, Payment};
use crate::receipts::{Receipt, ReceiptNumber, ReceiptParties};
use crate::store::{Constraint, ContractStore, ReceiptStore};

/// issues exactly one numbered receipt per settled payment
///
/// numbers are claimed with a unique-constraint-with-retry loop keyed on
/// (issuer, competence month); a lost race on the payment itself returns
/// the winner's receipt
pub struct ReceiptIssuer {
    contracts: Arc<dyn ContractStore>,
    receipts: Arc<dyn ReceiptStore>,
    config: ReceiptConfig,
    events: Arc<EventLog>,
}

impl ReceiptIssuer {
    pub fn new(
        contracts: Arc<dyn ContractStore>,
        receipts: Arc<dyn ReceiptStore>,
        config: ReceiptConfig,
        events: Arc<EventLog>,
    ) -> Self {
        Self {
            contracts,
            receipts,
            config,
            events,
        }
    }

    /// receipt for a settled payment, issuing it if none exists yet
    pub fn issue(
        &self,
        payment: &Payment,
        settings: &FinancialSettings,
        time: &SafeTimeProvider,
    ) -> Result<Receipt> {
        if !payment.is_paid() {
            return Err(SettlementError::validation(format!(
                "payment {} is not settled; receipts are issued only for paid payments",
                payment.id
            )));
        }

        if let Some(existing) = self.receipts.receipt_for_payment(payment.id)? {
            debug!(payment_id = %payment.id, number = %existing.number, "receipt already issued");
            return Ok(existing);
        }

        let contract = self
            .contracts
            .contract(payment.contract_id)?
            .ok_or_else(|| SettlementError::not_found("contract", payment.contract_id))?;
        let parties = self.snapshot_parties(&contract)?;
        let split = split_settlement(payment.amount, contract.admin_fee_percentage)?;

        let competence = payment.competence;
        let payment_date = payment.paid_at.unwrap_or_else(|| time.now()).date_naive();
        let method = payment.payment_method.ok_or_else(|| {
            SettlementError::validation(format!("payment {} has no payment method", payment.id))
        })?;

        for attempt in 1..=self.config.max_allocation_attempts {
            let sequence = self.receipts.last_sequence(contract.issuer_id, competence)? + 1;
            let number = ReceiptNumber::with_width(
                settings.receipt_prefix.as_str(),
                competence,
                sequence,
                self.config.sequence_width,
            )?;

            let receipt = Receipt {
                id: Uuid::new_v4(),
                number,
                payment_id: payment.id,
                contract_id: contract.id,
                issuer_id: contract.issuer_id,
                competence,
                payment_date,
                payment_method: method,
                gross_amount: split.gross_amount,
                fee_percentage: split.fee_percentage,
                fee_amount: split.fee_amount,
                net_amount: split.net_amount,
                parties: parties.clone(),
                issued_at: time.now(),
            };

            match self.receipts.insert_receipt(receipt.clone()) {
                Ok(()) => {
                    info!(
                        payment_id = %payment.id,
                        number = %receipt.number,
                        gross = %receipt.gross_amount,
                        fee = %receipt.fee_amount,
                        net = %receipt.net_amount,
                        "receipt issued"
                    );
                    self.events.emit(Event::ReceiptIssued {
                        receipt_id: receipt.id,
                        payment_id: payment.id,
                        number: receipt.number.to_string(),
                        gross_amount: receipt.gross_amount,
                        fee_amount: receipt.fee_amount,
                        net_amount: receipt.net_amount,
                    });
                    return Ok(receipt);
                }
                Err(e) if e.violates(Constraint::ReceiptPayment) => {
                    debug!(payment_id = %payment.id, "receipt issued concurrently, returning it");
                    return self.receipts.receipt_for_payment(payment.id)?.ok_or_else(|| {
                        SettlementError::Persistence {
                            message: format!(
                                "receipt for payment {} conflicted but cannot be read back",
                                payment.id
                            ),
                        }
                    });
                }
                Err(e) if e.violates(Constraint::ReceiptNumber) => {
                    warn!(
                        payment_id = %payment.id,
                        sequence,
                        attempt,
                        "receipt number taken, retrying"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(SettlementError::Persistence {
            message: format!(
                "no free receipt number for issuer {} in {} after {} attempts",
                contract.issuer_id, competence, self.config.max_allocation_attempts
            ),
        })
    }

    fn snapshot_parties(&self, contract: &Contract) -> Result<ReceiptParties> {
        let property = self
            .contracts
            .property(contract.property_id)?
            .ok_or_else(|| SettlementError::not_found("property", contract.property_id))?;
        let owner = self
            .contracts
            .owner(property.owner_id)?
            .ok_or_else(|| SettlementError::not_found("owner", property.owner_id))?;
        let tenant = self
            .contracts
            .tenant(contract.tenant_id)?
            .ok_or_else(|| SettlementError::not_found("tenant", contract.tenant_id))?;

        Ok(ReceiptParties::snapshot(&owner, &tenant, &property))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Money;
    use crate::lease::{Owner, Property, Tenant};
    use crate::payments::SettlementUpdate;
    use crate::receipts::ReceiptFilter;
    use crate::store::{InMemoryStore, PaymentStore, StoreResult};
    use crate::types::{CompetenceMonth, IssuerId, PaymentId, PaymentMethod};
    use chrono::{NaiveDate, TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use rust_decimal_macros::dec;

    struct Fixture {
        store: Arc<InMemoryStore>,
        contract: Contract,
        owner: Owner,
        events: Arc<EventLog>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let owner = Owner {
            id: Uuid::new_v4(),
            name: "Ana Souza".to_string(),
            document: "123.456.789-00".to_string(),
        };
        let tenant = Tenant {
            id: Uuid::new_v4(),
            name: "Bruno Lima".to_string(),
            document: "987.654.321-00".to_string(),
        };
        let property = Property {
            id: Uuid::new_v4(),
            owner_id: owner.id,
            address: "Rua das Flores, 100".to_string(),
        };
        let contract = Contract::new(
            Uuid::new_v4(),
            property.id,
            tenant.id,
            Money::from_major(2_000),
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 10).unwrap(),
            dec!(10),
        );
        store.put_owner(owner.clone());
        store.put_tenant(tenant);
        store.put_property(property);
        store.put_contract(contract.clone());

        Fixture {
            store,
            contract,
            owner,
            events: Arc::new(EventLog::new()),
        }
    }

    fn issuer(f: &Fixture, receipts: Arc<dyn ReceiptStore>) -> ReceiptIssuer {
        ReceiptIssuer::new(f.store.clone(), receipts, ReceiptConfig::default(), f.events.clone())
    }

    fn paid_payment(f: &Fixture, month: u32) -> Payment {
        let due = NaiveDate::from_ymd_opt(2024, month, 10).unwrap();
        let payment = Payment::scheduled(f.contract.id, due, Money::from_major(2_000), Utc::now());
        f.store.insert_payment(payment.clone()).unwrap();
        let update = SettlementUpdate {
            paid_at: Utc.with_ymd_and_hms(2024, month + 1, 2, 12, 0, 0).unwrap(),
            method: PaymentMethod::Pix,
            days_late: 0,
            penalty: Money::ZERO,
            interest: Money::ZERO,
            final_amount: Money::from_major(2_000),
            notes: "paid".to_string(),
            proof_refs: Vec::new(),
        };
        match f.store.settle_if_pending(payment.id, &update).unwrap() {
            crate::store::ConditionalUpdate::Applied(p) => p,
            other => panic!("unexpected {:?}", other),
        }
    }

    fn clock() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 4, 2, 12, 0, 0).unwrap()))
    }

    #[test]
    fn test_issue_uses_due_month_and_snapshots_parties() {
        let f = fixture();
        let issuer = issuer(&f, f.store.clone());
        let payment = paid_payment(&f, 3);

        let receipt = issuer.issue(&payment, &FinancialSettings::standard(), &clock()).unwrap();

        assert_eq!(receipt.competence, CompetenceMonth::new(2024, 3).unwrap());
        assert_eq!(receipt.competence.label(), "March 2024");
        assert_eq!(receipt.number.to_string(), "REC-202403-0001");
        assert_eq!(receipt.payment_date, NaiveDate::from_ymd_opt(2024, 4, 2).unwrap());
        assert_eq!(receipt.fee_amount, Money::from_major(200));
        assert_eq!(receipt.net_amount, Money::from_major(1_800));
        assert_eq!(receipt.parties.owner_name, "Ana Souza");

        // editing the owner later leaves the receipt alone
        let mut renamed = f.owner.clone();
        renamed.name = "Ana Souza Pereira".to_string();
        f.store.put_owner(renamed);
        let stored = f.store.receipts(&ReceiptFilter::all()).unwrap();
        assert_eq!(stored[0].parties.owner_name, "Ana Souza");
    }

    #[test]
    fn test_issue_is_idempotent() {
        let f = fixture();
        let issuer = issuer(&f, f.store.clone());
        let payment = paid_payment(&f, 3);
        let settings = FinancialSettings::standard();

        let first = issuer.issue(&payment, &settings, &clock()).unwrap();
        let second = issuer.issue(&payment, &settings, &clock()).unwrap();

        assert_eq!(first, second);
        assert_eq!(f.store.receipt_count(), 1);
        assert_eq!(f.events.len(), 1);
    }

    #[test]
    fn test_sequential_numbers_have_no_gaps() {
        let f = fixture();
        let issuer = issuer(&f, f.store.clone());
        let settings = FinancialSettings::standard();
        let time = clock();

        // three contracts of the same issuer, all due in March
        let mut numbers = Vec::new();
        for _ in 0..3 {
            let mut contract = f.contract.clone();
            contract.id = Uuid::new_v4();
            f.store.put_contract(contract.clone());
            let g = Fixture {
                store: f.store.clone(),
                contract,
                owner: f.owner.clone(),
                events: f.events.clone(),
            };
            let payment = paid_payment(&g, 3);
            numbers.push(issuer.issue(&payment, &settings, &time).unwrap().number.sequence());
        }

        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_pending_payment_rejected() {
        let f = fixture();
        let issuer = issuer(&f, f.store.clone());
        let due = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let payment = Payment::scheduled(f.contract.id, due, Money::from_major(2_000), Utc::now());

        let err = issuer.issue(&payment, &FinancialSettings::standard(), &clock()).unwrap_err();
        assert!(err.is_validation());
    }

    /// receipt store whose sequence reads lag behind the real one
    struct StaleSequences {
        inner: Arc<InMemoryStore>,
        lag: u32,
    }

    impl ReceiptStore for StaleSequences {
        fn receipt_for_payment(&self, payment_id: PaymentId) -> StoreResult<Option<Receipt>> {
            self.inner.receipt_for_payment(payment_id)
        }

        fn last_sequence(&self, issuer_id: IssuerId, competence: CompetenceMonth) -> StoreResult<u32> {
            let real = self.inner.last_sequence(issuer_id, competence)?;
            Ok(real.saturating_sub(self.lag))
        }

        fn insert_receipt(&self, receipt: Receipt) -> StoreResult<()> {
            self.inner.insert_receipt(receipt)
        }

        fn receipts(&self, filter: &ReceiptFilter) -> StoreResult<Vec<Receipt>> {
            self.inner.receipts(filter)
        }
    }

    #[test]
    fn test_taken_number_exhausts_attempts() {
        let f = fixture();
        let first = paid_payment(&f, 3);
        issuer(&f, f.store.clone())
            .issue(&first, &FinancialSettings::standard(), &clock())
            .unwrap();

        // the stale reader keeps proposing sequence 1
        let stale = Arc::new(StaleSequences {
            inner: f.store.clone(),
            lag: 1,
        });
        let mut contract = f.contract.clone();
        contract.id = Uuid::new_v4();
        f.store.put_contract(contract.clone());
        let g = Fixture {
            store: f.store.clone(),
            contract,
            owner: f.owner.clone(),
            events: f.events.clone(),
        };
        let second = paid_payment(&g, 3);

        let err = issuer(&f, stale)
            .issue(&second, &FinancialSettings::standard(), &clock())
            .unwrap_err();

        assert!(matches!(err, SettlementError::Persistence { .. }));
        assert_eq!(f.store.receipt_count(), 1);
    }
}
