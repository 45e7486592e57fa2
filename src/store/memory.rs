use parking_lot::Mutex;
use std::collections::HashMap;

use crate::config::FinancialSettings;
use crate::gateway::BoletoArtifact;
use crate::lease::{Contract, Owner, Property, Tenant};
use crate::payments::{Payment, SettlementUpdate};
use crate::receipts::{Receipt, ReceiptFilter};
use crate::store::{
    ConditionalUpdate, Constraint, ContractStore, PaymentStore, ReceiptStore, SettingsStore,
    StoreError, StoreResult,
};
use crate::types::{
    CompetenceMonth, ContractId, IssuerId, OwnerId, PaymentId, PaymentStatus, PropertyId,
    ReceiptId, TenantId,
};

#[derive(Debug, Default)]
struct Tables {
    contracts: HashMap<ContractId, Contract>,
    properties: HashMap<PropertyId, Property>,
    owners: HashMap<OwnerId, Owner>,
    tenants: HashMap<TenantId, Tenant>,
    settings: HashMap<IssuerId, FinancialSettings>,

    payments: HashMap<PaymentId, Payment>,
    payment_months: HashMap<(ContractId, CompetenceMonth), PaymentId>,

    receipts: HashMap<ReceiptId, Receipt>,
    receipt_by_payment: HashMap<PaymentId, ReceiptId>,
    receipt_numbers: HashMap<(IssuerId, String), ReceiptId>,
    sequences: HashMap<(IssuerId, CompetenceMonth), u32>,
}

/// in-process store behind a single lock
///
/// every check-and-write runs under the lock, so unique constraints and
/// conditional updates behave like their database counterparts
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_contract(&self, contract: Contract) {
        self.tables.lock().contracts.insert(contract.id, contract);
    }

    pub fn put_property(&self, property: Property) {
        self.tables.lock().properties.insert(property.id, property);
    }

    pub fn put_owner(&self, owner: Owner) {
        self.tables.lock().owners.insert(owner.id, owner);
    }

    pub fn put_tenant(&self, tenant: Tenant) {
        self.tables.lock().tenants.insert(tenant.id, tenant);
    }

    pub fn put_settings(&self, issuer_id: IssuerId, settings: FinancialSettings) {
        self.tables.lock().settings.insert(issuer_id, settings);
    }

    pub fn payment_count(&self) -> usize {
        self.tables.lock().payments.len()
    }

    pub fn receipt_count(&self) -> usize {
        self.tables.lock().receipts.len()
    }
}

impl ContractStore for InMemoryStore {
    fn contract(&self, id: ContractId) -> StoreResult<Option<Contract>> {
        Ok(self.tables.lock().contracts.get(&id).cloned())
    }

    fn contracts(&self) -> StoreResult<Vec<Contract>> {
        let mut contracts: Vec<Contract> = self.tables.lock().contracts.values().cloned().collect();
        contracts.sort_by_key(|c| (c.start_date, c.id));
        Ok(contracts)
    }

    fn property(&self, id: PropertyId) -> StoreResult<Option<Property>> {
        Ok(self.tables.lock().properties.get(&id).cloned())
    }

    fn owner(&self, id: OwnerId) -> StoreResult<Option<Owner>> {
        Ok(self.tables.lock().owners.get(&id).cloned())
    }

    fn tenant(&self, id: TenantId) -> StoreResult<Option<Tenant>> {
        Ok(self.tables.lock().tenants.get(&id).cloned())
    }
}

impl PaymentStore for InMemoryStore {
    fn payment(&self, id: PaymentId) -> StoreResult<Option<Payment>> {
        Ok(self.tables.lock().payments.get(&id).cloned())
    }

    fn payment_for_month(
        &self,
        contract_id: ContractId,
        competence: CompetenceMonth,
    ) -> StoreResult<Option<Payment>> {
        let tables = self.tables.lock();
        Ok(tables
            .payment_months
            .get(&(contract_id, competence))
            .and_then(|id| tables.payments.get(id))
            .cloned())
    }

    fn payments_for_contract(&self, contract_id: ContractId) -> StoreResult<Vec<Payment>> {
        let mut payments: Vec<Payment> = self
            .tables
            .lock()
            .payments
            .values()
            .filter(|p| p.contract_id == contract_id)
            .cloned()
            .collect();
        payments.sort_by_key(|p| p.due_date);
        Ok(payments)
    }

    fn payments_by_status(&self, status: PaymentStatus) -> StoreResult<Vec<Payment>> {
        let mut payments: Vec<Payment> = self
            .tables
            .lock()
            .payments
            .values()
            .filter(|p| p.status == status)
            .cloned()
            .collect();
        payments.sort_by_key(|p| (p.due_date, p.contract_id));
        Ok(payments)
    }

    fn insert_payment(&self, payment: Payment) -> StoreResult<()> {
        let mut tables = self.tables.lock();
        let key = (payment.contract_id, payment.competence);
        if tables.payment_months.contains_key(&key) {
            return Err(StoreError::UniqueViolation {
                constraint: Constraint::PaymentMonth,
            });
        }
        tables.payment_months.insert(key, payment.id);
        tables.payments.insert(payment.id, payment);
        Ok(())
    }

    fn settle_if_pending(
        &self,
        id: PaymentId,
        update: &SettlementUpdate,
    ) -> StoreResult<ConditionalUpdate> {
        let mut tables = self.tables.lock();
        let Some(payment) = tables.payments.get_mut(&id) else {
            return Ok(ConditionalUpdate::Missing);
        };
        if payment.status != PaymentStatus::Pending {
            return Ok(ConditionalUpdate::Rejected(payment.clone()));
        }
        payment.apply_settlement(update);
        Ok(ConditionalUpdate::Applied(payment.clone()))
    }

    fn attach_charge_if_pending(
        &self,
        id: PaymentId,
        charge: &BoletoArtifact,
    ) -> StoreResult<ConditionalUpdate> {
        let mut tables = self.tables.lock();
        let Some(payment) = tables.payments.get_mut(&id) else {
            return Ok(ConditionalUpdate::Missing);
        };
        if payment.status != PaymentStatus::Pending || payment.charge.is_some() {
            return Ok(ConditionalUpdate::Rejected(payment.clone()));
        }
        payment.charge = Some(charge.clone());
        Ok(ConditionalUpdate::Applied(payment.clone()))
    }
}

impl ReceiptStore for InMemoryStore {
    fn receipt_for_payment(&self, payment_id: PaymentId) -> StoreResult<Option<Receipt>> {
        let tables = self.tables.lock();
        Ok(tables
            .receipt_by_payment
            .get(&payment_id)
            .and_then(|id| tables.receipts.get(id))
            .cloned())
    }

    fn last_sequence(&self, issuer_id: IssuerId, competence: CompetenceMonth) -> StoreResult<u32> {
        Ok(self
            .tables
            .lock()
            .sequences
            .get(&(issuer_id, competence))
            .copied()
            .unwrap_or(0))
    }

    fn insert_receipt(&self, receipt: Receipt) -> StoreResult<()> {
        let mut tables = self.tables.lock();
        if tables.receipt_by_payment.contains_key(&receipt.payment_id) {
            return Err(StoreError::UniqueViolation {
                constraint: Constraint::ReceiptPayment,
            });
        }
        let number_key = (receipt.issuer_id, receipt.number.to_string());
        if tables.receipt_numbers.contains_key(&number_key) {
            return Err(StoreError::UniqueViolation {
                constraint: Constraint::ReceiptNumber,
            });
        }

        let sequence = tables
            .sequences
            .entry((receipt.issuer_id, receipt.number.competence()))
            .or_insert(0);
        *sequence = (*sequence).max(receipt.number.sequence());

        tables.receipt_numbers.insert(number_key, receipt.id);
        tables.receipt_by_payment.insert(receipt.payment_id, receipt.id);
        tables.receipts.insert(receipt.id, receipt);
        Ok(())
    }

    fn receipts(&self, filter: &ReceiptFilter) -> StoreResult<Vec<Receipt>> {
        let mut receipts: Vec<Receipt> = self
            .tables
            .lock()
            .receipts
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        receipts.sort_by(|a, b| {
            (a.competence, a.number.sequence(), a.issued_at)
                .cmp(&(b.competence, b.number.sequence(), b.issued_at))
        });
        Ok(receipts)
    }
}

impl SettingsStore for InMemoryStore {
    fn financial_settings(&self, issuer_id: IssuerId) -> StoreResult<Option<FinancialSettings>> {
        Ok(self.tables.lock().settings.get(&issuer_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Money;
    use crate::receipts::tests::sample_receipt;
    use crate::receipts::ReceiptNumber;
    use crate::types::PaymentMethod;
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn payment(contract_id: ContractId, y: i32, m: u32) -> Payment {
        let due = NaiveDate::from_ymd_opt(y, m, 10).unwrap();
        Payment::scheduled(contract_id, due, Money::from_major(1_000), Utc::now())
    }

    fn update() -> SettlementUpdate {
        SettlementUpdate {
            paid_at: Utc::now(),
            method: PaymentMethod::Pix,
            days_late: 0,
            penalty: Money::ZERO,
            interest: Money::ZERO,
            final_amount: Money::from_major(1_000),
            notes: "paid".to_string(),
            proof_refs: Vec::new(),
        }
    }

    #[test]
    fn test_one_payment_per_contract_month() {
        let store = InMemoryStore::new();
        let contract = Uuid::new_v4();

        store.insert_payment(payment(contract, 2024, 3)).unwrap();
        let err = store.insert_payment(payment(contract, 2024, 3)).unwrap_err();

        assert!(err.violates(Constraint::PaymentMonth));
        store.insert_payment(payment(contract, 2024, 4)).unwrap();
        store.insert_payment(payment(Uuid::new_v4(), 2024, 3)).unwrap();
        assert_eq!(store.payment_count(), 3);
    }

    #[test]
    fn test_settle_if_pending_applies_once() {
        let store = InMemoryStore::new();
        let p = payment(Uuid::new_v4(), 2024, 3);
        store.insert_payment(p.clone()).unwrap();

        let first = store.settle_if_pending(p.id, &update()).unwrap();
        let second = store.settle_if_pending(p.id, &update()).unwrap();
        let missing = store.settle_if_pending(Uuid::new_v4(), &update()).unwrap();

        assert!(matches!(first, ConditionalUpdate::Applied(ref paid) if paid.is_paid()));
        assert!(matches!(second, ConditionalUpdate::Rejected(_)));
        assert_eq!(missing, ConditionalUpdate::Missing);
    }

    #[test]
    fn test_receipt_constraints() {
        let store = InMemoryStore::new();
        let march = CompetenceMonth::new(2024, 3).unwrap();
        let first = sample_receipt(Uuid::new_v4(), march);
        store.insert_receipt(first.clone()).unwrap();

        // same payment, new number
        let mut again = sample_receipt(first.contract_id, march);
        again.payment_id = first.payment_id;
        again.number = ReceiptNumber::new("REC", march, 2).unwrap();
        assert!(store.insert_receipt(again).unwrap_err().violates(Constraint::ReceiptPayment));

        // new payment, same number
        let clash = sample_receipt(first.contract_id, march);
        assert!(store.insert_receipt(clash).unwrap_err().violates(Constraint::ReceiptNumber));

        assert_eq!(store.last_sequence(first.issuer_id, march).unwrap(), 1);
        assert_eq!(store.receipt_for_payment(first.payment_id).unwrap(), Some(first));
        assert_eq!(store.receipt_count(), 1);
    }

    #[test]
    fn test_sequences_are_per_issuer_and_month() {
        let store = InMemoryStore::new();
        let march = CompetenceMonth::new(2024, 3).unwrap();
        let april = march.next();
        store.insert_receipt(sample_receipt(Uuid::new_v4(), march)).unwrap();

        assert_eq!(store.last_sequence(Uuid::nil(), march).unwrap(), 1);
        assert_eq!(store.last_sequence(Uuid::nil(), april).unwrap(), 0);
        assert_eq!(store.last_sequence(Uuid::new_v4(), march).unwrap(), 0);
    }

    #[test]
    fn test_unknown_issuer_has_no_settings() {
        let store = InMemoryStore::new();
        let issuer = Uuid::new_v4();
        assert_eq!(store.financial_settings(issuer).unwrap(), None);

        store.put_settings(issuer, FinancialSettings::with_grace(3));
        assert_eq!(store.financial_settings(issuer).unwrap().unwrap().grace_period_days, 3);
    }
}
