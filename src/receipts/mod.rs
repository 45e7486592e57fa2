pub mod issuer;
pub mod numbering;
pub mod view;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::lease::{Owner, Property, Tenant};
use crate::types::{CompetenceMonth, ContractId, IssuerId, PaymentId, PaymentMethod, ReceiptId};

pub use issuer::ReceiptIssuer;
pub use numbering::ReceiptNumber;
pub use view::ReceiptView;

/// owner, tenant and property data copied into a receipt when it is issued
///
/// later edits to the underlying records never reach an issued receipt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptParties {
    pub owner_name: String,
    pub owner_document: String,
    pub tenant_name: String,
    pub tenant_document: String,
    pub property_address: String,
}

impl ReceiptParties {
    pub fn snapshot(owner: &Owner, tenant: &Tenant, property: &Property) -> Self {
        Self {
            owner_name: owner.name.clone(),
            owner_document: owner.document.clone(),
            tenant_name: tenant.name.clone(),
            tenant_document: tenant.document.clone(),
            property_address: property.address.clone(),
        }
    }
}

/// immutable receipt for one settled payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: ReceiptId,
    pub number: ReceiptNumber,
    pub payment_id: PaymentId,
    pub contract_id: ContractId,
    pub issuer_id: IssuerId,
    /// due-date month of the payment
    pub competence: CompetenceMonth,
    pub payment_date: NaiveDate,
    pub payment_method: PaymentMethod,
    pub gross_amount: Money,
    pub fee_percentage: Decimal,
    pub fee_amount: Money,
    pub net_amount: Money,
    pub parties: ReceiptParties,
    pub issued_at: DateTime<Utc>,
}

/// receipt listing filter; empty fields match everything
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptFilter {
    pub contract_id: Option<ContractId>,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl ReceiptFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_contract(contract_id: ContractId) -> Self {
        Self {
            contract_id: Some(contract_id),
            ..Self::default()
        }
    }

    pub fn in_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn in_month(mut self, month: u32) -> Self {
        self.month = Some(month);
        self
    }

    /// year and month match the competence, not the payment date
    pub fn matches(&self, receipt: &Receipt) -> bool {
        self.contract_id.map_or(true, |id| receipt.contract_id == id)
            && self.year.map_or(true, |y| receipt.competence.year() == y)
            && self.month.map_or(true, |m| receipt.competence.month() == m)
    }
}

impl Receipt {
    /// paid in a later month than the one it is attributed to
    pub fn paid_after_competence(&self) -> bool {
        CompetenceMonth::from_date(self.payment_date) > self.competence
    }
}
