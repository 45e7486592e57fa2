/// serialization support for receipts
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::receipts::Receipt;
use crate::types::{PaymentId, ReceiptId};

/// flat view of a receipt for pdf rendering and tax export
#[derive(Debug, Serialize, Deserialize)]
pub struct ReceiptView {
    pub id: ReceiptId,
    pub payment_id: PaymentId,
    /// stable `PREFIX-YYYYMM-NNNN` string
    pub number: String,
    pub competence: String,
    pub competence_label: String,
    pub payment_date: NaiveDate,
    pub payment_method: String,
    pub amounts: AmountsView,
    pub parties: PartiesView,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AmountsView {
    pub gross: String,
    pub fee_percentage: String,
    pub fee: String,
    pub net: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PartiesView {
    pub owner: String,
    pub owner_document: String,
    pub tenant: String,
    pub tenant_document: String,
    pub property_address: String,
}

impl ReceiptView {
    pub fn from_receipt(receipt: &Receipt) -> Self {
        ReceiptView {
            id: receipt.id,
            payment_id: receipt.payment_id,
            number: receipt.number.to_string(),
            competence: receipt.competence.to_string(),
            competence_label: receipt.competence.label(),
            payment_date: receipt.payment_date,
            payment_method: receipt.payment_method.to_string(),
            amounts: AmountsView {
                gross: receipt.gross_amount.to_fixed(),
                fee_percentage: format!("{}%", receipt.fee_percentage.normalize()),
                fee: receipt.fee_amount.to_fixed(),
                net: receipt.net_amount.to_fixed(),
            },
            parties: PartiesView {
                owner: receipt.parties.owner_name.clone(),
                owner_document: receipt.parties.owner_document.clone(),
                tenant: receipt.parties.tenant_name.clone(),
                tenant_document: receipt.parties.tenant_document.clone(),
                property_address: receipt.parties.property_address.clone(),
            },
            issued_at: receipt.issued_at,
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
