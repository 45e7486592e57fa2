use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{Result, SettlementError};

/// division of a settled amount between the issuer's fee and the owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementSplit {
    pub gross_amount: Money,
    pub fee_percentage: Decimal,
    /// administration fee kept by the managing company
    pub fee_amount: Money,
    /// passed on to the property owner
    pub net_amount: Money,
}

/// split `amount` by an administration fee percentage in [0, 100]
///
/// the fee is rounded to cents and the owner's share is the exact remainder
pub fn split_settlement(amount: Money, fee_percentage: Decimal) -> Result<SettlementSplit> {
    if fee_percentage < Decimal::ZERO || fee_percentage > Decimal::ONE_HUNDRED {
        return Err(SettlementError::InvalidFeePercentage {
            percentage: fee_percentage,
        });
    }
    if amount.is_negative() {
        return Err(SettlementError::validation(format!(
            "cannot split a negative amount: {}",
            amount
        )));
    }

    let fee_amount = Money::from_decimal(amount.as_decimal() * fee_percentage / Decimal::ONE_HUNDRED);
    let net_amount = amount - fee_amount;

    Ok(SettlementSplit {
        gross_amount: amount,
        fee_percentage,
        fee_amount,
        net_amount,
    })
}
