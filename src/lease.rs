use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{Result, SettlementError};
use crate::types::{ContractId, ContractStatus, IssuerId, OwnerId, PropertyId, TenantId};

/// lease agreement between a tenant and a property owner, managed by an issuer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub issuer_id: IssuerId,
    pub property_id: PropertyId,
    pub tenant_id: TenantId,
    pub rent_amount: Money,
    pub deposit: Money,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// administration fee kept by the issuer, 0 to 100
    pub admin_fee_percentage: Decimal,
    pub status: ContractStatus,
    /// due day of month; falls back to config, then to the start date's day
    pub payment_day: Option<u8>,
    pub terminated_on: Option<NaiveDate>,
    /// include in the yearly tax declaration export
    pub include_in_tax_report: bool,
}

impl Contract {
    /// new active contract with no fee override and no deposit
    pub fn new(
        issuer_id: IssuerId,
        property_id: PropertyId,
        tenant_id: TenantId,
        rent_amount: Money,
        start_date: NaiveDate,
        end_date: NaiveDate,
        admin_fee_percentage: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            issuer_id,
            property_id,
            tenant_id,
            rent_amount,
            deposit: Money::ZERO,
            start_date: Some(start_date),
            end_date: Some(end_date),
            admin_fee_percentage,
            status: ContractStatus::Active,
            payment_day: None,
            terminated_on: None,
            include_in_tax_report: true,
        }
    }

    /// terminate on the given date
    pub fn terminate(&mut self, on: NaiveDate) {
        self.status = ContractStatus::Terminated;
        self.terminated_on = Some(on);
    }

    /// last date rent is owed: termination date if terminated earlier, else end date
    pub fn effective_end(&self) -> Option<NaiveDate> {
        match (self.end_date, self.terminated_on) {
            (Some(end), Some(terminated)) => Some(end.min(terminated)),
            (end, None) => end,
            (None, terminated) => terminated,
        }
    }

    /// fail fast before any payment is generated for this contract
    pub fn validate_for_schedule(&self) -> Result<(NaiveDate, NaiveDate)> {
        if !self.rent_amount.is_positive() {
            return Err(SettlementError::validation(format!(
                "contract {} has a non-positive rent amount: {}",
                self.id, self.rent_amount
            )));
        }
        let start = self.start_date.ok_or_else(|| {
            SettlementError::validation(format!("contract {} has no start date", self.id))
        })?;
        let end = self.end_date.ok_or_else(|| {
            SettlementError::validation(format!("contract {} has no end date", self.id))
        })?;
        if start > end {
            return Err(SettlementError::validation(format!(
                "contract {} starts {} after it ends {}",
                self.id, start, end
            )));
        }
        if self.admin_fee_percentage < Decimal::ZERO || self.admin_fee_percentage > Decimal::ONE_HUNDRED {
            return Err(SettlementError::InvalidFeePercentage {
                percentage: self.admin_fee_percentage,
            });
        }
        if let Some(day) = self.payment_day {
            if !(1..=31).contains(&day) {
                return Err(SettlementError::validation(format!(
                    "contract {} has an invalid payment day: {}",
                    self.id, day
                )));
            }
        }
        Ok((start, end))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    pub id: OwnerId,
    pub name: String,
    /// CPF/CNPJ or equivalent tax document
    pub document: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub document: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub owner_id: OwnerId,
    pub address: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn contract() -> Contract {
        Contract::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Money::from_major(2_000),
            date(2024, 1, 1),
            date(2024, 12, 31),
            dec!(10),
        )
    }

    #[test]
    fn test_valid_contract() {
        let (start, end) = contract().validate_for_schedule().unwrap();
        assert_eq!(start, date(2024, 1, 1));
        assert_eq!(end, date(2024, 12, 31));
    }

    #[test]
    fn test_missing_fields_fail_fast() {
        let mut c = contract();
        c.rent_amount = Money::ZERO;
        assert!(c.validate_for_schedule().unwrap_err().is_validation());

        let mut c = contract();
        c.start_date = None;
        assert!(c.validate_for_schedule().unwrap_err().is_validation());

        let mut c = contract();
        c.end_date = Some(date(2023, 6, 1));
        assert!(c.validate_for_schedule().is_err());

        let mut c = contract();
        c.admin_fee_percentage = dec!(101);
        assert!(matches!(
            c.validate_for_schedule(),
            Err(SettlementError::InvalidFeePercentage { .. })
        ));

        let mut c = contract();
        c.payment_day = Some(0);
        assert!(c.validate_for_schedule().is_err());
    }

    #[test]
    fn test_termination_shortens_effective_end() {
        let mut c = contract();
        assert_eq!(c.effective_end(), Some(date(2024, 12, 31)));

        c.terminate(date(2024, 6, 15));
        assert_eq!(c.status, ContractStatus::Terminated);
        assert_eq!(c.effective_end(), Some(date(2024, 6, 15)));
    }
}
