use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::config::FinancialSettings;
use crate::decimal::{round2, Money};
use crate::errors::{Result, SettlementError};
use crate::interest::{days_late, LateCharges};

/// calculator for the flat late penalty and daily late interest
#[derive(Debug, Clone)]
pub struct LateChargeCalculator {
    pub settings: FinancialSettings,
}

impl LateChargeCalculator {
    pub fn new(settings: FinancialSettings) -> Self {
        Self { settings }
    }

    /// late charges on `amount` due `due_date` and paid `paid_on`
    ///
    /// The penalty is charged once, not per day. Interest is simple daily interest on
    /// the original amount. The composed total is rounded once; the penalty is rounded
    /// to cents and interest takes the remainder, so
    /// `amount + penalty + interest == final_amount` always holds.
    pub fn calculate(
        &self,
        amount: Money,
        due_date: NaiveDate,
        paid_on: NaiveDate,
        include_interest: bool,
    ) -> Result<LateCharges> {
        if amount.is_negative() {
            return Err(SettlementError::validation(format!(
                "amount cannot be negative: {}",
                amount
            )));
        }

        let days = days_late(due_date, paid_on, self.settings.grace_period_days);
        if days == 0 {
            return Ok(LateCharges::on_time(amount));
        }

        let base = amount.as_decimal();
        let penalty_raw = base * self.settings.penalty_rate.as_decimal();
        let interest_raw = if include_interest {
            base * self.settings.daily_interest_rate.as_decimal() * Decimal::from(days)
        } else {
            Decimal::ZERO
        };

        let final_amount = Money::from_decimal(base + penalty_raw + interest_raw);
        let penalty = Money::from_decimal(round2(penalty_raw));
        let interest = final_amount - amount - penalty;

        Ok(LateCharges {
            days_late: days,
            penalty,
            interest,
            final_amount,
        })
    }
}

/// one-shot form of [`LateChargeCalculator::calculate`]
pub fn calculate_late_charges(
    amount: Money,
    due_date: NaiveDate,
    paid_on: NaiveDate,
    settings: &FinancialSettings,
    include_interest: bool,
) -> Result<LateCharges> {
    LateChargeCalculator::new(settings.clone()).calculate(amount, due_date, paid_on, include_interest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_fifteen_days_late() {
        let settings = FinancialSettings::standard();
        let result = calculate_late_charges(
            Money::from_major(1_000),
            date(2024, 1, 10),
            date(2024, 1, 25),
            &settings,
            true,
        )
        .unwrap();

        assert_eq!(result.days_late, 15);
        assert_eq!(result.penalty, Money::from_major(20));
        assert_eq!(result.interest, Money::from_minor(495));
        assert_eq!(result.final_amount, Money::from_minor(102_495));
    }

    #[test]
    fn test_on_time_and_early_payment() {
        let calculator = LateChargeCalculator::new(FinancialSettings::standard());
        let amount = Money::from_major(1_500);

        let on_time = calculator.calculate(amount, date(2024, 5, 5), date(2024, 5, 5), true).unwrap();
        let early = calculator.calculate(amount, date(2024, 5, 5), date(2024, 4, 28), true).unwrap();

        assert_eq!(on_time, LateCharges::on_time(amount));
        assert_eq!(early, LateCharges::on_time(amount));
    }

    #[test]
    fn test_grace_period() {
        let calculator = LateChargeCalculator::new(FinancialSettings::with_grace(5));
        let amount = Money::from_major(1_000);

        let within = calculator.calculate(amount, date(2024, 1, 10), date(2024, 1, 15), true).unwrap();
        assert!(!within.is_late());

        let after = calculator.calculate(amount, date(2024, 1, 10), date(2024, 1, 20), true).unwrap();
        assert_eq!(after.days_late, 5);
        assert_eq!(after.penalty, Money::from_major(20));
        assert_eq!(after.interest, Money::from_minor(165));
    }

    #[test]
    fn test_interest_waived_keeps_penalty() {
        let calculator = LateChargeCalculator::new(FinancialSettings::standard());
        let result = calculator
            .calculate(Money::from_major(1_000), date(2024, 1, 10), date(2024, 2, 10), false)
            .unwrap();

        assert_eq!(result.days_late, 31);
        assert_eq!(result.penalty, Money::from_major(20));
        assert_eq!(result.interest, Money::ZERO);
        assert_eq!(result.final_amount, Money::from_major(1_020));
    }

    #[test]
    fn test_single_rounding_reconciles() {
        // penalty 0.025 rounds to 0.03, interest 0.0016632 is absorbed by the total
        let mut settings = FinancialSettings::standard();
        settings.penalty_rate = Rate::from_decimal(dec!(0.0199));
        let calculator = LateChargeCalculator::new(settings);
        let amount = Money::from_str_exact("1.26").unwrap();

        let result = calculator.calculate(amount, date(2024, 1, 1), date(2024, 1, 5), true).unwrap();

        assert_eq!(result.final_amount, amount + result.penalty + result.interest);
        assert!(!result.interest.is_negative());
    }

    #[test]
    fn test_negative_amount_rejected() {
        let calculator = LateChargeCalculator::new(FinancialSettings::standard());
        let err = calculator
            .calculate(Money::from_major(-1), date(2024, 1, 1), date(2024, 1, 5), true)
            .unwrap_err();
        assert!(err.is_validation());
    }
}
