pub mod penalty;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;

pub use penalty::{calculate_late_charges, LateChargeCalculator};

/// late charge calculation result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LateCharges {
    /// days late after the grace period
    pub days_late: u32,
    pub penalty: Money,
    pub interest: Money,
    pub final_amount: Money,
}

impl LateCharges {
    /// nothing owed beyond the original amount
    pub fn on_time(amount: Money) -> Self {
        Self {
            days_late: 0,
            penalty: Money::ZERO,
            interest: Money::ZERO,
            final_amount: amount,
        }
    }

    pub fn is_late(&self) -> bool {
        self.days_late > 0
    }

    pub fn total_charges(&self) -> Money {
        self.penalty + self.interest
    }
}

/// whole days between due and paid dates, net of grace; never negative
pub fn days_late(due_date: NaiveDate, paid_on: NaiveDate, grace_period_days: u32) -> u32 {
    let elapsed = (paid_on - due_date).num_days() - grace_period_days as i64;
    elapsed.clamp(0, u32::MAX as i64) as u32
}
