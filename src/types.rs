use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::errors::{Result, SettlementError};

pub type ContractId = Uuid;
pub type PaymentId = Uuid;
pub type ReceiptId = Uuid;
/// the managing company (or user) that owns contracts and issues receipts
pub type IssuerId = Uuid;
pub type PropertyId = Uuid;
pub type OwnerId = Uuid;
pub type TenantId = Uuid;

/// contract status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    /// drafted, not yet signed
    Draft,
    /// signed and in force
    Active,
    /// ended early
    Terminated,
    /// ran to its end date
    Expired,
}

/// payment status
///
/// overdue is a derived view of `Pending` with a past due date, never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

/// how the tenant paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Pix,
    Boleto,
    BankTransfer,
    Cash,
    Card,
    Other,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pix => "PIX",
            Self::Boleto => "boleto",
            Self::BankTransfer => "bank transfer",
            Self::Cash => "cash",
            Self::Card => "card",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

/// calendar month a payment is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawCompetence")]
pub struct CompetenceMonth {
    year: i32,
    month: u32,
}

/// unchecked wire form, validated through `CompetenceMonth::new`
#[derive(Deserialize)]
struct RawCompetence {
    year: i32,
    month: u32,
}

impl TryFrom<RawCompetence> for CompetenceMonth {
    type Error = SettlementError;

    fn try_from(raw: RawCompetence) -> Result<Self> {
        Self::new(raw.year, raw.month)
    }
}

impl CompetenceMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(SettlementError::Validation {
                message: format!("month must be between 1 and 12, got {}", month),
            });
        }
        Ok(Self { year, month })
    }

    /// month containing the given date
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    /// month `n` months later
    pub fn plus_months(&self, n: u32) -> Self {
        let index = self.year as i64 * 12 + (self.month as i64 - 1) + n as i64;
        Self {
            year: (index / 12) as i32,
            month: (index % 12) as u32 + 1,
        }
    }

    pub fn days_in_month(&self) -> u32 {
        days_in_month(self.year, self.month)
    }

    pub fn first_day(&self) -> NaiveDate {
        self.date_clamped(1)
    }

    pub fn last_day(&self) -> NaiveDate {
        self.date_clamped(self.days_in_month())
    }

    /// due date on `day`, clamped to the month's last valid day
    pub fn date_clamped(&self, day: u32) -> NaiveDate {
        let day = day.clamp(1, self.days_in_month());
        // year/month were validated and day is within the month
        NaiveDate::from_ymd_opt(self.year, self.month, day).unwrap_or(NaiveDate::MIN)
    }

    /// `YYYYMM`, as used in receipt numbers
    pub fn compact(&self) -> String {
        format!("{:04}{:02}", self.year, self.month)
    }

    /// human label, e.g. `March 2024`
    pub fn label(&self) -> String {
        format!("{} {}", MONTH_NAMES[(self.month - 1) as usize], self.year)
    }
}

impl fmt::Display for CompetenceMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

pub(crate) fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}
