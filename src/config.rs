use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::decimal::Rate;
use crate::errors::{Result, SettlementError};

/// per-issuer late-charge and receipt configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSettings {
    /// interest charged per day late, on the original amount
    pub daily_interest_rate: Rate,
    /// one-time flat penalty once a payment is late
    pub penalty_rate: Rate,
    /// days after the due date before anything accrues
    pub grace_period_days: u32,
    /// leading segment of every receipt number
    ///
    /// numbers are unique per issuer only; issuers sharing the default `REC`
    /// issue equal numbers, so each issuer needing distinct numbers sets its own
    pub receipt_prefix: String,
}

impl Default for FinancialSettings {
    fn default() -> Self {
        Self::standard()
    }
}

impl FinancialSettings {
    /// 2% penalty, 0.033% a day (about 1% a month), no grace
    pub fn standard() -> Self {
        Self {
            daily_interest_rate: Rate::from_percent(dec!(0.033)),
            penalty_rate: Rate::from_percentage(2),
            grace_period_days: 0,
            receipt_prefix: "REC".to_string(),
        }
    }

    /// no interest and no penalty
    pub fn waived() -> Self {
        Self {
            daily_interest_rate: Rate::ZERO,
            penalty_rate: Rate::ZERO,
            ..Self::standard()
        }
    }

    /// standard rates with a grace period
    pub fn with_grace(days: u32) -> Self {
        Self {
            grace_period_days: days,
            ..Self::standard()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.daily_interest_rate.is_negative() {
            return Err(SettlementError::validation(format!(
                "daily interest rate cannot be negative: {}",
                self.daily_interest_rate
            )));
        }
        if self.penalty_rate.is_negative() || self.penalty_rate.as_decimal() > Decimal::ONE {
            return Err(SettlementError::validation(format!(
                "penalty rate must be between 0% and 100%: {}",
                self.penalty_rate
            )));
        }
        if self.receipt_prefix.is_empty()
            || self
                .receipt_prefix
                .chars()
                .any(|c| c == '-' || c.is_whitespace())
        {
            return Err(SettlementError::validation(format!(
                "receipt prefix must be non-empty without '-' or spaces: {:?}",
                self.receipt_prefix
            )));
        }
        Ok(())
    }
}

/// schedule generation configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// due day used when the contract has none; otherwise the start date's day
    pub default_due_day: Option<u8>,
}

/// receipt numbering configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptConfig {
    /// zero-padded width of the sequence segment
    pub sequence_width: usize,
    /// attempts at claiming a free sequence number before giving up
    pub max_allocation_attempts: u32,
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        Self {
            sequence_width: 4,
            max_allocation_attempts: 8,
        }
    }
}

/// payment provider connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_seconds: u64,
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout_seconds: 10,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub schedule: ScheduleConfig,
    pub receipts: ReceiptConfig,
    pub gateway: Option<GatewayConfig>,
}

impl EngineConfig {
    /// load from process environment, reading `.env` first if present
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// build from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = EngineConfig::default();

        if let Some(day) = parse_var::<u8>(&read, "LEASE_DEFAULT_DUE_DAY")? {
            if !(1..=31).contains(&day) {
                return Err(SettlementError::validation(format!(
                    "LEASE_DEFAULT_DUE_DAY must be between 1 and 31, got {}",
                    day
                )));
            }
            config.schedule.default_due_day = Some(day);
        }
        if let Some(width) = parse_var::<usize>(&read, "LEASE_RECEIPT_SEQUENCE_WIDTH")? {
            config.receipts.sequence_width = width.max(1);
        }
        if let Some(attempts) = parse_var::<u32>(&read, "LEASE_RECEIPT_MAX_ATTEMPTS")? {
            config.receipts.max_allocation_attempts = attempts.max(1);
        }

        if let Some(base_url) = read("LEASE_GATEWAY_BASE_URL") {
            let api_key = read("LEASE_GATEWAY_API_KEY").ok_or_else(|| {
                SettlementError::validation(
                    "LEASE_GATEWAY_API_KEY is required when LEASE_GATEWAY_BASE_URL is set",
                )
            })?;
            let mut gateway = GatewayConfig::new(base_url, api_key);
            if let Some(timeout) = parse_var::<u64>(&read, "LEASE_GATEWAY_TIMEOUT_SECONDS")? {
                gateway.timeout_seconds = timeout.max(1);
            }
            config.gateway = Some(gateway);
        }

        Ok(config)
    }
}

fn parse_var<T: FromStr>(read: &dyn Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>> {
    match read(key) {
        None => Ok(None),
        Some(raw) => raw.parse::<T>().map(Some).map_err(|_| {
            SettlementError::validation(format!("{} has an invalid value: {:?}", key, raw))
        }),
    }
}
