use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::errors::{Result, SettlementError};
use crate::types::CompetenceMonth;

/// default zero-padded width of the sequence segment
pub const DEFAULT_SEQUENCE_WIDTH: usize = 4;

/// receipt number in the stable `PREFIX-YYYYMM-NNNN` format
///
/// the sequence counts receipts per issuer and competence month, starting at 1;
/// sequences past the padded width are written in full
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReceiptNumber {
    prefix: String,
    competence: CompetenceMonth,
    sequence: u32,
    width: usize,
}

impl ReceiptNumber {
    pub fn new(prefix: impl Into<String>, competence: CompetenceMonth, sequence: u32) -> Result<Self> {
        Self::with_width(prefix, competence, sequence, DEFAULT_SEQUENCE_WIDTH)
    }

    pub fn with_width(
        prefix: impl Into<String>,
        competence: CompetenceMonth,
        sequence: u32,
        width: usize,
    ) -> Result<Self> {
        let prefix = prefix.into();
        if prefix.is_empty() || prefix.contains('-') || prefix.chars().any(char::is_whitespace) {
            return Err(SettlementError::validation(format!(
                "invalid receipt prefix: {:?}",
                prefix
            )));
        }
        if sequence == 0 {
            return Err(SettlementError::validation("receipt sequence starts at 1"));
        }
        Ok(Self {
            prefix,
            competence,
            sequence,
            width: width.max(1),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn competence(&self) -> CompetenceMonth {
        self.competence
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl fmt::Display for ReceiptNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{:0width$}",
            self.prefix,
            self.competence.compact(),
            self.sequence,
            width = self.width
        )
    }
}

impl FromStr for ReceiptNumber {
    type Err = SettlementError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || SettlementError::validation(format!("malformed receipt number: {:?}", s));

        let mut parts = s.rsplitn(3, '-');
        let seq = parts.next().ok_or_else(invalid)?;
        let period = parts.next().ok_or_else(invalid)?;
        let prefix = parts.next().ok_or_else(invalid)?;

        if period.len() != 6 || !period.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        if seq.is_empty() || !seq.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let year: i32 = period[..4].parse().map_err(|_| invalid())?;
        let month: u32 = period[4..].parse().map_err(|_| invalid())?;
        let sequence: u32 = seq.parse().map_err(|_| invalid())?;

        let competence = CompetenceMonth::new(year, month)?;
        ReceiptNumber::with_width(prefix, competence, sequence, seq.len())
    }
}

impl Serialize for ReceiptNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ReceiptNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn march() -> CompetenceMonth {
        CompetenceMonth::new(2024, 3).unwrap()
    }

    #[test]
    fn test_format() {
        let number = ReceiptNumber::new("REC", march(), 1).unwrap();
        assert_eq!(number.to_string(), "REC-202403-0001");

        let wide = ReceiptNumber::new("REC", march(), 12_345).unwrap();
        assert_eq!(wide.to_string(), "REC-202403-12345");

        let narrow = ReceiptNumber::with_width("ACME", march(), 7, 6).unwrap();
        assert_eq!(narrow.to_string(), "ACME-202403-000007");
    }

    #[test]
    fn test_parse() {
        let number: ReceiptNumber = "REC-202403-0042".parse().unwrap();
        assert_eq!(number.prefix(), "REC");
        assert_eq!(number.competence(), march());
        assert_eq!(number.sequence(), 42);
        assert_eq!(number.to_string(), "REC-202403-0042");
    }

    #[test]
    fn test_malformed_numbers_rejected() {
        assert!("REC-2024-0001".parse::<ReceiptNumber>().is_err());
        assert!("REC-202413-0001".parse::<ReceiptNumber>().is_err());
        assert!("REC-202403-".parse::<ReceiptNumber>().is_err());
        assert!("202403-0001".parse::<ReceiptNumber>().is_err());
        assert!("REC-202403-0000".parse::<ReceiptNumber>().is_err());
    }

    #[test]
    fn test_invalid_prefix_rejected() {
        assert!(ReceiptNumber::new("", march(), 1).is_err());
        assert!(ReceiptNumber::new("A B", march(), 1).is_err());
    }

    #[test]
    fn test_serializes_as_string() {
        let number = ReceiptNumber::new("REC", march(), 3).unwrap();
        let json = serde_json::to_string(&number).unwrap();
        assert_eq!(json, "\"REC-202403-0003\"");
        let back: ReceiptNumber = serde_json::from_str(&json).unwrap();
        assert_eq!(back, number);
    }
}
