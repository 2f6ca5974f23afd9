use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::money::Money;

/// Sentinel label meaning "no rule matched".
pub const OTHER: &str = "Other";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Credit,
    Debit,
}

impl Direction {
    /// Maps a statement's two-letter `CR`/`DR` code. Anything else is unknown.
    pub fn from_code(code: &str) -> Option<Direction> {
        let code = code.trim().trim_end_matches('.');
        if code.eq_ignore_ascii_case("cr") {
            Some(Direction::Credit)
        } else if code.eq_ignore_ascii_case("dr") {
            Some(Direction::Debit)
        } else {
            None
        }
    }

    pub fn multiplier(self) -> i32 {
        match self {
            Direction::Credit => 1,
            Direction::Debit => -1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Credit => write!(f, "CREDIT"),
            Direction::Debit => write!(f, "DEBIT"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown direction: '{0}'")]
pub struct ParseDirectionError(pub String);

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(d) = Direction::from_code(s) {
            return Ok(d);
        }
        match s.trim().to_lowercase().as_str() {
            "credit" => Ok(Direction::Credit),
            "debit" => Ok(Direction::Debit),
            other => Err(ParseDirectionError(other.to_string())),
        }
    }
}

/// One normalized statement line. Read-only once built by the importer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub date: NaiveDate,
    pub description: String,
    pub reference_type: Option<String>,
    pub reference_number: Option<String>,
    /// Always non-negative; the sign lives in `direction`.
    pub amount: Money,
    pub balance: Money,
    pub direction: Option<Direction>,
}

impl TransactionRecord {
    pub fn new(date: NaiveDate, description: &str, amount: Money, direction: Option<Direction>) -> Self {
        TransactionRecord {
            date,
            description: description.to_string(),
            reference_type: None,
            reference_number: None,
            amount: amount.abs(),
            balance: Money::zero(),
            direction,
        }
    }

    /// Amount with the direction's sign applied; unknown direction leaves it unsigned.
    pub fn signed_amount(&self) -> Money {
        match self.direction {
            Some(Direction::Debit) => -self.amount,
            _ => self.amount,
        }
    }

    pub fn is_credit(&self) -> bool {
        self.direction == Some(Direction::Credit)
    }

    pub fn is_debit(&self) -> bool {
        self.direction == Some(Direction::Debit)
    }
}

/// The four labels derived for a record. Fields are computed independently
/// and may disagree with each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub name: String,
    pub brand: String,
    pub category: String,
    pub payment_method: String,
}

impl ClassificationResult {
    pub fn unclassified() -> Self {
        ClassificationResult {
            name: OTHER.to_string(),
            brand: OTHER.to_string(),
            category: OTHER.to_string(),
            payment_method: OTHER.to_string(),
        }
    }

    /// Neither a counterparty nor a spending bucket could be assigned.
    pub fn is_unclassified(&self) -> bool {
        self.name == OTHER && self.category == OTHER
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedTransaction {
    pub record: TransactionRecord,
    pub labels: ClassificationResult,
}
