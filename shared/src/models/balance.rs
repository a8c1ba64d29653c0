//! Manual cash-balance ledger
//!
//! An entity-independent append-only ledger of fund additions and
//! subtractions. The overall balance is always recomputed as
//! sum of additions minus sum of subtractions.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a balance entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceEntryType {
    Addition,
    Subtraction,
}

impl BalanceEntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BalanceEntryType::Addition => "addition",
            BalanceEntryType::Subtraction => "subtraction",
        }
    }
}

impl std::str::FromStr for BalanceEntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "addition" => Ok(BalanceEntryType::Addition),
            "subtraction" => Ok(BalanceEntryType::Subtraction),
            other => Err(format!("unknown balance entry type: {other}")),
        }
    }
}

/// One ledger entry; amount is always positive, direction is the type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub id: Uuid,
    pub amount: Decimal,
    pub entry_date: NaiveDate,
    pub remarks: String,
    pub entry_type: BalanceEntryType,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Net balance of a set of entries
pub fn total_balance<'a, I>(entries: I) -> Decimal
where
    I: IntoIterator<Item = &'a BalanceEntry>,
{
    entries.into_iter().fold(Decimal::ZERO, |acc, e| match e.entry_type {
        BalanceEntryType::Addition => acc + e.amount,
        BalanceEntryType::Subtraction => acc - e.amount,
    })
}
