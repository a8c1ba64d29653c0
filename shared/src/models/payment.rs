//! Payment records against invoices
//!
//! Payments are append-only: corrections are business events of their
//! own, never in-place edits of history.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a payment was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Online,
    Cheque,
    Bank,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Online => "online",
            PaymentMethod::Cheque => "cheque",
            PaymentMethod::Bank => "bank",
            PaymentMethod::Other => "other",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "online" => Ok(PaymentMethod::Online),
            "cheque" => Ok(PaymentMethod::Cheque),
            "bank" => Ok(PaymentMethod::Bank),
            "other" => Ok(PaymentMethod::Other),
            other => Err(format!("unknown payment method: {other}")),
        }
    }
}

/// A single recorded payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub method: PaymentMethod,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
