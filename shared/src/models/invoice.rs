//! Invoices and their derived fields

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Payment, PartyKind};
use crate::money;
use crate::stock::{StockBucket, StockDelta};

/// Payment status of an invoice, derived from total and payment history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Unpaid,
    Partial,
    Paid,
    Overdue,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Unpaid => "unpaid",
            InvoiceStatus::Partial => "partial",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(InvoiceStatus::Unpaid),
            "partial" => Ok(InvoiceStatus::Partial),
            "paid" => Ok(InvoiceStatus::Paid),
            "overdue" => Ok(InvoiceStatus::Overdue),
            other => Err(format!("unknown invoice status: {other}")),
        }
    }
}

/// Derive payment status from total, cumulative payments, and due date.
/// A fully-paid invoice is never overdue, regardless of its due date.
pub fn derive_status(
    total: Decimal,
    total_paid: Decimal,
    due_date: Option<NaiveDate>,
    today: NaiveDate,
) -> InvoiceStatus {
    if total_paid >= total {
        InvoiceStatus::Paid
    } else if total_paid > Decimal::ZERO {
        InvoiceStatus::Partial
    } else if due_date.is_some_and(|due| due < today) {
        InvoiceStatus::Overdue
    } else {
        InvoiceStatus::Unpaid
    }
}

/// A line on an invoice. `item_id` is absent for free-text lines,
/// which never move stock. `total_price` is derived server-side and
/// never trusted from the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub item_id: Option<Uuid>,
    pub item_name: String,
    pub quantity: Decimal,
    pub gross_weight: Decimal,
    pub net_weight: Decimal,
    pub packaging_cost: Decimal,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    /// Vendor invoices only: which bucket the purchase lands in
    pub storage_type: Option<StockBucket>,
}

impl LineItem {
    /// The full physical amounts this line represents
    pub fn stock_delta(&self) -> StockDelta {
        StockDelta::new(self.quantity, self.net_weight, self.gross_weight)
    }

    /// Recompute the derived total from the raw fields
    pub fn computed_total(&self) -> Decimal {
        money::line_total(
            self.quantity,
            self.packaging_cost,
            self.net_weight,
            self.unit_price,
        )
    }
}

/// An invoice with all derived fields recomputed server-side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: i64,
    pub kind: PartyKind,
    pub party_id: Uuid,
    /// Denormalized so a renamed party does not rewrite history
    pub party_name: String,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub items: Vec<LineItem>,
    pub labour_transport_cost: Decimal,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub broker_name: Option<String>,
    pub broker_commission_percentage: Option<Decimal>,
    pub broker_commission_amount: Option<Decimal>,
    pub payments: Vec<Payment>,
    pub total_paid_amount: Decimal,
    pub remaining_amount: Decimal,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::from_str(s).unwrap()
    }

    #[test]
    fn unpaid_without_payments_or_due_date() {
        let status = derive_status(dec("1000"), dec("0"), None, date("2025-06-01"));
        assert_eq!(status, InvoiceStatus::Unpaid);
    }

    #[test]
    fn partial_then_paid() {
        assert_eq!(
            derive_status(dec("1000"), dec("400"), None, date("2025-06-01")),
            InvoiceStatus::Partial
        );
        assert_eq!(
            derive_status(dec("1000"), dec("1000"), None, date("2025-06-01")),
            InvoiceStatus::Paid
        );
    }

    #[test]
    fn overdue_when_past_due_and_nothing_paid() {
        let status = derive_status(
            dec("1000"),
            dec("0"),
            Some(date("2025-05-31")),
            date("2025-06-01"),
        );
        assert_eq!(status, InvoiceStatus::Overdue);
    }

    #[test]
    fn paid_wins_over_overdue() {
        let status = derive_status(
            dec("1000"),
            dec("1000"),
            Some(date("2020-01-01")),
            date("2025-06-01"),
        );
        assert_eq!(status, InvoiceStatus::Paid);
    }

    #[test]
    fn due_today_is_not_overdue() {
        let status = derive_status(
            dec("1000"),
            dec("0"),
            Some(date("2025-06-01")),
            date("2025-06-01"),
        );
        assert_eq!(status, InvoiceStatus::Unpaid);
    }
}
