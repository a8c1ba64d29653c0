//! Dashboard summary figures
//!
//! Everything here is recomputed from the live tables on each request.
//! Overdue counts are derived from the due date at query time rather
//! than trusting the stored status, which only moves on writes.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::error::AppResult;

/// Reporting service
#[derive(Clone)]
pub struct ReportService {
    db: PgPool,
}

/// Counts of invoices by effective payment status
#[derive(Debug, Default, Serialize, FromRow)]
pub struct StatusCounts {
    pub unpaid: i64,
    pub partial: i64,
    pub paid: i64,
    pub overdue: i64,
}

/// Totals of the six stock counters across all items
#[derive(Debug, Default, Serialize, FromRow)]
pub struct StockTotals {
    pub shop_quantity: Decimal,
    pub shop_net_weight: Decimal,
    pub shop_gross_weight: Decimal,
    pub cold_quantity: Decimal,
    pub cold_net_weight: Decimal,
    pub cold_gross_weight: Decimal,
}

/// The dashboard summary document
#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub total_balance: Decimal,
    /// Outstanding on customer invoices
    pub total_receivable: Decimal,
    /// Outstanding on vendor invoices
    pub total_payable: Decimal,
    pub invoice_counts: StatusCounts,
    pub stock_totals: StockTotals,
}

impl ReportService {
    /// Create a new ReportService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Build the dashboard summary
    pub async fn dashboard_summary(&self) -> AppResult<DashboardSummary> {
        let total_balance = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(
                CASE entry_type WHEN 'addition' THEN amount ELSE -amount END
            ), 0)
            FROM balance_entries
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        let (total_receivable, total_payable) = sqlx::query_as::<_, (Decimal, Decimal)>(
            r#"
            SELECT
                COALESCE(SUM(remaining_amount) FILTER (WHERE kind = 'customer'), 0),
                COALESCE(SUM(remaining_amount) FILTER (WHERE kind = 'vendor'), 0)
            FROM invoices
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        // Effective status: fully paid wins (including zero-total
        // invoices), then partial, then a past due date makes an
        // unpaid invoice overdue. Each invoice lands in exactly one
        // bucket, matching `derive_status`.
        let invoice_counts = sqlx::query_as::<_, StatusCounts>(
            r#"
            SELECT
                COUNT(*) FILTER (
                    WHERE total_paid_amount = 0
                      AND total_paid_amount < total
                      AND (due_date IS NULL OR due_date >= CURRENT_DATE)
                ) AS unpaid,
                COUNT(*) FILTER (
                    WHERE total_paid_amount > 0 AND total_paid_amount < total
                ) AS partial,
                COUNT(*) FILTER (WHERE total_paid_amount >= total) AS paid,
                COUNT(*) FILTER (
                    WHERE total_paid_amount = 0
                      AND total_paid_amount < total
                      AND due_date < CURRENT_DATE
                ) AS overdue
            FROM invoices
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        let stock_totals = sqlx::query_as::<_, StockTotals>(
            r#"
            SELECT
                COALESCE(SUM(shop_quantity), 0) AS shop_quantity,
                COALESCE(SUM(shop_net_weight), 0) AS shop_net_weight,
                COALESCE(SUM(shop_gross_weight), 0) AS shop_gross_weight,
                COALESCE(SUM(cold_quantity), 0) AS cold_quantity,
                COALESCE(SUM(cold_net_weight), 0) AS cold_net_weight,
                COALESCE(SUM(cold_gross_weight), 0) AS cold_gross_weight
            FROM items
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        Ok(DashboardSummary {
            total_balance,
            total_receivable,
            total_payable,
            invoice_counts,
            stock_totals,
        })
    }
}
