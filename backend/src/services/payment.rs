//! Payment recording against invoices
//!
//! Payments are append-only. Recording one locks the invoice row,
//! checks the amount against the remaining balance, and folds the new
//! aggregates and status back into the invoice in the same
//! transaction.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::models::{derive_status, Invoice, Payment, PaymentMethod};

/// Payment service
#[derive(Clone)]
pub struct PaymentService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct PaymentRow {
    id: Uuid,
    invoice_id: Uuid,
    amount: Decimal,
    payment_date: NaiveDate,
    method: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl PaymentRow {
    fn into_payment(self) -> AppResult<Payment> {
        let method: PaymentMethod = self
            .method
            .parse()
            .map_err(|e: String| AppError::Internal(e))?;
        Ok(Payment {
            id: self.id,
            invoice_id: self.invoice_id,
            amount: self.amount,
            payment_date: self.payment_date,
            method,
            notes: self.notes,
            created_at: self.created_at,
        })
    }
}

/// Input for recording a payment
#[derive(Debug, Deserialize)]
pub struct RecordPaymentInput {
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub method: PaymentMethod,
    pub notes: Option<String>,
}

impl PaymentService {
    /// Create a new PaymentService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a payment against an invoice and return the updated
    /// invoice. Overpayment is rejected, never clamped.
    pub async fn record_payment(
        &self,
        invoice_id: Uuid,
        input: RecordPaymentInput,
    ) -> AppResult<Invoice> {
        if input.amount <= Decimal::ZERO {
            return Err(AppError::InvalidPaymentAmount(
                "Payment amount must be positive".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;

        let (total, total_paid, due_date) =
            sqlx::query_as::<_, (Decimal, Decimal, Option<NaiveDate>)>(
                "SELECT total, total_paid_amount, due_date FROM invoices WHERE id = $1 FOR UPDATE",
            )
            .bind(invoice_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Invoice".to_string()))?;

        let remaining = total - total_paid;
        if input.amount > remaining {
            return Err(AppError::InvalidPaymentAmount(format!(
                "Payment of {} exceeds the remaining balance of {}",
                input.amount, remaining
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO payments (invoice_id, amount, payment_date, method, notes)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(invoice_id)
        .bind(input.amount)
        .bind(input.payment_date)
        .bind(input.method.as_str())
        .bind(&input.notes)
        .execute(&mut *tx)
        .await?;

        let new_paid = total_paid + input.amount;
        let today = Utc::now().date_naive();
        let status = derive_status(total, new_paid, due_date, today);

        sqlx::query(
            r#"
            UPDATE invoices
            SET total_paid_amount = $1, remaining_amount = total - $1,
                status = $2, updated_at = now()
            WHERE id = $3
            "#,
        )
        .bind(new_paid)
        .bind(status.as_str())
        .bind(invoice_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        crate::services::InvoiceService::new(self.db.clone())
            .get_invoice(invoice_id)
            .await
    }

    /// List payments of one invoice, oldest first
    pub async fn list_payments(&self, invoice_id: Uuid) -> AppResult<Vec<Payment>> {
        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM invoices WHERE id = $1",
        )
        .bind(invoice_id)
        .fetch_one(&self.db)
        .await?;
        if exists == 0 {
            return Err(AppError::NotFound("Invoice".to_string()));
        }

        fetch_payments_pool(&self.db, invoice_id).await
    }
}

const PAYMENT_COLUMNS: &str =
    "id, invoice_id, amount, payment_date, method, notes, created_at";

pub(crate) async fn fetch_payments(
    tx: &mut Transaction<'_, Postgres>,
    invoice_id: Uuid,
) -> AppResult<Vec<Payment>> {
    sqlx::query_as::<_, PaymentRow>(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments WHERE invoice_id = $1 ORDER BY created_at, id",
    ))
    .bind(invoice_id)
    .fetch_all(&mut **tx)
    .await?
    .into_iter()
    .map(PaymentRow::into_payment)
    .collect()
}

pub(crate) async fn fetch_payments_pool(
    db: &PgPool,
    invoice_id: Uuid,
) -> AppResult<Vec<Payment>> {
    sqlx::query_as::<_, PaymentRow>(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments WHERE invoice_id = $1 ORDER BY created_at, id",
    ))
    .bind(invoice_id)
    .fetch_all(db)
    .await?
    .into_iter()
    .map(PaymentRow::into_payment)
    .collect()
}
