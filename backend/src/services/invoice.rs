//! Invoice reconciliation service
//!
//! Derived fields (line totals, subtotal, total, commission, remaining,
//! status) are always recomputed server-side from raw inputs; nothing
//! the client sends for them is trusted. Inventory is reconciled by
//! diffing the persisted line items against the incoming ones and
//! applying only the net delta, inside the same transaction as the
//! invoice write, so stock movement is exact-once and all-or-nothing.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::item::apply_delta_tx;
use crate::services::payment::fetch_payments;
use shared::models::{derive_status, Invoice, InvoiceStatus, LineItem, PartyKind};
use shared::money;
use shared::stock::{stock_movements, StockBucket};
use shared::types::{DateRange, PaginatedResponse, Pagination, PaginationMeta};
use shared::validation;

/// Invoice service: create, edit, delete, and read with full
/// recomputation
#[derive(Clone)]
pub struct InvoiceService {
    db: PgPool,
}

const INVOICE_COLUMNS: &str = "id, invoice_number, kind, party_id, party_name, \
     invoice_date, due_date, labour_transport_cost, subtotal, total, \
     broker_name, broker_commission_percentage, broker_commission_amount, \
     total_paid_amount, remaining_amount, status, created_at, updated_at";

// Status evaluated at read time. The stored column only moves on
// writes, so an invoice that crossed its due date since the last write
// would otherwise be filtered as unpaid. Mirrors `derive_status`.
const EFFECTIVE_STATUS: &str = "CASE \
     WHEN total_paid_amount >= total THEN 'paid' \
     WHEN total_paid_amount > 0 THEN 'partial' \
     WHEN due_date IS NOT NULL AND due_date < CURRENT_DATE THEN 'overdue' \
     ELSE 'unpaid' END";

#[derive(Debug, FromRow)]
struct InvoiceRow {
    id: Uuid,
    invoice_number: i64,
    kind: String,
    party_id: Uuid,
    party_name: String,
    invoice_date: NaiveDate,
    due_date: Option<NaiveDate>,
    labour_transport_cost: Decimal,
    subtotal: Decimal,
    total: Decimal,
    broker_name: Option<String>,
    broker_commission_percentage: Option<Decimal>,
    broker_commission_amount: Option<Decimal>,
    total_paid_amount: Decimal,
    remaining_amount: Decimal,
    #[allow(dead_code)]
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct LineRow {
    item_id: Option<Uuid>,
    item_name: String,
    quantity: Decimal,
    gross_weight: Decimal,
    net_weight: Decimal,
    packaging_cost: Decimal,
    unit_price: Decimal,
    total_price: Decimal,
    storage_type: Option<String>,
}

impl LineRow {
    fn into_line(self) -> AppResult<LineItem> {
        let storage_type = match self.storage_type.as_deref() {
            Some("shop") => Some(StockBucket::Shop),
            Some("cold") => Some(StockBucket::Cold),
            Some(other) => {
                return Err(AppError::Internal(format!(
                    "unknown storage type: {other}"
                )))
            }
            None => None,
        };
        Ok(LineItem {
            item_id: self.item_id,
            item_name: self.item_name,
            quantity: self.quantity,
            gross_weight: self.gross_weight,
            net_weight: self.net_weight,
            packaging_cost: self.packaging_cost,
            unit_price: self.unit_price,
            total_price: self.total_price,
            storage_type,
        })
    }
}

/// One line of an incoming invoice payload. The derived total is never
/// part of the input.
#[derive(Debug, Deserialize)]
pub struct LineItemInput {
    pub item_id: Option<Uuid>,
    pub item_name: Option<String>,
    pub quantity: Decimal,
    pub gross_weight: Decimal,
    pub net_weight: Decimal,
    #[serde(default)]
    pub packaging_cost: Decimal,
    pub unit_price: Decimal,
    pub storage_type: Option<StockBucket>,
}

/// Input for creating an invoice
#[derive(Debug, Deserialize)]
pub struct CreateInvoiceInput {
    pub kind: PartyKind,
    pub party_id: Uuid,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub items: Vec<LineItemInput>,
    #[serde(default)]
    pub labour_transport_cost: Decimal,
    pub broker_name: Option<String>,
    pub broker_commission_percentage: Option<Decimal>,
}

/// Input for editing an invoice: the full replacement document
/// (kind and party are immutable once issued)
#[derive(Debug, Deserialize)]
pub struct UpdateInvoiceInput {
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub items: Vec<LineItemInput>,
    #[serde(default)]
    pub labour_transport_cost: Decimal,
    pub broker_name: Option<String>,
    pub broker_commission_percentage: Option<Decimal>,
}

/// Listing filters
#[derive(Debug, Default, Deserialize)]
pub struct InvoiceFilter {
    pub kind: Option<PartyKind>,
    pub party_id: Option<Uuid>,
    pub status: Option<InvoiceStatus>,
    pub date_range: Option<DateRange>,
}

/// Listing row without the embedded items and payments
#[derive(Debug, Serialize)]
pub struct InvoiceSummary {
    pub id: Uuid,
    pub invoice_number: i64,
    pub kind: PartyKind,
    pub party_id: Uuid,
    pub party_name: String,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub total: Decimal,
    pub total_paid_amount: Decimal,
    pub remaining_amount: Decimal,
    pub status: InvoiceStatus,
}

impl InvoiceService {
    /// Create a new InvoiceService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create an invoice, moving stock for vendor and customer kinds
    pub async fn create_invoice(&self, input: CreateInvoiceInput) -> AppResult<Invoice> {
        validate_header(
            input.invoice_date,
            input.due_date,
            input.labour_transport_cost,
            &input.items,
        )?;
        validate_broker_fields(
            input.kind,
            &input.broker_name,
            input.broker_commission_percentage,
        )?;

        let mut tx = self.db.begin().await?;

        let party = sqlx::query_as::<_, (String, String)>(
            "SELECT kind, name FROM parties WHERE id = $1",
        )
        .bind(input.party_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Party".to_string()))?;

        if party.0 != input.kind.as_str() {
            return Err(AppError::Validation {
                field: "party_id".to_string(),
                message: format!(
                    "Party is a {}, cannot issue a {} invoice against it",
                    party.0, input.kind
                ),
            });
        }

        let lines = resolve_lines(&mut tx, input.kind, &input.items).await?;

        let subtotal = money::subtotal(lines.iter().map(|l| l.total_price));
        let total = money::invoice_total(subtotal, input.labour_transport_cost);
        let commission = input
            .broker_commission_percentage
            .map(|pct| money::commission_amount(total, pct));

        for movement in stock_movements(input.kind, &[], &lines) {
            apply_delta_tx(&mut tx, movement.item_id, movement.bucket, &movement.delta).await?;
        }

        let today = Utc::now().date_naive();
        let status = derive_status(total, Decimal::ZERO, input.due_date, today);

        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            r#"
            INSERT INTO invoices (
                kind, party_id, party_name, invoice_date, due_date,
                labour_transport_cost, subtotal, total,
                broker_name, broker_commission_percentage, broker_commission_amount,
                total_paid_amount, remaining_amount, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 0, $8, $12)
            RETURNING {INVOICE_COLUMNS}
            "#,
        ))
        .bind(input.kind.as_str())
        .bind(input.party_id)
        .bind(&party.1)
        .bind(input.invoice_date)
        .bind(input.due_date)
        .bind(input.labour_transport_cost)
        .bind(subtotal)
        .bind(total)
        .bind(&input.broker_name)
        .bind(input.broker_commission_percentage)
        .bind(commission)
        .bind(status.as_str())
        .fetch_one(&mut *tx)
        .await?;

        insert_lines(&mut tx, row.id, &lines).await?;

        tx.commit().await?;

        assemble(row, lines, Vec::new())
    }

    /// Edit an invoice. Only the net stock delta between the stored
    /// lines and the new ones is applied, so an unchanged re-submit
    /// moves nothing and replacing a line applies exactly the
    /// difference.
    pub async fn update_invoice(
        &self,
        invoice_id: Uuid,
        input: UpdateInvoiceInput,
    ) -> AppResult<Invoice> {
        validate_header(
            input.invoice_date,
            input.due_date,
            input.labour_transport_cost,
            &input.items,
        )?;

        let mut tx = self.db.begin().await?;

        // Row lock serializes concurrent edits and payments
        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1 FOR UPDATE",
        ))
        .bind(invoice_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Invoice".to_string()))?;

        let kind: PartyKind = row
            .kind
            .parse()
            .map_err(|e: String| AppError::Internal(e))?;

        validate_broker_fields(kind, &input.broker_name, input.broker_commission_percentage)?;

        let original = fetch_lines(&mut tx, invoice_id).await?;
        let lines = resolve_lines(&mut tx, kind, &input.items).await?;

        for movement in stock_movements(kind, &original, &lines) {
            apply_delta_tx(&mut tx, movement.item_id, movement.bucket, &movement.delta).await?;
        }

        sqlx::query("DELETE FROM invoice_items WHERE invoice_id = $1")
            .bind(invoice_id)
            .execute(&mut *tx)
            .await?;
        insert_lines(&mut tx, invoice_id, &lines).await?;

        let subtotal = money::subtotal(lines.iter().map(|l| l.total_price));
        let total = money::invoice_total(subtotal, input.labour_transport_cost);
        let commission = input
            .broker_commission_percentage
            .map(|pct| money::commission_amount(total, pct));

        let total_paid = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE invoice_id = $1",
        )
        .bind(invoice_id)
        .fetch_one(&mut *tx)
        .await?;

        let today = Utc::now().date_naive();
        let status = derive_status(total, total_paid, input.due_date, today);

        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            r#"
            UPDATE invoices
            SET invoice_date = $1, due_date = $2, labour_transport_cost = $3,
                subtotal = $4, total = $5,
                broker_name = $6, broker_commission_percentage = $7,
                broker_commission_amount = $8,
                total_paid_amount = $9, remaining_amount = $5 - $9,
                status = $10, updated_at = now()
            WHERE id = $11
            RETURNING {INVOICE_COLUMNS}
            "#,
        ))
        .bind(input.invoice_date)
        .bind(input.due_date)
        .bind(input.labour_transport_cost)
        .bind(subtotal)
        .bind(total)
        .bind(&input.broker_name)
        .bind(input.broker_commission_percentage)
        .bind(commission)
        .bind(total_paid)
        .bind(status.as_str())
        .bind(invoice_id)
        .fetch_one(&mut *tx)
        .await?;

        let payments = fetch_payments(&mut tx, invoice_id).await?;

        tx.commit().await?;

        assemble(row, lines, payments)
    }

    /// Delete an invoice, reversing its full stock movement. Rejected
    /// with the offending item named when the reversal would drive a
    /// counter negative (stock was consumed elsewhere since posting).
    pub async fn delete_invoice(&self, invoice_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1 FOR UPDATE",
        ))
        .bind(invoice_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Invoice".to_string()))?;

        let kind: PartyKind = row
            .kind
            .parse()
            .map_err(|e: String| AppError::Internal(e))?;

        let lines = fetch_lines(&mut tx, invoice_id).await?;

        for movement in stock_movements(kind, &lines, &[]) {
            apply_delta_tx(&mut tx, movement.item_id, movement.bucket, &movement.delta).await?;
        }

        // Cascades to invoice_items and payments
        sqlx::query("DELETE FROM invoices WHERE id = $1")
            .bind(invoice_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Get an invoice with its lines and payment history, status
    /// re-derived as of today
    pub async fn get_invoice(&self, invoice_id: Uuid) -> AppResult<Invoice> {
        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1",
        ))
        .bind(invoice_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Invoice".to_string()))?;

        let lines = sqlx::query_as::<_, LineRow>(
            r#"
            SELECT item_id, item_name, quantity, gross_weight, net_weight,
                   packaging_cost, unit_price, total_price, storage_type
            FROM invoice_items
            WHERE invoice_id = $1
            ORDER BY position
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(LineRow::into_line)
        .collect::<AppResult<Vec<_>>>()?;

        let payments = crate::services::payment::fetch_payments_pool(&self.db, invoice_id).await?;

        assemble(row, lines, payments)
    }

    /// List invoices with filters and pagination
    pub async fn list_invoices(
        &self,
        filter: InvoiceFilter,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<InvoiceSummary>> {
        let pagination = pagination.normalized();
        let kind = filter.kind.map(|k| k.as_str().to_string());
        let status = filter.status.map(|s| s.as_str().to_string());
        let (from, to) = match filter.date_range {
            Some(range) => (Some(range.start), Some(range.end)),
            None => (None, None),
        };

        let total = sqlx::query_scalar::<_, i64>(&format!(
            r#"
            SELECT COUNT(*) FROM invoices
            WHERE ($1::text IS NULL OR kind = $1)
              AND ($2::uuid IS NULL OR party_id = $2)
              AND ($3::text IS NULL OR ({EFFECTIVE_STATUS}) = $3)
              AND ($4::date IS NULL OR invoice_date >= $4)
              AND ($5::date IS NULL OR invoice_date <= $5)
            "#,
        ))
        .bind(&kind)
        .bind(filter.party_id)
        .bind(&status)
        .bind(from)
        .bind(to)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, InvoiceRow>(&format!(
            r#"
            SELECT {INVOICE_COLUMNS} FROM invoices
            WHERE ($1::text IS NULL OR kind = $1)
              AND ($2::uuid IS NULL OR party_id = $2)
              AND ($3::text IS NULL OR ({EFFECTIVE_STATUS}) = $3)
              AND ($4::date IS NULL OR invoice_date >= $4)
              AND ($5::date IS NULL OR invoice_date <= $5)
            ORDER BY invoice_number DESC
            LIMIT $6 OFFSET $7
            "#,
        ))
        .bind(&kind)
        .bind(filter.party_id)
        .bind(&status)
        .bind(from)
        .bind(to)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let today = Utc::now().date_naive();
        let data = rows
            .into_iter()
            .map(|row| {
                let kind: PartyKind = row
                    .kind
                    .parse()
                    .map_err(|e: String| AppError::Internal(e))?;
                Ok(InvoiceSummary {
                    id: row.id,
                    invoice_number: row.invoice_number,
                    kind,
                    party_id: row.party_id,
                    party_name: row.party_name,
                    invoice_date: row.invoice_date,
                    due_date: row.due_date,
                    total: row.total,
                    total_paid_amount: row.total_paid_amount,
                    remaining_amount: row.remaining_amount,
                    status: derive_status(row.total, row.total_paid_amount, row.due_date, today),
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse {
            data,
            pagination: PaginationMeta::new(pagination, total as u64),
        })
    }
}

/// Header-level validation shared by create and edit
fn validate_header(
    invoice_date: NaiveDate,
    due_date: Option<NaiveDate>,
    labour_transport_cost: Decimal,
    items: &[LineItemInput],
) -> AppResult<()> {
    if let Some(due) = due_date {
        validation::validate_due_date(invoice_date, due)
            .map_err(|e| AppError::InvalidDateRange(e.to_string()))?;
    }
    if validation::validate_non_negative(labour_transport_cost).is_err() {
        return Err(AppError::Validation {
            field: "labour_transport_cost".to_string(),
            message: "Labour/transport cost cannot be negative".to_string(),
        });
    }
    if items.is_empty() {
        return Err(AppError::Validation {
            field: "items".to_string(),
            message: "An invoice needs at least one line item".to_string(),
        });
    }
    Ok(())
}

/// Broker commission fields only make sense on customer invoices
fn validate_broker_fields(
    kind: PartyKind,
    broker_name: &Option<String>,
    percentage: Option<Decimal>,
) -> AppResult<()> {
    if (broker_name.is_some() || percentage.is_some()) && kind != PartyKind::Customer {
        return Err(AppError::Validation {
            field: "broker_name".to_string(),
            message: "Broker commission applies to customer invoices only".to_string(),
        });
    }
    if let Some(pct) = percentage {
        validation::validate_percentage(pct).map_err(|e| AppError::Validation {
            field: "broker_commission_percentage".to_string(),
            message: e.to_string(),
        })?;
    }
    Ok(())
}

/// Turn raw line inputs into reconciled lines: referenced items are
/// checked to exist, names default to the item's canonical name, and
/// the line total is computed fresh
async fn resolve_lines(
    tx: &mut Transaction<'_, Postgres>,
    kind: PartyKind,
    inputs: &[LineItemInput],
) -> AppResult<Vec<LineItem>> {
    let mut lines = Vec::with_capacity(inputs.len());
    for input in inputs {
        for (field, amount) in [
            ("quantity", input.quantity),
            ("gross_weight", input.gross_weight),
            ("net_weight", input.net_weight),
            ("packaging_cost", input.packaging_cost),
            ("unit_price", input.unit_price),
        ] {
            if validation::validate_non_negative(amount).is_err() {
                return Err(AppError::Validation {
                    field: field.to_string(),
                    message: "Line item amounts cannot be negative".to_string(),
                });
            }
        }

        if input.storage_type.is_some() && kind != PartyKind::Vendor {
            return Err(AppError::Validation {
                field: "storage_type".to_string(),
                message: "Storage type applies to vendor invoices only".to_string(),
            });
        }

        let item_name = match input.item_id {
            Some(item_id) => {
                let canonical = sqlx::query_scalar::<_, String>(
                    "SELECT item_name FROM items WHERE id = $1",
                )
                .bind(item_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Item".to_string()))?;
                input.item_name.clone().unwrap_or(canonical)
            }
            None => {
                let name = input.item_name.clone().unwrap_or_default();
                if name.trim().is_empty() {
                    return Err(AppError::Validation {
                        field: "item_name".to_string(),
                        message: "Free-text lines need an item name".to_string(),
                    });
                }
                name
            }
        };

        let total_price = money::line_total(
            input.quantity,
            input.packaging_cost,
            input.net_weight,
            input.unit_price,
        );

        lines.push(LineItem {
            item_id: input.item_id,
            item_name,
            quantity: input.quantity,
            gross_weight: input.gross_weight,
            net_weight: input.net_weight,
            packaging_cost: input.packaging_cost,
            unit_price: input.unit_price,
            total_price,
            storage_type: input.storage_type,
        });
    }
    Ok(lines)
}

async fn fetch_lines(
    tx: &mut Transaction<'_, Postgres>,
    invoice_id: Uuid,
) -> AppResult<Vec<LineItem>> {
    sqlx::query_as::<_, LineRow>(
        r#"
        SELECT item_id, item_name, quantity, gross_weight, net_weight,
               packaging_cost, unit_price, total_price, storage_type
        FROM invoice_items
        WHERE invoice_id = $1
        ORDER BY position
        "#,
    )
    .bind(invoice_id)
    .fetch_all(&mut **tx)
    .await?
    .into_iter()
    .map(LineRow::into_line)
    .collect()
}

async fn insert_lines(
    tx: &mut Transaction<'_, Postgres>,
    invoice_id: Uuid,
    lines: &[LineItem],
) -> AppResult<()> {
    for (position, line) in lines.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO invoice_items (
                invoice_id, item_id, item_name, quantity, gross_weight,
                net_weight, packaging_cost, unit_price, total_price,
                storage_type, position
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(invoice_id)
        .bind(line.item_id)
        .bind(&line.item_name)
        .bind(line.quantity)
        .bind(line.gross_weight)
        .bind(line.net_weight)
        .bind(line.packaging_cost)
        .bind(line.unit_price)
        .bind(line.total_price)
        .bind(line.storage_type.map(|b| b.as_str()))
        .bind(position as i32)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Build the outward invoice document, re-deriving status as of today
fn assemble(
    row: InvoiceRow,
    items: Vec<LineItem>,
    payments: Vec<shared::models::Payment>,
) -> AppResult<Invoice> {
    let today = Utc::now().date_naive();
    let kind = row
        .kind
        .parse()
        .map_err(|e: String| AppError::Internal(e))?;
    let status = derive_status(row.total, row.total_paid_amount, row.due_date, today);
    Ok(Invoice {
        id: row.id,
        invoice_number: row.invoice_number,
        kind,
        party_id: row.party_id,
        party_name: row.party_name,
        invoice_date: row.invoice_date,
        due_date: row.due_date,
        items,
        labour_transport_cost: row.labour_transport_cost,
        subtotal: row.subtotal,
        total: row.total,
        broker_name: row.broker_name,
        broker_commission_percentage: row.broker_commission_percentage,
        broker_commission_amount: row.broker_commission_amount,
        payments,
        total_paid_amount: row.total_paid_amount,
        remaining_amount: row.remaining_amount,
        status,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}
