//! Manual cash-balance ledger service

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::models::{BalanceEntry, BalanceEntryType};
use shared::types::{DateRange, PaginatedResponse, Pagination, PaginationMeta};
use shared::validation;

/// Balance ledger service
#[derive(Clone)]
pub struct BalanceService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct BalanceRow {
    id: Uuid,
    amount: Decimal,
    entry_date: NaiveDate,
    remarks: String,
    entry_type: String,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

impl BalanceRow {
    fn into_entry(self) -> AppResult<BalanceEntry> {
        let entry_type: BalanceEntryType = self
            .entry_type
            .parse()
            .map_err(|e: String| AppError::Internal(e))?;
        Ok(BalanceEntry {
            id: self.id,
            amount: self.amount,
            entry_date: self.entry_date,
            remarks: self.remarks,
            entry_type,
            created_by: self.created_by,
            created_at: self.created_at,
        })
    }
}

/// Input for recording a ledger entry
#[derive(Debug, Deserialize)]
pub struct CreateBalanceEntryInput {
    pub amount: Decimal,
    pub entry_date: NaiveDate,
    pub remarks: String,
    pub entry_type: BalanceEntryType,
}

/// Listing filters for the ledger
#[derive(Debug, Default, Deserialize)]
pub struct BalanceFilter {
    pub date_range: Option<DateRange>,
    pub search: Option<String>,
}

const BALANCE_COLUMNS: &str =
    "id, amount, entry_date, remarks, entry_type, created_by, created_at";

impl BalanceService {
    /// Create a new BalanceService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a ledger entry. The amount is always positive; the
    /// direction lives in the entry type.
    pub async fn add_entry(
        &self,
        input: CreateBalanceEntryInput,
        created_by: Uuid,
    ) -> AppResult<BalanceEntry> {
        if input.amount <= Decimal::ZERO {
            return Err(AppError::Validation {
                field: "amount".to_string(),
                message: "Amount must be positive".to_string(),
            });
        }
        validation::validate_remarks(&input.remarks).map_err(|e| AppError::Validation {
            field: "remarks".to_string(),
            message: e.to_string(),
        })?;

        let row = sqlx::query_as::<_, BalanceRow>(&format!(
            r#"
            INSERT INTO balance_entries (amount, entry_date, remarks, entry_type, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {BALANCE_COLUMNS}
            "#,
        ))
        .bind(input.amount)
        .bind(input.entry_date)
        .bind(input.remarks.trim())
        .bind(input.entry_type.as_str())
        .bind(created_by)
        .fetch_one(&self.db)
        .await?;

        row.into_entry()
    }

    /// List ledger entries, newest first
    pub async fn list_entries(
        &self,
        filter: BalanceFilter,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<BalanceEntry>> {
        let pagination = pagination.normalized();
        let (from, to) = match filter.date_range {
            Some(range) => (Some(range.start), Some(range.end)),
            None => (None, None),
        };
        let pattern = filter.search.map(|s| format!("%{}%", s));

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM balance_entries
            WHERE ($1::date IS NULL OR entry_date >= $1)
              AND ($2::date IS NULL OR entry_date <= $2)
              AND ($3::text IS NULL OR remarks ILIKE $3)
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(&pattern)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, BalanceRow>(&format!(
            r#"
            SELECT {BALANCE_COLUMNS} FROM balance_entries
            WHERE ($1::date IS NULL OR entry_date >= $1)
              AND ($2::date IS NULL OR entry_date <= $2)
              AND ($3::text IS NULL OR remarks ILIKE $3)
            ORDER BY entry_date DESC, created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        ))
        .bind(from)
        .bind(to)
        .bind(&pattern)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let data = rows
            .into_iter()
            .map(BalanceRow::into_entry)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse {
            data,
            pagination: PaginationMeta::new(pagination, total as u64),
        })
    }

    /// Net balance across the whole ledger
    pub async fn total_balance(&self) -> AppResult<Decimal> {
        let total = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(
                CASE entry_type WHEN 'addition' THEN amount ELSE -amount END
            ), 0)
            FROM balance_entries
            "#,
        )
        .fetch_one(&self.db)
        .await?;
        Ok(total)
    }
}
