//! Stock item service: CRUD, delta application, and shop/cold transfers
//!
//! All counter mutations run through guarded UPDATEs whose WHERE clause
//! re-checks non-negativity, so a concurrent writer can never drive a
//! counter below zero; the database CHECK constraints are the last line
//! of defence behind that.

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::models::Item;
use shared::stock::{StockBucket, StockDelta};
use shared::types::{PaginatedResponse, Pagination, PaginationMeta};
use shared::validation;

/// Item service for stock tracking across shop and cold storage
#[derive(Clone)]
pub struct ItemService {
    db: PgPool,
}

/// Database row for an item
#[derive(Debug, FromRow)]
pub struct ItemRow {
    pub id: Uuid,
    pub item_number: i64,
    pub item_name: String,
    pub shop_quantity: Decimal,
    pub shop_net_weight: Decimal,
    pub shop_gross_weight: Decimal,
    pub cold_quantity: Decimal,
    pub cold_net_weight: Decimal,
    pub cold_gross_weight: Decimal,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Item {
            id: row.id,
            item_number: row.item_number,
            item_name: row.item_name,
            shop_quantity: row.shop_quantity,
            shop_net_weight: row.shop_net_weight,
            shop_gross_weight: row.shop_gross_weight,
            cold_quantity: row.cold_quantity,
            cold_net_weight: row.cold_net_weight,
            cold_gross_weight: row.cold_gross_weight,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const ITEM_COLUMNS: &str = "id, item_number, item_name, \
     shop_quantity, shop_net_weight, shop_gross_weight, \
     cold_quantity, cold_net_weight, cold_gross_weight, \
     created_at, updated_at";

/// Input for creating an item, optionally with opening stock
#[derive(Debug, Deserialize)]
pub struct CreateItemInput {
    pub item_number: i64,
    pub item_name: String,
    #[serde(default)]
    pub shop_quantity: Decimal,
    #[serde(default)]
    pub shop_net_weight: Decimal,
    #[serde(default)]
    pub shop_gross_weight: Decimal,
    #[serde(default)]
    pub cold_quantity: Decimal,
    #[serde(default)]
    pub cold_net_weight: Decimal,
    #[serde(default)]
    pub cold_gross_weight: Decimal,
}

/// Input for updating item identity (counters move only via invoices
/// and transfers)
#[derive(Debug, Deserialize)]
pub struct UpdateItemInput {
    pub item_number: Option<i64>,
    pub item_name: Option<String>,
}

/// Input for a shop/cold transfer
#[derive(Debug, Deserialize)]
pub struct TransferInput {
    pub from: StockBucket,
    pub to: StockBucket,
    pub quantity: Decimal,
    pub net_weight: Decimal,
    pub gross_weight: Decimal,
}

impl ItemService {
    /// Create a new ItemService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create an item
    pub async fn create_item(&self, input: CreateItemInput) -> AppResult<Item> {
        if input.item_name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "item_name".to_string(),
                message: "Item name is required".to_string(),
            });
        }
        for (field, amount) in [
            ("shop_quantity", input.shop_quantity),
            ("shop_net_weight", input.shop_net_weight),
            ("shop_gross_weight", input.shop_gross_weight),
            ("cold_quantity", input.cold_quantity),
            ("cold_net_weight", input.cold_net_weight),
            ("cold_gross_weight", input.cold_gross_weight),
        ] {
            if validation::validate_non_negative(amount).is_err() {
                return Err(AppError::Validation {
                    field: field.to_string(),
                    message: "Opening stock cannot be negative".to_string(),
                });
            }
        }

        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM items WHERE item_number = $1",
        )
        .bind(input.item_number)
        .fetch_one(&self.db)
        .await?;

        if existing > 0 {
            return Err(AppError::DuplicateEntry("item_number".to_string()));
        }

        let row = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            INSERT INTO items (
                item_number, item_name,
                shop_quantity, shop_net_weight, shop_gross_weight,
                cold_quantity, cold_net_weight, cold_gross_weight
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ITEM_COLUMNS}
            "#,
        ))
        .bind(input.item_number)
        .bind(input.item_name.trim())
        .bind(input.shop_quantity)
        .bind(input.shop_net_weight)
        .bind(input.shop_gross_weight)
        .bind(input.cold_quantity)
        .bind(input.cold_net_weight)
        .bind(input.cold_gross_weight)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Get an item by id
    pub async fn get_item(&self, item_id: Uuid) -> AppResult<Item> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id = $1",
        ))
        .bind(item_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Item".to_string()))?;

        Ok(row.into())
    }

    /// List items, optionally filtered by a name substring
    pub async fn list_items(
        &self,
        search: Option<String>,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<Item>> {
        let pagination = pagination.normalized();
        let pattern = search.map(|s| format!("%{}%", s));

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM items WHERE ($1::text IS NULL OR item_name ILIKE $1)",
        )
        .bind(&pattern)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM items
            WHERE ($1::text IS NULL OR item_name ILIKE $1)
            ORDER BY item_number
            LIMIT $2 OFFSET $3
            "#,
        ))
        .bind(&pattern)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse {
            data: rows.into_iter().map(Item::from).collect(),
            pagination: PaginationMeta::new(pagination, total as u64),
        })
    }

    /// Update item identity fields
    pub async fn update_item(&self, item_id: Uuid, input: UpdateItemInput) -> AppResult<Item> {
        let current = self.get_item(item_id).await?;

        let item_number = input.item_number.unwrap_or(current.item_number);
        let item_name = input.item_name.unwrap_or(current.item_name);

        if item_name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "item_name".to_string(),
                message: "Item name is required".to_string(),
            });
        }

        if item_number != current.item_number {
            let duplicate = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM items WHERE item_number = $1 AND id != $2",
            )
            .bind(item_number)
            .bind(item_id)
            .fetch_one(&self.db)
            .await?;

            if duplicate > 0 {
                return Err(AppError::DuplicateEntry("item_number".to_string()));
            }
        }

        let row = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            UPDATE items
            SET item_number = $1, item_name = $2, updated_at = now()
            WHERE id = $3
            RETURNING {ITEM_COLUMNS}
            "#,
        ))
        .bind(item_number)
        .bind(item_name.trim())
        .bind(item_id)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Delete an item. Rejected while any invoice still references it,
    /// because deleting it would orphan the stock history.
    pub async fn delete_item(&self, item_id: Uuid) -> AppResult<()> {
        let references = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM invoice_items WHERE item_id = $1",
        )
        .bind(item_id)
        .fetch_one(&self.db)
        .await?;

        if references > 0 {
            return Err(AppError::Conflict {
                resource: "item".to_string(),
                message: format!(
                    "Cannot delete item: {} invoice lines reference it",
                    references
                ),
            });
        }

        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(item_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Item".to_string()));
        }

        Ok(())
    }

    /// Move stock between shop and cold storage as one atomic operation
    pub async fn transfer(&self, item_id: Uuid, input: TransferInput) -> AppResult<Item> {
        if input.from == input.to {
            return Err(AppError::Validation {
                field: "to".to_string(),
                message: "Transfer source and destination must differ".to_string(),
            });
        }

        let amounts = StockDelta::new(input.quantity, input.net_weight, input.gross_weight);
        if amounts.is_zero() {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: "Transfer amounts must not all be zero".to_string(),
            });
        }
        for (field, amount) in [
            ("quantity", input.quantity),
            ("net_weight", input.net_weight),
            ("gross_weight", input.gross_weight),
        ] {
            if validation::validate_non_negative(amount).is_err() {
                return Err(AppError::Validation {
                    field: field.to_string(),
                    message: "Transfer amounts cannot be negative".to_string(),
                });
            }
        }

        let mut tx = self.db.begin().await?;

        apply_delta_tx(&mut tx, item_id, input.from, &amounts.negated()).await?;
        apply_delta_tx(&mut tx, item_id, input.to, &amounts).await?;

        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id = $1",
        ))
        .bind(item_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row.into())
    }
}

/// Apply a signed delta to one bucket of an item inside an open
/// transaction. The UPDATE's WHERE clause re-checks all three counters,
/// so the mutation is all-or-nothing even against concurrent writers;
/// when it matches no row the item is re-read to distinguish a missing
/// item from a shortfall and to name the offending field.
pub(crate) async fn apply_delta_tx(
    tx: &mut Transaction<'_, Postgres>,
    item_id: Uuid,
    bucket: StockBucket,
    delta: &StockDelta,
) -> AppResult<()> {
    let sql = match bucket {
        StockBucket::Shop => {
            r#"
            UPDATE items
            SET shop_quantity = shop_quantity + $2,
                shop_net_weight = shop_net_weight + $3,
                shop_gross_weight = shop_gross_weight + $4,
                updated_at = now()
            WHERE id = $1
              AND shop_quantity + $2 >= 0
              AND shop_net_weight + $3 >= 0
              AND shop_gross_weight + $4 >= 0
            "#
        }
        StockBucket::Cold => {
            r#"
            UPDATE items
            SET cold_quantity = cold_quantity + $2,
                cold_net_weight = cold_net_weight + $3,
                cold_gross_weight = cold_gross_weight + $4,
                updated_at = now()
            WHERE id = $1
              AND cold_quantity + $2 >= 0
              AND cold_net_weight + $3 >= 0
              AND cold_gross_weight + $4 >= 0
            "#
        }
    };

    let result = sqlx::query(sql)
        .bind(item_id)
        .bind(delta.quantity)
        .bind(delta.net_weight)
        .bind(delta.gross_weight)
        .execute(&mut **tx)
        .await?;

    if result.rows_affected() > 0 {
        return Ok(());
    }

    let row = sqlx::query_as::<_, ItemRow>(&format!(
        "SELECT {ITEM_COLUMNS} FROM items WHERE id = $1",
    ))
    .bind(item_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Item".to_string()))?;

    let item: Item = row.into();
    match item.levels().apply(bucket, delta) {
        Err(shortfall) => Err(AppError::InsufficientStock {
            item_name: item.item_name,
            bucket: shortfall.bucket,
            field: shortfall.field,
            shortfall: shortfall.shortfall,
        }),
        // The guarded UPDATE missed but the re-read says it would fit:
        // a concurrent writer slipped between the two statements.
        Ok(_) => Err(AppError::Conflict {
            resource: "item".to_string(),
            message: "Concurrent stock modification, please retry".to_string(),
        }),
    }
}
