//! Counterparty service: vendors, customers, brokers, commissioners

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::models::{Party, PartyKind};
use shared::types::{PaginatedResponse, Pagination, PaginationMeta};

/// Party service for counterparty records
#[derive(Clone)]
pub struct PartyService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct PartyRow {
    id: Uuid,
    kind: String,
    name: String,
    phone: Option<String>,
    address: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PartyRow {
    fn into_party(self) -> AppResult<Party> {
        let kind: PartyKind = self
            .kind
            .parse()
            .map_err(|e: String| AppError::Internal(e))?;
        Ok(Party {
            id: self.id,
            kind,
            name: self.name,
            phone: self.phone,
            address: self.address,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Input for creating a party
#[derive(Debug, Deserialize)]
pub struct CreatePartyInput {
    pub kind: PartyKind,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Input for updating a party (kind is immutable)
#[derive(Debug, Deserialize)]
pub struct UpdatePartyInput {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl PartyService {
    /// Create a new PartyService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a counterparty
    pub async fn create_party(&self, input: CreatePartyInput) -> AppResult<Party> {
        if input.name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Party name is required".to_string(),
            });
        }

        let row = sqlx::query_as::<_, PartyRow>(
            r#"
            INSERT INTO parties (kind, name, phone, address)
            VALUES ($1, $2, $3, $4)
            RETURNING id, kind, name, phone, address, created_at, updated_at
            "#,
        )
        .bind(input.kind.as_str())
        .bind(input.name.trim())
        .bind(&input.phone)
        .bind(&input.address)
        .fetch_one(&self.db)
        .await?;

        row.into_party()
    }

    /// Get a party by id
    pub async fn get_party(&self, party_id: Uuid) -> AppResult<Party> {
        let row = sqlx::query_as::<_, PartyRow>(
            "SELECT id, kind, name, phone, address, created_at, updated_at FROM parties WHERE id = $1",
        )
        .bind(party_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Party".to_string()))?;

        row.into_party()
    }

    /// List parties of one kind, optionally filtered by name substring
    pub async fn list_parties(
        &self,
        kind: Option<PartyKind>,
        search: Option<String>,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<Party>> {
        let pagination = pagination.normalized();
        let kind_str = kind.map(|k| k.as_str().to_string());
        let pattern = search.map(|s| format!("%{}%", s));

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM parties
            WHERE ($1::text IS NULL OR kind = $1)
              AND ($2::text IS NULL OR name ILIKE $2)
            "#,
        )
        .bind(&kind_str)
        .bind(&pattern)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, PartyRow>(
            r#"
            SELECT id, kind, name, phone, address, created_at, updated_at
            FROM parties
            WHERE ($1::text IS NULL OR kind = $1)
              AND ($2::text IS NULL OR name ILIKE $2)
            ORDER BY name
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(&kind_str)
        .bind(&pattern)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let data = rows
            .into_iter()
            .map(PartyRow::into_party)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse {
            data,
            pagination: PaginationMeta::new(pagination, total as u64),
        })
    }

    /// Update a party's contact details
    pub async fn update_party(&self, party_id: Uuid, input: UpdatePartyInput) -> AppResult<Party> {
        let current = self.get_party(party_id).await?;

        let name = input.name.unwrap_or(current.name);
        if name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Party name is required".to_string(),
            });
        }
        let phone = input.phone.or(current.phone);
        let address = input.address.or(current.address);

        let row = sqlx::query_as::<_, PartyRow>(
            r#"
            UPDATE parties
            SET name = $1, phone = $2, address = $3, updated_at = now()
            WHERE id = $4
            RETURNING id, kind, name, phone, address, created_at, updated_at
            "#,
        )
        .bind(name.trim())
        .bind(&phone)
        .bind(&address)
        .bind(party_id)
        .fetch_one(&self.db)
        .await?;

        row.into_party()
    }

    /// Delete a party. Rejected while invoices reference it.
    pub async fn delete_party(&self, party_id: Uuid) -> AppResult<()> {
        let invoices = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM invoices WHERE party_id = $1",
        )
        .bind(party_id)
        .fetch_one(&self.db)
        .await?;

        if invoices > 0 {
            return Err(AppError::Conflict {
                resource: "party".to_string(),
                message: format!("Cannot delete party: {} invoices reference it", invoices),
            });
        }

        let result = sqlx::query("DELETE FROM parties WHERE id = $1")
            .bind(party_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Party".to_string()));
        }

        Ok(())
    }
}
