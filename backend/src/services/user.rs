//! User accounts and worker permission management
//!
//! Admin accounts carry no stored permission rows; the role implies
//! everything. Worker grants are stored as dotted capability keys and
//! always pass through `PermissionSet`, so revoking a section clears
//! its child grants in one step.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::models::{Capability, PermissionSet, Role, User};
use shared::types::{PaginatedResponse, Pagination, PaginationMeta};
use shared::validation;

/// User management service
#[derive(Clone)]
pub struct UserService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub fullname: String,
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    pub(crate) fn into_user(self, permissions: Vec<String>) -> AppResult<User> {
        let role: Role = self
            .role
            .parse()
            .map_err(|e: String| AppError::Internal(e))?;
        Ok(User {
            id: self.id,
            username: self.username,
            fullname: self.fullname,
            role,
            permissions,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const USER_COLUMNS: &str =
    "id, username, fullname, password_hash, role, is_active, created_at, updated_at";

/// Input for creating a user
#[derive(Debug, Deserialize)]
pub struct CreateUserInput {
    pub username: String,
    pub fullname: String,
    pub password: String,
    pub role: Role,
    /// Dotted capability keys, workers only
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Input for updating a user's account details
#[derive(Debug, Deserialize)]
pub struct UpdateUserInput {
    pub fullname: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

/// Grant/revoke lists applied to a worker's permission set
#[derive(Debug, Deserialize)]
pub struct UpdatePermissionsInput {
    #[serde(default)]
    pub grant: Vec<String>,
    #[serde(default)]
    pub revoke: Vec<String>,
}

impl UserService {
    /// Create a new UserService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a user account
    pub async fn create_user(&self, input: CreateUserInput) -> AppResult<User> {
        validation::validate_username(&input.username).map_err(|e| AppError::Validation {
            field: "username".to_string(),
            message: e.to_string(),
        })?;
        validation::validate_password(&input.password).map_err(|e| AppError::Validation {
            field: "password".to_string(),
            message: e.to_string(),
        })?;
        if input.fullname.trim().is_empty() {
            return Err(AppError::Validation {
                field: "fullname".to_string(),
                message: "Full name is required".to_string(),
            });
        }
        if input.role == Role::Admin && !input.permissions.is_empty() {
            return Err(AppError::Validation {
                field: "permissions".to_string(),
                message: "Admin accounts hold every permission implicitly".to_string(),
            });
        }

        let permissions =
            PermissionSet::from_keys(&input.permissions).map_err(|e| AppError::Validation {
                field: "permissions".to_string(),
                message: e,
            })?;

        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE username = $1",
        )
        .bind(&input.username)
        .fetch_one(&self.db)
        .await?;
        if existing > 0 {
            return Err(AppError::DuplicateEntry(format!(
                "Username '{}' is already taken",
                input.username
            )));
        }

        let password_hash = bcrypt::hash(&input.password, bcrypt::DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (username, fullname, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(&input.username)
        .bind(input.fullname.trim())
        .bind(&password_hash)
        .bind(input.role.as_str())
        .fetch_one(&mut *tx)
        .await?;

        let keys = permissions.keys();
        for key in &keys {
            sqlx::query("INSERT INTO user_permissions (user_id, permission_key) VALUES ($1, $2)")
                .bind(row.id)
                .bind(key)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        row.into_user(keys)
    }

    /// Get a user by id
    pub async fn get_user(&self, user_id: Uuid) -> AppResult<User> {
        fetch_user(&self.db, user_id).await
    }

    /// List users with pagination
    pub async fn list_users(&self, pagination: Pagination) -> AppResult<PaginatedResponse<User>> {
        let pagination = pagination.normalized();

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;

        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY username LIMIT $1 OFFSET $2",
        ))
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let mut data = Vec::with_capacity(rows.len());
        for row in rows {
            let permissions = fetch_permission_keys(&self.db, row.id).await?;
            data.push(row.into_user(permissions)?);
        }

        Ok(PaginatedResponse {
            data,
            pagination: PaginationMeta::new(pagination, total as u64),
        })
    }

    /// Update account details. Deactivating the last active admin is
    /// rejected.
    pub async fn update_user(&self, user_id: Uuid, input: UpdateUserInput) -> AppResult<User> {
        let current = fetch_user(&self.db, user_id).await?;

        if input.is_active == Some(false)
            && current.role == Role::Admin
            && current.is_active
            && self.active_admin_count().await? <= 1
        {
            return Err(AppError::Conflict {
                resource: "user".to_string(),
                message: "Cannot deactivate the last active admin".to_string(),
            });
        }

        let fullname = match input.fullname {
            Some(name) => {
                if name.trim().is_empty() {
                    return Err(AppError::Validation {
                        field: "fullname".to_string(),
                        message: "Full name is required".to_string(),
                    });
                }
                name.trim().to_string()
            }
            None => current.fullname.clone(),
        };

        let password_hash = match input.password {
            Some(password) => {
                validation::validate_password(&password).map_err(|e| AppError::Validation {
                    field: "password".to_string(),
                    message: e.to_string(),
                })?;
                Some(
                    bcrypt::hash(&password, bcrypt::DEFAULT_COST).map_err(|e| {
                        AppError::Internal(format!("Password hashing failed: {}", e))
                    })?,
                )
            }
            None => None,
        };

        let is_active = input.is_active.unwrap_or(current.is_active);

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET fullname = $1,
                password_hash = COALESCE($2, password_hash),
                is_active = $3,
                updated_at = now()
            WHERE id = $4
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(&fullname)
        .bind(&password_hash)
        .bind(is_active)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        let permissions = fetch_permission_keys(&self.db, user_id).await?;
        row.into_user(permissions)
    }

    /// Apply grant/revoke lists to a worker's permission set and return
    /// the updated user
    pub async fn update_permissions(
        &self,
        user_id: Uuid,
        input: UpdatePermissionsInput,
    ) -> AppResult<User> {
        let current = fetch_user(&self.db, user_id).await?;
        if current.role == Role::Admin {
            return Err(AppError::Validation {
                field: "permissions".to_string(),
                message: "Admin accounts hold every permission implicitly".to_string(),
            });
        }

        let mut set =
            PermissionSet::from_keys(&current.permissions).map_err(AppError::Internal)?;
        for key in &input.grant {
            let capability = Capability::parse(key).map_err(|e| AppError::Validation {
                field: "grant".to_string(),
                message: e,
            })?;
            set.grant(capability);
        }
        for key in &input.revoke {
            let capability = Capability::parse(key).map_err(|e| AppError::Validation {
                field: "revoke".to_string(),
                message: e,
            })?;
            set.revoke(capability);
        }

        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM user_permissions WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        let keys = set.keys();
        for key in &keys {
            sqlx::query("INSERT INTO user_permissions (user_id, permission_key) VALUES ($1, $2)")
                .bind(user_id)
                .bind(key)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        Ok(User {
            permissions: keys,
            ..current
        })
    }

    /// Delete a user. The last active admin and users referenced by the
    /// balance ledger cannot be removed.
    pub async fn delete_user(&self, user_id: Uuid) -> AppResult<()> {
        let current = fetch_user(&self.db, user_id).await?;

        if current.role == Role::Admin
            && current.is_active
            && self.active_admin_count().await? <= 1
        {
            return Err(AppError::Conflict {
                resource: "user".to_string(),
                message: "Cannot delete the last active admin".to_string(),
            });
        }

        let ledger_entries = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM balance_entries WHERE created_by = $1",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;
        if ledger_entries > 0 {
            return Err(AppError::Conflict {
                resource: "user".to_string(),
                message: format!(
                    "Cannot delete user: {} balance entries reference it",
                    ledger_entries
                ),
            });
        }

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn active_admin_count(&self) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE role = 'admin' AND is_active",
        )
        .fetch_one(&self.db)
        .await?;
        Ok(count)
    }
}

pub(crate) async fn fetch_user(db: &PgPool, user_id: Uuid) -> AppResult<User> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1",
    ))
    .bind(user_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::NotFound("User".to_string()))?;

    let permissions = fetch_permission_keys(db, user_id).await?;
    row.into_user(permissions)
}

pub(crate) async fn fetch_permission_keys(db: &PgPool, user_id: Uuid) -> AppResult<Vec<String>> {
    let keys = sqlx::query_scalar::<_, String>(
        "SELECT permission_key FROM user_permissions WHERE user_id = $1 ORDER BY permission_key",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(keys)
}
