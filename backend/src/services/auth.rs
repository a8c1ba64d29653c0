//! Authentication: login and token refresh
//!
//! Tokens carry the user's role and permission keys so that route
//! guards never need a database round trip. Permission changes take
//! effect on the next login or refresh.

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::Claims;
use crate::services::user::{fetch_permission_keys, fetch_user, UserRow};
use shared::models::User;

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    config: Arc<Config>,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

/// Refresh request
#[derive(Debug, Deserialize)]
pub struct RefreshInput {
    pub refresh_token: String,
}

/// Token pair handed out on login and refresh
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: User,
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: Arc<Config>) -> Self {
        Self { db, config }
    }

    /// Verify credentials and mint a token pair
    pub async fn login(&self, input: LoginInput) -> AppResult<TokenResponse> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, fullname, password_hash, role, is_active,
                   created_at, updated_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(input.username.trim())
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        if !row.is_active {
            return Err(AppError::InvalidCredentials);
        }

        let valid = bcrypt::verify(&input.password, &row.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        let permissions = fetch_permission_keys(&self.db, row.id).await?;
        let user = row.into_user(permissions)?;

        self.issue_tokens(user)
    }

    /// Exchange a refresh token for a fresh pair. The user is reloaded
    /// so deactivations and permission changes are picked up here.
    pub async fn refresh(&self, input: RefreshInput) -> AppResult<TokenResponse> {
        let claims = decode::<Claims>(
            &input.refresh_token,
            &DecodingKey::from_secret(self.config.jwt.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
            _ => AppError::InvalidToken,
        })?
        .claims;

        let user_id =
            Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;

        let user = fetch_user(&self.db, user_id).await?;
        if !user.is_active {
            return Err(AppError::InvalidCredentials);
        }

        self.issue_tokens(user)
    }

    fn issue_tokens(&self, user: User) -> AppResult<TokenResponse> {
        let access_token = self.mint_token(&user, self.config.jwt.access_token_expiry)?;
        let refresh_token = self.mint_token(&user, self.config.jwt.refresh_token_expiry)?;

        Ok(TokenResponse {
            access_token,
            refresh_token,
            token_type: "Bearer",
            expires_in: self.config.jwt.access_token_expiry,
            user,
        })
    }

    fn mint_token(&self, user: &User, expiry_seconds: i64) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role.as_str().to_string(),
            permissions: user.permissions.clone(),
            exp: now + expiry_seconds,
            iat: now,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt.secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }
}
