//! Error handling for the Tradebook server
//!
//! Every core operation returns a typed failure that the HTTP layer
//! maps to a status code and a consistent JSON error body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::stock::{StockBucket, StockField};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    // Validation errors
    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Invalid payment amount: {0}")]
    InvalidPaymentAmount(String),

    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Conflict: {message}")]
    Conflict { resource: String, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Insufficient stock: {item_name} would fall {shortfall} short on {field} in {bucket} storage")]
    InsufficientStock {
        item_name: String,
        bucket: StockBucket,
        field: StockField,
        shortfall: Decimal,
    },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDetail {
    fn new(code: &str, message: impl Into<String>, field: Option<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        use StatusCode as S;

        let (status, detail) = match &self {
            AppError::InvalidCredentials => (
                S::UNAUTHORIZED,
                ErrorDetail::new("INVALID_CREDENTIALS", "Invalid username or password", None),
            ),
            AppError::TokenExpired => (
                S::UNAUTHORIZED,
                ErrorDetail::new("TOKEN_EXPIRED", "Token has expired", None),
            ),
            AppError::InvalidToken => (
                S::UNAUTHORIZED,
                ErrorDetail::new("INVALID_TOKEN", "Invalid token", None),
            ),
            AppError::InsufficientPermissions => (
                S::FORBIDDEN,
                ErrorDetail::new(
                    "INSUFFICIENT_PERMISSIONS",
                    "You do not have permission to perform this action",
                    None,
                ),
            ),
            AppError::Validation { field, message } => (
                S::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", message.clone(), Some(field.clone())),
            ),
            AppError::InvalidPaymentAmount(reason) => (
                S::BAD_REQUEST,
                ErrorDetail::new(
                    "INVALID_PAYMENT_AMOUNT",
                    reason.clone(),
                    Some("amount".to_string()),
                ),
            ),
            AppError::InvalidDateRange(reason) => (
                S::BAD_REQUEST,
                ErrorDetail::new(
                    "INVALID_DATE_RANGE",
                    reason.clone(),
                    Some("due_date".to_string()),
                ),
            ),
            AppError::DuplicateEntry(field) => (
                S::CONFLICT,
                ErrorDetail::new(
                    "DUPLICATE_ENTRY",
                    format!("A record with this {field} already exists"),
                    Some(field.clone()),
                ),
            ),
            AppError::Conflict { resource, message } => (
                S::CONFLICT,
                ErrorDetail::new("CONFLICT", message.clone(), Some(resource.clone())),
            ),
            AppError::NotFound(resource) => (
                S::NOT_FOUND,
                ErrorDetail::new("NOT_FOUND", format!("{resource} not found"), None),
            ),
            AppError::InsufficientStock {
                item_name,
                bucket,
                field,
                shortfall,
            } => (
                S::CONFLICT,
                ErrorDetail::new(
                    "INSUFFICIENT_STOCK",
                    format!("{item_name} would fall {shortfall} short on {field} in {bucket} storage"),
                    Some(field.as_str().to_string()),
                ),
            ),
            AppError::Database(_) => (
                S::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("DATABASE_ERROR", "A database error occurred", None),
            ),
            AppError::Internal(msg) => (
                S::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", msg.clone(), None),
            ),
            AppError::InternalError(_) => (
                S::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", "An internal server error occurred", None),
            ),
        };

        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        } else {
            tracing::debug!(error = ?self, "request rejected");
        }

        (status, Json(ErrorResponse { error: detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
