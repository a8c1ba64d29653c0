//! Cash-balance ledger endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::handlers::require_access;
use crate::middleware::CurrentUser;
use crate::services::balance::{BalanceFilter, BalanceService, CreateBalanceEntryInput};
use crate::AppState;
use shared::models::{BalanceEntry, Section};
use shared::types::{DateRange, PaginatedResponse, Pagination};

#[derive(Debug, Default, Deserialize)]
pub struct BalanceListQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct TotalBalanceResponse {
    pub total_balance: Decimal,
}

/// Record a ledger entry
pub async fn add_entry(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateBalanceEntryInput>,
) -> AppResult<Json<BalanceEntry>> {
    require_access(&user, Section::Balance, None)?;
    let service = BalanceService::new(state.db);
    let entry = service.add_entry(input, user.user_id).await?;
    Ok(Json(entry))
}

/// List ledger entries
pub async fn list_entries(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<BalanceListQuery>,
) -> AppResult<Json<PaginatedResponse<BalanceEntry>>> {
    require_access(&user, Section::Balance, None)?;

    let date_range = match (query.from, query.to) {
        (Some(start), Some(end)) => {
            if start > end {
                return Err(AppError::InvalidDateRange(
                    "'from' must not be after 'to'".to_string(),
                ));
            }
            Some(DateRange { start, end })
        }
        (None, None) => None,
        _ => {
            return Err(AppError::InvalidDateRange(
                "Both 'from' and 'to' are required for date filtering".to_string(),
            ))
        }
    };

    let service = BalanceService::new(state.db);
    let pagination = Pagination {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    };
    let entries = service
        .list_entries(
            BalanceFilter {
                date_range,
                search: query.search,
            },
            pagination,
        )
        .await?;
    Ok(Json(entries))
}

/// Net balance across the whole ledger
pub async fn total_balance(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<TotalBalanceResponse>> {
    require_access(&user, Section::Balance, None)?;
    let service = BalanceService::new(state.db);
    let total_balance = service.total_balance().await?;
    Ok(Json(TotalBalanceResponse { total_balance }))
}
