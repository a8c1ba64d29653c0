//! Dashboard endpoints

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::handlers::require_access;
use crate::middleware::CurrentUser;
use crate::services::report::{DashboardSummary, ReportService};
use crate::AppState;
use shared::models::Section;

/// Dashboard summary figures
pub async fn dashboard_summary(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<DashboardSummary>> {
    require_access(&user, Section::Dashboard, None)?;
    let service = ReportService::new(state.db);
    let summary = service.dashboard_summary().await?;
    Ok(Json(summary))
}
