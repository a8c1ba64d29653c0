//! Authentication endpoints

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::services::auth::{AuthService, LoginInput, RefreshInput, TokenResponse};
use crate::AppState;

/// Log in with username and password
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> AppResult<Json<TokenResponse>> {
    let service = AuthService::new(state.db, state.config);
    let tokens = service.login(input).await?;
    Ok(Json(tokens))
}

/// Exchange a refresh token for a new token pair
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshInput>,
) -> AppResult<Json<TokenResponse>> {
    let service = AuthService::new(state.db, state.config);
    let tokens = service.refresh(input).await?;
    Ok(Json(tokens))
}
