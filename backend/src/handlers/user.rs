//! User administration endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::{require_access, PageQuery};
use crate::middleware::CurrentUser;
use crate::services::user::{
    CreateUserInput, UpdatePermissionsInput, UpdateUserInput, UserService,
};
use crate::AppState;
use shared::models::{Section, User};
use shared::types::PaginatedResponse;

/// Create a user account
pub async fn create_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateUserInput>,
) -> AppResult<Json<User>> {
    require_access(&user, Section::Users, None)?;
    let service = UserService::new(state.db);
    let created = service.create_user(input).await?;
    Ok(Json(created))
}

/// Get one user
pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<User>> {
    require_access(&user, Section::Users, None)?;
    let service = UserService::new(state.db);
    let found = service.get_user(user_id).await?;
    Ok(Json(found))
}

/// List users
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PaginatedResponse<User>>> {
    require_access(&user, Section::Users, None)?;
    let service = UserService::new(state.db);
    let users = service.list_users(query.pagination()).await?;
    Ok(Json(users))
}

/// Update a user's account details
pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(input): Json<UpdateUserInput>,
) -> AppResult<Json<User>> {
    require_access(&user, Section::Users, None)?;
    let service = UserService::new(state.db);
    let updated = service.update_user(user_id, input).await?;
    Ok(Json(updated))
}

/// Apply grant/revoke lists to a worker's permissions
pub async fn update_permissions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(input): Json<UpdatePermissionsInput>,
) -> AppResult<Json<User>> {
    require_access(&user, Section::Users, None)?;
    let service = UserService::new(state.db);
    let updated = service.update_permissions(user_id, input).await?;
    Ok(Json(updated))
}

/// Delete a user
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    require_access(&user, Section::Users, None)?;
    let service = UserService::new(state.db);
    service.delete_user(user_id).await?;
    Ok(Json(()))
}
