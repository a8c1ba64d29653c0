//! Stock item endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::require_access;
use crate::middleware::CurrentUser;
use crate::services::item::{CreateItemInput, ItemService, TransferInput, UpdateItemInput};
use crate::AppState;
use shared::models::{Item, Section, Subsection};
use shared::types::{PaginatedResponse, Pagination};

#[derive(Debug, Default, Deserialize)]
pub struct ItemListQuery {
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Create a stock item
pub async fn create_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateItemInput>,
) -> AppResult<Json<Item>> {
    require_access(&user, Section::Items, None)?;
    let service = ItemService::new(state.db);
    let item = service.create_item(input).await?;
    Ok(Json(item))
}

/// Get one stock item
pub async fn get_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<Item>> {
    require_access(&user, Section::Items, None)?;
    let service = ItemService::new(state.db);
    let item = service.get_item(item_id).await?;
    Ok(Json(item))
}

/// List stock items
pub async fn list_items(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ItemListQuery>,
) -> AppResult<Json<PaginatedResponse<Item>>> {
    require_access(&user, Section::Items, None)?;
    let service = ItemService::new(state.db);
    let pagination = Pagination {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    };
    let items = service.list_items(query.search, pagination).await?;
    Ok(Json(items))
}

/// Update a stock item
pub async fn update_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(input): Json<UpdateItemInput>,
) -> AppResult<Json<Item>> {
    require_access(&user, Section::Items, None)?;
    let service = ItemService::new(state.db);
    let item = service.update_item(item_id, input).await?;
    Ok(Json(item))
}

/// Delete a stock item
pub async fn delete_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    require_access(&user, Section::Items, None)?;
    let service = ItemService::new(state.db);
    service.delete_item(item_id).await?;
    Ok(Json(()))
}

/// Move stock between the shop and cold buckets of one item
pub async fn transfer_stock(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(input): Json<TransferInput>,
) -> AppResult<Json<Item>> {
    require_access(&user, Section::Items, Some(Subsection::Transfers))?;
    let service = ItemService::new(state.db);
    let item = service.transfer(item_id, input).await?;
    Ok(Json(item))
}
