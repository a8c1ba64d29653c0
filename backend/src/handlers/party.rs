//! Counterparty endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::handlers::{party_section, require_access};
use crate::middleware::CurrentUser;
use crate::services::party::{CreatePartyInput, PartyService, UpdatePartyInput};
use crate::AppState;
use shared::models::{Party, PartyKind, Role};
use shared::types::{PaginatedResponse, Pagination};

#[derive(Debug, Default, Deserialize)]
pub struct PartyListQuery {
    pub kind: Option<PartyKind>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Create a counterparty
pub async fn create_party(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreatePartyInput>,
) -> AppResult<Json<Party>> {
    require_access(&user, party_section(input.kind), None)?;
    let service = PartyService::new(state.db);
    let party = service.create_party(input).await?;
    Ok(Json(party))
}

/// Get one counterparty
pub async fn get_party(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(party_id): Path<Uuid>,
) -> AppResult<Json<Party>> {
    let service = PartyService::new(state.db);
    let party = service.get_party(party_id).await?;
    require_access(&user, party_section(party.kind), None)?;
    Ok(Json(party))
}

/// List counterparties. Workers must scope the listing to a kind they
/// hold access to; admins may list across kinds.
pub async fn list_parties(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PartyListQuery>,
) -> AppResult<Json<PaginatedResponse<Party>>> {
    match query.kind {
        Some(kind) => require_access(&user, party_section(kind), None)?,
        None if user.role != Role::Admin => {
            return Err(AppError::InsufficientPermissions);
        }
        None => {}
    }

    let service = PartyService::new(state.db);
    let pagination = Pagination {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    };
    let parties = service
        .list_parties(query.kind, query.search, pagination)
        .await?;
    Ok(Json(parties))
}

/// Update a counterparty's contact details
pub async fn update_party(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(party_id): Path<Uuid>,
    Json(input): Json<UpdatePartyInput>,
) -> AppResult<Json<Party>> {
    let service = PartyService::new(state.db);
    let current = service.get_party(party_id).await?;
    require_access(&user, party_section(current.kind), None)?;
    let party = service.update_party(party_id, input).await?;
    Ok(Json(party))
}

/// Delete a counterparty
pub async fn delete_party(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(party_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = PartyService::new(state.db);
    let current = service.get_party(party_id).await?;
    require_access(&user, party_section(current.kind), None)?;
    service.delete_party(party_id).await?;
    Ok(Json(()))
}
