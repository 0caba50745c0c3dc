//! Role API handlers

use crate::api::{MessageResponse, SuccessResponse, MANAGE_PERMISSIONS_ACTION};
use crate::domain::{Caller, CreateRoleInput, StringUuid, UpdateRoleInput};
use crate::error::Result;
use crate::server::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::info;
use uuid::Uuid;

/// List roles, highest priority first
pub async fn list_roles(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let roles = state.role_service.list().await?;
    Ok(Json(SuccessResponse::new(roles)))
}

/// Get role by ID
pub async fn get_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let role = state.role_service.get(StringUuid::from(id)).await?;
    Ok(Json(SuccessResponse::new(role)))
}

/// Create role
pub async fn create_role(
    State(state): State<AppState>,
    caller: Caller,
    Json(input): Json<CreateRoleInput>,
) -> Result<impl IntoResponse> {
    state
        .access
        .authorize(&caller, MANAGE_PERMISSIONS_ACTION)
        .await?;
    let role = state.role_service.create(input).await?;
    info!(role_id = %role.id, name = %role.name, "Role created");
    Ok((StatusCode::CREATED, Json(SuccessResponse::new(role))))
}

/// Update role
pub async fn update_role(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateRoleInput>,
) -> Result<impl IntoResponse> {
    state
        .access
        .authorize(&caller, MANAGE_PERMISSIONS_ACTION)
        .await?;
    let role = state.role_service.update(StringUuid::from(id), input).await?;
    Ok(Json(SuccessResponse::new(role)))
}

/// Delete role
pub async fn delete_role(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state
        .access
        .authorize(&caller, MANAGE_PERMISSIONS_ACTION)
        .await?;
    let id = StringUuid::from(id);
    state.role_service.delete(id).await?;
    info!(role_id = %id, "Role deleted");
    Ok(Json(MessageResponse::new("Role deleted successfully")))
}
