//! Action catalog API handlers

use crate::api::{MessageResponse, SuccessResponse, MANAGE_PERMISSIONS_ACTION};
use crate::domain::{Caller, CreateActionInput, StringUuid, UpdateActionInput};
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

/// List the catalog ordered by category, then name
pub async fn list_actions(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let actions = state.action_service.list().await?;
    Ok(Json(SuccessResponse::new(actions)))
}

pub async fn get_action(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let action = state.action_service.get(StringUuid::from(id)).await?;
    Ok(Json(SuccessResponse::new(action)))
}

pub async fn create_action(
    State(state): State<AppState>,
    caller: Caller,
    Json(input): Json<CreateActionInput>,
) -> Result<impl IntoResponse> {
    state
        .access
        .authorize(&caller, MANAGE_PERMISSIONS_ACTION)
        .await?;
    let action = state.action_service.create(input).await?;
    info!(action_id = %action.id, slug = %action.slug, "Action created");
    Ok((StatusCode::CREATED, Json(SuccessResponse::new(action))))
}

/// Update name, description or category. A body carrying `slug` is rejected
/// while deserializing.
pub async fn update_action(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateActionInput>,
) -> Result<impl IntoResponse> {
    state
        .access
        .authorize(&caller, MANAGE_PERMISSIONS_ACTION)
        .await?;
    let action = state
        .action_service
        .update(StringUuid::from(id), input)
        .await?;
    Ok(Json(SuccessResponse::new(action)))
}

pub async fn delete_action(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state
        .access
        .authorize(&caller, MANAGE_PERMISSIONS_ACTION)
        .await?;
    let id = StringUuid::from(id);
    state.action_service.delete(id).await?;
    info!(action_id = %id, "Action deleted");
    Ok(Json(MessageResponse::new("Action deleted successfully")))
}
