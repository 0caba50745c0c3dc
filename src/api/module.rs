//! Module registry API handlers

use crate::api::{MessageResponse, SuccessResponse, MANAGE_PERMISSIONS_ACTION};
use crate::domain::{
    AddModuleActionInput, Caller, CreateModuleInput, SetModuleActionsInput, StringUuid,
    UpdateModuleInput,
};
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

// ==================== Modules ====================

pub async fn list_modules(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let modules = state.module_service.list().await?;
    Ok(Json(SuccessResponse::new(modules)))
}

pub async fn get_module(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let module = state.module_service.get(StringUuid::from(id)).await?;
    Ok(Json(SuccessResponse::new(module)))
}

pub async fn create_module(
    State(state): State<AppState>,
    caller: Caller,
    Json(input): Json<CreateModuleInput>,
) -> Result<impl IntoResponse> {
    state
        .access
        .authorize(&caller, MANAGE_PERMISSIONS_ACTION)
        .await?;
    let module = state.module_service.create(input).await?;
    info!(module_id = %module.id, slug = %module.slug, "Module created");
    Ok((StatusCode::CREATED, Json(SuccessResponse::new(module))))
}

pub async fn update_module(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateModuleInput>,
) -> Result<impl IntoResponse> {
    state
        .access
        .authorize(&caller, MANAGE_PERMISSIONS_ACTION)
        .await?;
    let module = state
        .module_service
        .update(StringUuid::from(id), input)
        .await?;
    Ok(Json(SuccessResponse::new(module)))
}

pub async fn delete_module(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state
        .access
        .authorize(&caller, MANAGE_PERMISSIONS_ACTION)
        .await?;
    let id = StringUuid::from(id);
    state.module_service.delete(id).await?;
    info!(module_id = %id, "Module deleted");
    Ok(Json(MessageResponse::new("Module deleted successfully")))
}

// ==================== Module Actions ====================

/// Actions bundled in a module, grouped by category then name
pub async fn list_module_actions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let actions = state
        .module_service
        .list_actions(StringUuid::from(id))
        .await?;
    Ok(Json(SuccessResponse::new(actions)))
}

pub async fn add_module_action(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(input): Json<AddModuleActionInput>,
) -> Result<impl IntoResponse> {
    state
        .access
        .authorize(&caller, MANAGE_PERMISSIONS_ACTION)
        .await?;
    let row = state
        .module_service
        .add_action(StringUuid::from(id), input.action_id)
        .await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse::new(row))))
}

/// Replace the whole action set in one unit of work
pub async fn set_module_actions(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(input): Json<SetModuleActionsInput>,
) -> Result<impl IntoResponse> {
    state
        .access
        .authorize(&caller, MANAGE_PERMISSIONS_ACTION)
        .await?;
    let actions = state
        .module_service
        .set_actions(StringUuid::from(id), input.action_ids)
        .await?;
    Ok(Json(SuccessResponse::new(actions)))
}

pub async fn remove_module_action(
    State(state): State<AppState>,
    caller: Caller,
    Path((id, action_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    state
        .access
        .authorize(&caller, MANAGE_PERMISSIONS_ACTION)
        .await?;
    state
        .module_service
        .remove_action(StringUuid::from(id), StringUuid::from(action_id))
        .await?;
    Ok(Json(MessageResponse::new(
        "Action removed from module successfully",
    )))
}
