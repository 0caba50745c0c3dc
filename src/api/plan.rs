//! Subscription plan API handlers

use crate::api::{MessageResponse, SuccessResponse, MANAGE_PERMISSIONS_ACTION};
use crate::domain::{Caller, CreatePlanInput, StringUuid, UpdatePlanInput};
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

pub async fn list_plans(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let plans = state.plan_service.list().await?;
    Ok(Json(SuccessResponse::new(plans)))
}

pub async fn get_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let plan = state.plan_service.get(StringUuid::from(id)).await?;
    Ok(Json(SuccessResponse::new(plan)))
}

pub async fn create_plan(
    State(state): State<AppState>,
    caller: Caller,
    Json(input): Json<CreatePlanInput>,
) -> Result<impl IntoResponse> {
    state
        .access
        .authorize(&caller, MANAGE_PERMISSIONS_ACTION)
        .await?;
    let plan = state.plan_service.create(input).await?;
    info!(plan_id = %plan.id, name = %plan.name, "Plan created");
    Ok((StatusCode::CREATED, Json(SuccessResponse::new(plan))))
}

/// Partial update; `null` clears description and Stripe price ids
pub async fn update_plan(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdatePlanInput>,
) -> Result<impl IntoResponse> {
    state
        .access
        .authorize(&caller, MANAGE_PERMISSIONS_ACTION)
        .await?;
    let plan = state.plan_service.update(StringUuid::from(id), input).await?;
    Ok(Json(SuccessResponse::new(plan)))
}

pub async fn delete_plan(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state
        .access
        .authorize(&caller, MANAGE_PERMISSIONS_ACTION)
        .await?;
    let id = StringUuid::from(id);
    state.plan_service.delete(id).await?;
    info!(plan_id = %id, "Plan deleted");
    Ok(Json(MessageResponse::new("Plan deleted successfully")))
}
