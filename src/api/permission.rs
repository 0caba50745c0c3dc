//! Entitlement, allowance and decision API handlers
//!
//! These back the admin permission matrix: one PUT per toggled cell, with the
//! cache invalidated for that cell before the response is sent.

use crate::api::{MessageResponse, SuccessResponse, MANAGE_PERMISSIONS_ACTION};
use crate::domain::{
    Caller, NavigationItem, PermissionDecision, SetPlanActionPermissionInput,
    SetRoleActionPermissionInput, StringUuid,
};
use crate::error::Result;
use crate::server::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct RolePermissionsQuery {
    pub role_id: Option<Uuid>,
}

// ==================== Plan entitlements ====================

pub async fn list_plan_action_permissions(
    State(state): State<AppState>,
    Path(plan_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let rows = state
        .entitlement_service
        .list_plan_action_permissions(StringUuid::from(plan_id))
        .await?;
    Ok(Json(SuccessResponse::new(rows)))
}

pub async fn set_plan_action_permission(
    State(state): State<AppState>,
    caller: Caller,
    Path((plan_id, action_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<SetPlanActionPermissionInput>,
) -> Result<impl IntoResponse> {
    state
        .access
        .authorize(&caller, MANAGE_PERMISSIONS_ACTION)
        .await?;
    let row = state
        .entitlement_service
        .set_plan_action_permission(
            StringUuid::from(plan_id),
            StringUuid::from(action_id),
            input.enabled,
        )
        .await?;
    Ok(Json(SuccessResponse::new(row)))
}

pub async fn delete_plan_action_permission(
    State(state): State<AppState>,
    caller: Caller,
    Path((plan_id, action_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    state
        .access
        .authorize(&caller, MANAGE_PERMISSIONS_ACTION)
        .await?;
    state
        .entitlement_service
        .delete_plan_action_permission(StringUuid::from(plan_id), StringUuid::from(action_id))
        .await?;
    Ok(Json(MessageResponse::new(
        "Plan action permission deleted successfully",
    )))
}

// ==================== Role allowances ====================

/// Allowance rows for a plan, optionally narrowed with `?role_id=`
pub async fn list_role_action_permissions(
    State(state): State<AppState>,
    Path(plan_id): Path<Uuid>,
    Query(query): Query<RolePermissionsQuery>,
) -> Result<impl IntoResponse> {
    let rows = state
        .entitlement_service
        .list_role_action_permissions(
            StringUuid::from(plan_id),
            query.role_id.map(StringUuid::from),
        )
        .await?;
    Ok(Json(SuccessResponse::new(rows)))
}

pub async fn set_role_action_permission(
    State(state): State<AppState>,
    caller: Caller,
    Path((plan_id, role_id, action_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(input): Json<SetRoleActionPermissionInput>,
) -> Result<impl IntoResponse> {
    state
        .access
        .authorize(&caller, MANAGE_PERMISSIONS_ACTION)
        .await?;
    let row = state
        .entitlement_service
        .set_role_action_permission(
            StringUuid::from(plan_id),
            StringUuid::from(role_id),
            StringUuid::from(action_id),
            input.allowed,
        )
        .await?;
    Ok(Json(SuccessResponse::new(row)))
}

pub async fn delete_role_action_permission(
    State(state): State<AppState>,
    caller: Caller,
    Path((plan_id, role_id, action_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    state
        .access
        .authorize(&caller, MANAGE_PERMISSIONS_ACTION)
        .await?;
    state
        .entitlement_service
        .delete_role_action_permission(
            StringUuid::from(plan_id),
            StringUuid::from(role_id),
            StringUuid::from(action_id),
        )
        .await?;
    Ok(Json(MessageResponse::new(
        "Role action permission deleted successfully",
    )))
}

// ==================== Decisions ====================

/// Evaluate one decision through the cache. Always 200: a deny is a result,
/// not an error.
pub async fn check_permission(
    State(state): State<AppState>,
    Path((plan_id, role_id, action_slug)): Path<(Uuid, Uuid, String)>,
) -> Result<impl IntoResponse> {
    let allowed = state
        .access
        .can(
            StringUuid::from(plan_id),
            StringUuid::from(role_id),
            &action_slug,
        )
        .await;
    Ok(Json(SuccessResponse::new(PermissionDecision { allowed })))
}

/// Navigation entries the caller may see; denied entries are left out
pub async fn filter_navigation(
    State(state): State<AppState>,
    caller: Caller,
    Json(items): Json<Vec<NavigationItem>>,
) -> Result<impl IntoResponse> {
    let visible = state
        .access
        .filter_navigation(caller.plan_id, caller.role_id, items)
        .await;
    Ok(Json(SuccessResponse::new(visible)))
}
