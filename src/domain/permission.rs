//! Plan entitlement and role allowance tables

use super::common::StringUuid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Entitlement: is `action_id` reachable at all under `plan_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PlanActionPermission {
    pub id: StringUuid,
    pub plan_id: StringUuid,
    pub action_id: StringUuid,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Allowance: may `role_id` perform `action_id` within `plan_id`.
///
/// Only meaningful while the matching entitlement is enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RoleActionPermission {
    pub id: StringUuid,
    pub plan_id: StringUuid,
    pub role_id: StringUuid,
    pub action_id: StringUuid,
    pub allowed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body for toggling an entitlement cell
#[derive(Debug, Clone, Deserialize)]
pub struct SetPlanActionPermissionInput {
    pub enabled: bool,
}

/// Body for toggling an allowance cell
#[derive(Debug, Clone, Deserialize)]
pub struct SetRoleActionPermissionInput {
    pub allowed: bool,
}

/// Who is asking: resolved by the session layer in front of this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub plan_id: StringUuid,
    pub role_id: StringUuid,
}

/// Gate applied to a navigation entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NavigationGate {
    /// Always shown
    Open,
    /// Shown when the plan entitles the action, whoever asks
    Plan { action: String },
    /// Shown when the caller's role may perform the action in the plan
    Role { action: String },
}

/// A navigation entry offered to the navigation filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationItem {
    pub key: String,
    pub label: String,
    pub href: String,
    pub gate: NavigationGate,
}

/// Decision payload returned by the check endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDecision {
    pub allowed: bool,
}
