//! Role domain models

use super::common::{double_option, StringUuid};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Role entity
///
/// `priority` orders roles for display (lower sorts first, conventionally the
/// more powerful role). It never takes part in an authorization decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: StringUuid,
    pub name: String,
    pub priority: i32,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Role {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: StringUuid::new_v4(),
            name: String::new(),
            priority: 0,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for creating (or upserting) a role
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRoleInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    pub priority: i32,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

/// Partial update for a role; omitted fields stay untouched
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateRoleInput {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub priority: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}
