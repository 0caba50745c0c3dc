//! Action catalog domain models

use super::common::{double_option, StringUuid, ACTION_SLUG_REGEX};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A discrete capability that plans entitle and roles are allowed.
///
/// The slug is fixed at creation time; no update path can change it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Action {
    pub id: StringUuid,
    /// Stable identifier (e.g., "PROJECT_CREATE")
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    /// Free-form grouping used by the admin matrix (e.g., "project", "billing")
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Action {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: StringUuid::new_v4(),
            slug: String::new(),
            name: String::new(),
            description: None,
            category: String::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for creating (or upserting) an action
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateActionInput {
    #[validate(length(min = 1, max = 100), custom(function = "validate_action_slug"))]
    pub slug: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
}

/// Partial update for an action. Has no `slug` field and rejects unknown
/// fields, so a request carrying a slug fails to deserialize.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateActionInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
}

fn validate_action_slug(slug: &str) -> Result<(), validator::ValidationError> {
    if ACTION_SLUG_REGEX.is_match(slug) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_action_slug"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(slug: &str) -> CreateActionInput {
        CreateActionInput {
            slug: slug.to_string(),
            name: "Create project".to_string(),
            description: None,
            category: "project".to_string(),
        }
    }

    #[test]
    fn test_create_action_input_valid() {
        assert!(input("PROJECT_CREATE").validate().is_ok());
    }

    #[test]
    fn test_create_action_input_invalid_slug() {
        assert!(input("project-create").validate().is_err());
        assert!(input("").validate().is_err());
    }

    #[test]
    fn test_validate_action_slug_error_code() {
        let err = validate_action_slug("nope").unwrap_err();
        assert_eq!(err.code.as_ref(), "invalid_action_slug");
    }

    #[test]
    fn test_update_action_input_rejects_slug() {
        let result =
            serde_json::from_str::<UpdateActionInput>(r#"{"slug": "PROJECT_REMOVE"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_update_action_input_partial() {
        let patch: UpdateActionInput =
            serde_json::from_str(r#"{"category": "workspace"}"#).unwrap();
        assert_eq!(patch.category.as_deref(), Some("workspace"));
        assert!(patch.name.is_none());
        assert!(patch.description.is_none());
    }
}
