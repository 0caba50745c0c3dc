//! Feature module domain models
//!
//! A module is a UI-facing bundle of actions. Modules group the catalog for
//! navigation and admin screens; they never take part in authorization.

use super::common::{double_option, StringUuid, MODULE_SLUG_REGEX};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Feature module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Module {
    pub id: StringUuid,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Module {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: StringUuid::new_v4(),
            slug: String::new(),
            name: String::new(),
            description: None,
            icon: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Module-Action association row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ModuleAction {
    pub id: StringUuid,
    pub module_id: StringUuid,
    pub action_id: StringUuid,
    pub created_at: DateTime<Utc>,
}

/// Association row joined with the action it points at (for listing)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ModuleActionDetail {
    pub id: StringUuid,
    pub module_id: StringUuid,
    pub action_id: StringUuid,
    pub action_slug: String,
    pub action_name: String,
    pub action_category: String,
    pub created_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

/// Input for creating (or upserting) a module
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateModuleInput {
    #[validate(length(min = 1, max = 100), custom(function = "validate_module_slug"))]
    pub slug: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub icon: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Partial update for a module
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateModuleInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub icon: Option<Option<String>>,
    pub is_active: Option<bool>,
}

/// Full replacement of a module's action set
#[derive(Debug, Clone, Deserialize)]
pub struct SetModuleActionsInput {
    pub action_ids: Vec<StringUuid>,
}

/// Single association
#[derive(Debug, Clone, Deserialize)]
pub struct AddModuleActionInput {
    pub action_id: StringUuid,
}

/// Remove repeated ids while keeping first-seen order.
pub fn dedup_ids(ids: &[StringUuid]) -> Vec<StringUuid> {
    let mut seen = std::collections::HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

fn validate_module_slug(slug: &str) -> Result<(), validator::ValidationError> {
    if MODULE_SLUG_REGEX.is_match(slug) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_module_slug"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_module_input_valid() {
        let input: CreateModuleInput =
            serde_json::from_str(r#"{"slug": "projects", "name": "Projects", "icon": "folder"}"#)
                .unwrap();
        assert!(input.is_active);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_create_module_input_invalid_slug() {
        let input = CreateModuleInput {
            slug: "Projects".to_string(),
            name: "Projects".to_string(),
            description: None,
            icon: None,
            is_active: true,
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_dedup_ids_keeps_order() {
        let a = StringUuid::new_v4();
        let b = StringUuid::new_v4();
        assert_eq!(dedup_ids(&[a, b, a, b, a]), vec![a, b]);
        assert!(dedup_ids(&[]).is_empty());
    }

    #[test]
    fn test_update_module_input_clear_icon() {
        let patch: UpdateModuleInput = serde_json::from_str(r#"{"icon": null}"#).unwrap();
        assert_eq!(patch.icon, Some(None));
        assert!(patch.is_active.is_none());
    }
}
