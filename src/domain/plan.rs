//! Subscription plan domain models

use super::common::{double_option, StringUuid};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Subscription plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Plan {
    pub id: StringUuid,
    /// Unique machine name (e.g., "free", "pro")
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub stripe_price_id_monthly: Option<String>,
    pub stripe_price_id_yearly: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Plan {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: StringUuid::new_v4(),
            name: String::new(),
            display_name: String::new(),
            description: None,
            stripe_price_id_monthly: None,
            stripe_price_id_yearly: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Input for creating (or upserting) a plan
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePlanInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub display_name: String,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub stripe_price_id_monthly: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub stripe_price_id_yearly: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Partial update for a plan; `null` clears the nullable columns
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdatePlanInput {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub stripe_price_id_monthly: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub stripe_price_id_yearly: Option<Option<String>>,
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_plan_input_defaults_active() {
        let input: CreatePlanInput =
            serde_json::from_str(r#"{"name": "pro", "display_name": "Pro"}"#).unwrap();
        assert!(input.is_active);
        assert!(input.stripe_price_id_monthly.is_none());
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_create_plan_input_rejects_empty_price_id() {
        let input = CreatePlanInput {
            name: "pro".to_string(),
            display_name: "Pro".to_string(),
            description: None,
            stripe_price_id_monthly: Some(String::new()),
            stripe_price_id_yearly: None,
            is_active: true,
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_update_plan_input_clears_price() {
        let patch: UpdatePlanInput =
            serde_json::from_str(r#"{"stripe_price_id_yearly": null, "is_active": false}"#)
                .unwrap();
        assert_eq!(patch.stripe_price_id_yearly, Some(None));
        assert!(patch.stripe_price_id_monthly.is_none());
        assert_eq!(patch.is_active, Some(false));
    }
}
