//! Two-stage permission evaluation
//!
//! A decision is the plan entitlement AND the role allowance. The plan is a
//! gate: when the entitlement row is missing or disabled the allowance table is
//! never read, and no role (whatever its priority) gets past it.

use crate::domain::StringUuid;
use crate::error::{AppError, Result};
use crate::repository::{ActionRepository, PermissionRepository};
use metrics::counter;
use std::sync::Arc;
use tracing::error;

pub struct PermissionEvaluator {
    permissions: Arc<dyn PermissionRepository>,
    actions: Arc<dyn ActionRepository>,
}

fn evaluation_failure(err: AppError) -> AppError {
    match err {
        AppError::EvaluationFailure(_) => err,
        other => AppError::EvaluationFailure(other.to_string()),
    }
}

pub(crate) fn record_outcome(outcome: &Result<bool>) {
    let label = match outcome {
        Ok(true) => "allow",
        Ok(false) => "deny",
        Err(_) => "error",
    };
    counter!("plangate_permission_checks_total", "outcome" => label).increment(1);
}

impl PermissionEvaluator {
    pub fn new(
        permissions: Arc<dyn PermissionRepository>,
        actions: Arc<dyn ActionRepository>,
    ) -> Self {
        Self {
            permissions,
            actions,
        }
    }

    /// Plan-only half of the decision
    pub async fn try_is_action_enabled_for_plan(
        &self,
        plan_id: StringUuid,
        action_id: StringUuid,
    ) -> Result<bool> {
        let entitlement = self
            .permissions
            .find_plan_action_permission(plan_id, action_id)
            .await
            .map_err(evaluation_failure)?;
        Ok(entitlement.is_some_and(|row| row.enabled))
    }

    /// Full decision. Errors are returned, not converted to a deny; callers on
    /// the authorization path use [`PermissionEvaluator::can_role_perform_action_in_plan`].
    pub async fn try_can_role_perform_action_in_plan(
        &self,
        plan_id: StringUuid,
        role_id: StringUuid,
        action_id: StringUuid,
    ) -> Result<bool> {
        if !self.try_is_action_enabled_for_plan(plan_id, action_id).await? {
            return Ok(false);
        }

        let allowance = self
            .permissions
            .find_role_action_permission(plan_id, role_id, action_id)
            .await
            .map_err(evaluation_failure)?;
        Ok(allowance.is_some_and(|row| row.allowed))
    }

    /// Fail-closed decision: any lookup failure is logged and denies.
    pub async fn can_role_perform_action_in_plan(
        &self,
        plan_id: StringUuid,
        role_id: StringUuid,
        action_id: StringUuid,
    ) -> bool {
        let outcome = self
            .try_can_role_perform_action_in_plan(plan_id, role_id, action_id)
            .await;
        record_outcome(&outcome);
        outcome.unwrap_or_else(|e| {
            error!(
                plan_id = %plan_id,
                role_id = %role_id,
                action_id = %action_id,
                error = %e,
                "Permission evaluation failed; denying"
            );
            false
        })
    }

    /// Fail-closed plan gate
    pub async fn is_action_enabled_for_plan(
        &self,
        plan_id: StringUuid,
        action_id: StringUuid,
    ) -> bool {
        let outcome = self.try_is_action_enabled_for_plan(plan_id, action_id).await;
        record_outcome(&outcome);
        outcome.unwrap_or_else(|e| {
            error!(
                plan_id = %plan_id,
                action_id = %action_id,
                error = %e,
                "Plan entitlement lookup failed; denying"
            );
            false
        })
    }

    async fn resolve_slug(&self, action_slug: &str) -> Result<Option<StringUuid>> {
        let action = self
            .actions
            .find_by_slug(action_slug)
            .await
            .map_err(evaluation_failure)?;
        Ok(action.map(|a| a.id))
    }

    /// Decision keyed by action slug; an unknown slug is a deny.
    pub async fn try_can_by_slug(
        &self,
        plan_id: StringUuid,
        role_id: StringUuid,
        action_slug: &str,
    ) -> Result<bool> {
        match self.resolve_slug(action_slug).await? {
            Some(action_id) => {
                self.try_can_role_perform_action_in_plan(plan_id, role_id, action_id)
                    .await
            }
            None => Ok(false),
        }
    }

    /// Plan gate keyed by action slug; an unknown slug is a deny.
    pub async fn try_is_enabled_by_slug(
        &self,
        plan_id: StringUuid,
        action_slug: &str,
    ) -> Result<bool> {
        match self.resolve_slug(action_slug).await? {
            Some(action_id) => self.try_is_action_enabled_for_plan(plan_id, action_id).await,
            None => Ok(false),
        }
    }
}
