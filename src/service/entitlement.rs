//! Plan entitlement and role allowance business logic
//!
//! Each write resolves the action so the cache can be invalidated for exactly
//! the cells it changed, before the call returns.

use crate::cache::PermissionCache;
use crate::domain::{Action, PlanActionPermission, RoleActionPermission, StringUuid};
use crate::error::{AppError, Result};
use crate::repository::{ActionRepository, PermissionRepository, PlanRepository};
use std::sync::Arc;

pub struct EntitlementService {
    permissions: Arc<dyn PermissionRepository>,
    actions: Arc<dyn ActionRepository>,
    plans: Arc<dyn PlanRepository>,
    cache: PermissionCache,
}

impl EntitlementService {
    pub fn new(
        permissions: Arc<dyn PermissionRepository>,
        actions: Arc<dyn ActionRepository>,
        plans: Arc<dyn PlanRepository>,
        cache: PermissionCache,
    ) -> Self {
        Self {
            permissions,
            actions,
            plans,
            cache,
        }
    }

    async fn action(&self, action_id: StringUuid) -> Result<Action> {
        self.actions
            .find_by_id(action_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Action {} not found", action_id)))
    }

    async fn ensure_plan(&self, plan_id: StringUuid) -> Result<()> {
        self.plans
            .find_by_id(plan_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Plan {} not found", plan_id)))
    }

    // ==================== Plan entitlements ====================

    pub async fn set_plan_action_permission(
        &self,
        plan_id: StringUuid,
        action_id: StringUuid,
        enabled: bool,
    ) -> Result<PlanActionPermission> {
        let action = self.action(action_id).await?;
        let row = self
            .permissions
            .upsert_plan_action_permission(plan_id, action_id, enabled)
            .await?;
        self.cache.invalidate_plan_action(plan_id, &action.slug);
        Ok(row)
    }

    pub async fn delete_plan_action_permission(
        &self,
        plan_id: StringUuid,
        action_id: StringUuid,
    ) -> Result<()> {
        let action = self.action(action_id).await?;
        self.permissions
            .delete_plan_action_permission(plan_id, action_id)
            .await?;
        self.cache.invalidate_plan_action(plan_id, &action.slug);
        Ok(())
    }

    pub async fn list_plan_action_permissions(
        &self,
        plan_id: StringUuid,
    ) -> Result<Vec<PlanActionPermission>> {
        self.ensure_plan(plan_id).await?;
        self.permissions.find_plan_action_permissions(plan_id).await
    }

    // ==================== Role allowances ====================

    pub async fn set_role_action_permission(
        &self,
        plan_id: StringUuid,
        role_id: StringUuid,
        action_id: StringUuid,
        allowed: bool,
    ) -> Result<RoleActionPermission> {
        let action = self.action(action_id).await?;
        let row = self
            .permissions
            .upsert_role_action_permission(plan_id, role_id, action_id, allowed)
            .await?;
        self.cache.invalidate_entry(plan_id, role_id, &action.slug);
        Ok(row)
    }

    pub async fn delete_role_action_permission(
        &self,
        plan_id: StringUuid,
        role_id: StringUuid,
        action_id: StringUuid,
    ) -> Result<()> {
        let action = self.action(action_id).await?;
        self.permissions
            .delete_role_action_permission(plan_id, role_id, action_id)
            .await?;
        self.cache.invalidate_entry(plan_id, role_id, &action.slug);
        Ok(())
    }

    pub async fn list_role_action_permissions(
        &self,
        plan_id: StringUuid,
        role_id: Option<StringUuid>,
    ) -> Result<Vec<RoleActionPermission>> {
        self.ensure_plan(plan_id).await?;
        self.permissions
            .find_role_action_permissions(plan_id, role_id)
            .await
    }
}
