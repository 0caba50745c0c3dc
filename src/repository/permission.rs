//! Entitlement (plan x action) and allowance (plan x role x action) tables

use crate::domain::{PlanActionPermission, RoleActionPermission, StringUuid};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;

const PLAN_PERMISSION_COLUMNS: &str = "id, plan_id, action_id, enabled, created_at, updated_at";
const ROLE_PERMISSION_COLUMNS: &str =
    "id, plan_id, role_id, action_id, allowed, created_at, updated_at";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    // Plan entitlements
    /// Create-or-update keyed by (plan, action); never duplicates the row
    async fn upsert_plan_action_permission(
        &self,
        plan_id: StringUuid,
        action_id: StringUuid,
        enabled: bool,
    ) -> Result<PlanActionPermission>;
    async fn delete_plan_action_permission(
        &self,
        plan_id: StringUuid,
        action_id: StringUuid,
    ) -> Result<()>;
    async fn find_plan_action_permission(
        &self,
        plan_id: StringUuid,
        action_id: StringUuid,
    ) -> Result<Option<PlanActionPermission>>;
    async fn find_plan_action_permissions(
        &self,
        plan_id: StringUuid,
    ) -> Result<Vec<PlanActionPermission>>;

    // Role allowances
    /// Create-or-update keyed by (plan, role, action); never duplicates the row
    async fn upsert_role_action_permission(
        &self,
        plan_id: StringUuid,
        role_id: StringUuid,
        action_id: StringUuid,
        allowed: bool,
    ) -> Result<RoleActionPermission>;
    async fn delete_role_action_permission(
        &self,
        plan_id: StringUuid,
        role_id: StringUuid,
        action_id: StringUuid,
    ) -> Result<()>;
    async fn find_role_action_permission(
        &self,
        plan_id: StringUuid,
        role_id: StringUuid,
        action_id: StringUuid,
    ) -> Result<Option<RoleActionPermission>>;
    /// All allowance rows of a plan, optionally narrowed to one role
    async fn find_role_action_permissions(
        &self,
        plan_id: StringUuid,
        role_id: Option<StringUuid>,
    ) -> Result<Vec<RoleActionPermission>>;
}

pub struct PermissionRepositoryImpl {
    pool: MySqlPool,
}

impl PermissionRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionRepository for PermissionRepositoryImpl {
    async fn upsert_plan_action_permission(
        &self,
        plan_id: StringUuid,
        action_id: StringUuid,
        enabled: bool,
    ) -> Result<PlanActionPermission> {
        // Single statement upsert: no window between existence check and insert
        sqlx::query(
            r#"
            INSERT INTO plan_action_permissions (id, plan_id, action_id, enabled, created_at, updated_at)
            VALUES (?, ?, ?, ?, NOW(), NOW())
            ON DUPLICATE KEY UPDATE enabled = VALUES(enabled), updated_at = NOW()
            "#,
        )
        .bind(StringUuid::new_v4())
        .bind(plan_id)
        .bind(action_id)
        .bind(enabled)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::from_write(e, "Plan action permission", false))?;

        self.find_plan_action_permission(plan_id, action_id)
            .await?
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("Failed to upsert plan action permission"))
            })
    }

    async fn delete_plan_action_permission(
        &self,
        plan_id: StringUuid,
        action_id: StringUuid,
    ) -> Result<()> {
        let result = sqlx::query(
            "DELETE FROM plan_action_permissions WHERE plan_id = ? AND action_id = ?",
        )
        .bind(plan_id)
        .bind(action_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "No entitlement for action {} in plan {}",
                action_id, plan_id
            )));
        }

        Ok(())
    }

    async fn find_plan_action_permission(
        &self,
        plan_id: StringUuid,
        action_id: StringUuid,
    ) -> Result<Option<PlanActionPermission>> {
        let row = sqlx::query_as::<_, PlanActionPermission>(&format!(
            "SELECT {} FROM plan_action_permissions WHERE plan_id = ? AND action_id = ?",
            PLAN_PERMISSION_COLUMNS
        ))
        .bind(plan_id)
        .bind(action_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_plan_action_permissions(
        &self,
        plan_id: StringUuid,
    ) -> Result<Vec<PlanActionPermission>> {
        let rows = sqlx::query_as::<_, PlanActionPermission>(&format!(
            "SELECT {} FROM plan_action_permissions WHERE plan_id = ? ORDER BY action_id ASC",
            PLAN_PERMISSION_COLUMNS
        ))
        .bind(plan_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn upsert_role_action_permission(
        &self,
        plan_id: StringUuid,
        role_id: StringUuid,
        action_id: StringUuid,
        allowed: bool,
    ) -> Result<RoleActionPermission> {
        sqlx::query(
            r#"
            INSERT INTO role_action_permissions
                (id, plan_id, role_id, action_id, allowed, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, NOW(), NOW())
            ON DUPLICATE KEY UPDATE allowed = VALUES(allowed), updated_at = NOW()
            "#,
        )
        .bind(StringUuid::new_v4())
        .bind(plan_id)
        .bind(role_id)
        .bind(action_id)
        .bind(allowed)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::from_write(e, "Role action permission", false))?;

        self.find_role_action_permission(plan_id, role_id, action_id)
            .await?
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("Failed to upsert role action permission"))
            })
    }

    async fn delete_role_action_permission(
        &self,
        plan_id: StringUuid,
        role_id: StringUuid,
        action_id: StringUuid,
    ) -> Result<()> {
        let result = sqlx::query(
            "DELETE FROM role_action_permissions WHERE plan_id = ? AND role_id = ? AND action_id = ?",
        )
        .bind(plan_id)
        .bind(role_id)
        .bind(action_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "No allowance for role {} and action {} in plan {}",
                role_id, action_id, plan_id
            )));
        }

        Ok(())
    }

    async fn find_role_action_permission(
        &self,
        plan_id: StringUuid,
        role_id: StringUuid,
        action_id: StringUuid,
    ) -> Result<Option<RoleActionPermission>> {
        let row = sqlx::query_as::<_, RoleActionPermission>(&format!(
            "SELECT {} FROM role_action_permissions \
             WHERE plan_id = ? AND role_id = ? AND action_id = ?",
            ROLE_PERMISSION_COLUMNS
        ))
        .bind(plan_id)
        .bind(role_id)
        .bind(action_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_role_action_permissions(
        &self,
        plan_id: StringUuid,
        role_id: Option<StringUuid>,
    ) -> Result<Vec<RoleActionPermission>> {
        let mut sql = format!(
            "SELECT {} FROM role_action_permissions WHERE plan_id = ?",
            ROLE_PERMISSION_COLUMNS
        );
        if role_id.is_some() {
            sql.push_str(" AND role_id = ?");
        }
        sql.push_str(" ORDER BY role_id ASC, action_id ASC");

        let mut query = sqlx::query_as::<_, RoleActionPermission>(&sql).bind(plan_id);
        if let Some(role_id) = role_id {
            query = query.bind(role_id);
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows)
    }
}
