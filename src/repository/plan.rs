//! Subscription plan repository

use crate::domain::{CreatePlanInput, Plan, StringUuid, UpdatePlanInput};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::{MySql, MySqlPool, QueryBuilder};

const PLAN_COLUMNS: &str = "id, name, display_name, description, stripe_price_id_monthly, \
                            stripe_price_id_yearly, is_active, created_at, updated_at";

/// `UPDATE subscription_plans` writing only the columns present in the patch
fn update_query(id: StringUuid, input: &UpdatePlanInput) -> QueryBuilder<'static, MySql> {
    let mut builder = QueryBuilder::new("UPDATE subscription_plans SET ");
    {
        let mut set = builder.separated(", ");
        if let Some(name) = &input.name {
            set.push("name = ").push_bind_unseparated(name.clone());
        }
        if let Some(display_name) = &input.display_name {
            set.push("display_name = ")
                .push_bind_unseparated(display_name.clone());
        }
        if let Some(description) = &input.description {
            set.push("description = ")
                .push_bind_unseparated(description.clone());
        }
        if let Some(monthly) = &input.stripe_price_id_monthly {
            set.push("stripe_price_id_monthly = ")
                .push_bind_unseparated(monthly.clone());
        }
        if let Some(yearly) = &input.stripe_price_id_yearly {
            set.push("stripe_price_id_yearly = ")
                .push_bind_unseparated(yearly.clone());
        }
        if let Some(is_active) = input.is_active {
            set.push("is_active = ").push_bind_unseparated(is_active);
        }
        set.push("updated_at = NOW()");
    }
    builder.push(" WHERE id = ").push_bind(id);
    builder
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// All plans ordered by name
    async fn find_all(&self) -> Result<Vec<Plan>>;
    async fn find_by_id(&self, id: StringUuid) -> Result<Option<Plan>>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Plan>>;
    async fn create(&self, input: &CreatePlanInput) -> Result<Plan>;
    async fn update(&self, id: StringUuid, input: &UpdatePlanInput) -> Result<Plan>;
    /// Insert or refresh the plan keyed by its unique name
    async fn upsert_by_name(&self, input: &CreatePlanInput) -> Result<Plan>;
    /// Fails with `DependencyInUse` while entitlement or allowance rows
    /// reference the plan
    async fn delete(&self, id: StringUuid) -> Result<()>;
}

pub struct PlanRepositoryImpl {
    pool: MySqlPool,
}

impl PlanRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlanRepository for PlanRepositoryImpl {
    async fn find_all(&self) -> Result<Vec<Plan>> {
        let plans = sqlx::query_as::<_, Plan>(&format!(
            "SELECT {} FROM subscription_plans ORDER BY name ASC",
            PLAN_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(plans)
    }

    async fn find_by_id(&self, id: StringUuid) -> Result<Option<Plan>> {
        let plan = sqlx::query_as::<_, Plan>(&format!(
            "SELECT {} FROM subscription_plans WHERE id = ?",
            PLAN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(plan)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Plan>> {
        let plan = sqlx::query_as::<_, Plan>(&format!(
            "SELECT {} FROM subscription_plans WHERE name = ?",
            PLAN_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(plan)
    }

    async fn create(&self, input: &CreatePlanInput) -> Result<Plan> {
        let id = StringUuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO subscription_plans
                (id, name, display_name, description, stripe_price_id_monthly,
                 stripe_price_id_yearly, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, NOW(), NOW())
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.display_name)
        .bind(&input.description)
        .bind(&input.stripe_price_id_monthly)
        .bind(&input.stripe_price_id_yearly)
        .bind(input.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::from_write(e, &format!("Plan '{}'", input.name), false))?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to create plan")))
    }

    async fn update(&self, id: StringUuid, input: &UpdatePlanInput) -> Result<Plan> {
        update_query(id, input)
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::from_write(e, &format!("Plan {}", id), false))?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Plan {} not found", id)))
    }

    async fn upsert_by_name(&self, input: &CreatePlanInput) -> Result<Plan> {
        sqlx::query(
            r#"
            INSERT INTO subscription_plans
                (id, name, display_name, description, stripe_price_id_monthly,
                 stripe_price_id_yearly, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, NOW(), NOW())
            ON DUPLICATE KEY UPDATE
                display_name = VALUES(display_name),
                description = VALUES(description),
                stripe_price_id_monthly = VALUES(stripe_price_id_monthly),
                stripe_price_id_yearly = VALUES(stripe_price_id_yearly),
                is_active = VALUES(is_active),
                updated_at = NOW()
            "#,
        )
        .bind(StringUuid::new_v4())
        .bind(&input.name)
        .bind(&input.display_name)
        .bind(&input.description)
        .bind(&input.stripe_price_id_monthly)
        .bind(&input.stripe_price_id_yearly)
        .bind(input.is_active)
        .execute(&self.pool)
        .await?;

        self.find_by_name(&input.name)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to upsert plan")))
    }

    async fn delete(&self, id: StringUuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM subscription_plans WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::from_write(e, &format!("Plan {}", id), true))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Plan {} not found", id)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_query_clears_price_without_touching_name() {
        let input = UpdatePlanInput {
            stripe_price_id_yearly: Some(None),
            is_active: Some(false),
            ..Default::default()
        };
        let query = update_query(StringUuid::new_v4(), &input);
        assert_eq!(
            query.sql(),
            "UPDATE subscription_plans SET stripe_price_id_yearly = ?, is_active = ?, \
             updated_at = NOW() WHERE id = ?"
        );
    }
}
