//! Role repository

use crate::domain::{CreateRoleInput, Role, StringUuid, UpdateRoleInput};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::{MySql, MySqlPool, QueryBuilder};

const ROLE_COLUMNS: &str = "id, name, priority, description, created_at, updated_at";

/// `UPDATE roles` writing only the columns present in the patch
fn update_query(id: StringUuid, input: &UpdateRoleInput) -> QueryBuilder<'static, MySql> {
    let mut builder = QueryBuilder::new("UPDATE roles SET ");
    {
        let mut set = builder.separated(", ");
        if let Some(name) = &input.name {
            set.push("name = ").push_bind_unseparated(name.clone());
        }
        if let Some(priority) = input.priority {
            set.push("priority = ").push_bind_unseparated(priority);
        }
        if let Some(description) = &input.description {
            set.push("description = ")
                .push_bind_unseparated(description.clone());
        }
        set.push("updated_at = NOW()");
    }
    builder.push(" WHERE id = ").push_bind(id);
    builder
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// All roles ordered by priority, then name
    async fn find_all(&self) -> Result<Vec<Role>>;
    async fn find_by_id(&self, id: StringUuid) -> Result<Option<Role>>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Role>>;
    async fn create(&self, input: &CreateRoleInput) -> Result<Role>;
    async fn update(&self, id: StringUuid, input: &UpdateRoleInput) -> Result<Role>;
    /// Insert or refresh the role keyed by its unique name
    async fn upsert_by_name(&self, input: &CreateRoleInput) -> Result<Role>;
    /// Fails with `DependencyInUse` while allowance rows reference the role
    async fn delete(&self, id: StringUuid) -> Result<()>;
}

pub struct RoleRepositoryImpl {
    pool: MySqlPool,
}

impl RoleRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleRepository for RoleRepositoryImpl {
    async fn find_all(&self) -> Result<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(&format!(
            "SELECT {} FROM roles ORDER BY priority ASC, name ASC",
            ROLE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }

    async fn find_by_id(&self, id: StringUuid) -> Result<Option<Role>> {
        let role = sqlx::query_as::<_, Role>(&format!(
            "SELECT {} FROM roles WHERE id = ?",
            ROLE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(role)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Role>> {
        let role = sqlx::query_as::<_, Role>(&format!(
            "SELECT {} FROM roles WHERE name = ?",
            ROLE_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(role)
    }

    async fn create(&self, input: &CreateRoleInput) -> Result<Role> {
        let id = StringUuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO roles (id, name, priority, description, created_at, updated_at)
            VALUES (?, ?, ?, ?, NOW(), NOW())
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(input.priority)
        .bind(&input.description)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::from_write(e, &format!("Role '{}'", input.name), false))?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to create role")))
    }

    async fn update(&self, id: StringUuid, input: &UpdateRoleInput) -> Result<Role> {
        update_query(id, input)
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::from_write(e, &format!("Role {}", id), false))?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Role {} not found", id)))
    }

    async fn upsert_by_name(&self, input: &CreateRoleInput) -> Result<Role> {
        sqlx::query(
            r#"
            INSERT INTO roles (id, name, priority, description, created_at, updated_at)
            VALUES (?, ?, ?, ?, NOW(), NOW())
            ON DUPLICATE KEY UPDATE
                priority = VALUES(priority),
                description = VALUES(description),
                updated_at = NOW()
            "#,
        )
        .bind(StringUuid::new_v4())
        .bind(&input.name)
        .bind(input.priority)
        .bind(&input.description)
        .execute(&self.pool)
        .await?;

        self.find_by_name(&input.name)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to upsert role")))
    }

    async fn delete(&self, id: StringUuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM roles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::from_write(e, &format!("Role {}", id), true))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Role {} not found", id)));
        }

        Ok(())
    }
}
