//! Action catalog repository

use crate::domain::{Action, CreateActionInput, StringUuid, UpdateActionInput};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::{MySql, MySqlPool, QueryBuilder};

const ACTION_COLUMNS: &str = "id, slug, name, description, category, created_at, updated_at";

/// `UPDATE actions` writing only the columns present in the patch
fn update_query(id: StringUuid, input: &UpdateActionInput) -> QueryBuilder<'static, MySql> {
    let mut builder = QueryBuilder::new("UPDATE actions SET ");
    {
        let mut set = builder.separated(", ");
        if let Some(name) = &input.name {
            set.push("name = ").push_bind_unseparated(name.clone());
        }
        if let Some(description) = &input.description {
            set.push("description = ")
                .push_bind_unseparated(description.clone());
        }
        if let Some(category) = &input.category {
            set.push("category = ").push_bind_unseparated(category.clone());
        }
        set.push("updated_at = NOW()");
    }
    builder.push(" WHERE id = ").push_bind(id);
    builder
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActionRepository: Send + Sync {
    /// All actions ordered by category, then name
    async fn find_all(&self) -> Result<Vec<Action>>;
    async fn find_by_id(&self, id: StringUuid) -> Result<Option<Action>>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Action>>;
    async fn create(&self, input: &CreateActionInput) -> Result<Action>;
    /// Never touches the slug
    async fn update(&self, id: StringUuid, input: &UpdateActionInput) -> Result<Action>;
    /// Insert or refresh name/description/category, keyed by slug
    async fn upsert_by_slug(&self, input: &CreateActionInput) -> Result<Action>;
    /// Fails with `DependencyInUse` while entitlement, allowance or module rows
    /// reference the action
    async fn delete(&self, id: StringUuid) -> Result<()>;
}

pub struct ActionRepositoryImpl {
    pool: MySqlPool,
}

impl ActionRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActionRepository for ActionRepositoryImpl {
    async fn find_all(&self) -> Result<Vec<Action>> {
        let actions = sqlx::query_as::<_, Action>(&format!(
            "SELECT {} FROM actions ORDER BY category ASC, name ASC",
            ACTION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(actions)
    }

    async fn find_by_id(&self, id: StringUuid) -> Result<Option<Action>> {
        let action = sqlx::query_as::<_, Action>(&format!(
            "SELECT {} FROM actions WHERE id = ?",
            ACTION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(action)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Action>> {
        let action = sqlx::query_as::<_, Action>(&format!(
            "SELECT {} FROM actions WHERE slug = ?",
            ACTION_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(action)
    }

    async fn create(&self, input: &CreateActionInput) -> Result<Action> {
        let id = StringUuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO actions (id, slug, name, description, category, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, NOW(), NOW())
            "#,
        )
        .bind(id)
        .bind(&input.slug)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.category)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::from_write(e, &format!("Action '{}'", input.slug), false))?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to create action")))
    }

    async fn update(&self, id: StringUuid, input: &UpdateActionInput) -> Result<Action> {
        update_query(id, input)
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::from_write(e, &format!("Action {}", id), false))?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Action {} not found", id)))
    }

    async fn upsert_by_slug(&self, input: &CreateActionInput) -> Result<Action> {
        sqlx::query(
            r#"
            INSERT INTO actions (id, slug, name, description, category, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, NOW(), NOW())
            ON DUPLICATE KEY UPDATE
                name = VALUES(name),
                description = VALUES(description),
                category = VALUES(category),
                updated_at = NOW()
            "#,
        )
        .bind(StringUuid::new_v4())
        .bind(&input.slug)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.category)
        .execute(&self.pool)
        .await?;

        self.find_by_slug(&input.slug)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to upsert action")))
    }

    async fn delete(&self, id: StringUuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM actions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::from_write(e, &format!("Action {}", id), true))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Action {} not found", id)));
        }

        Ok(())
    }
}
