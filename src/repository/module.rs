//! Feature module repository (modules and their action associations)

use crate::domain::{
    dedup_ids, CreateModuleInput, Module, ModuleAction, ModuleActionDetail,
    StringUuid, UpdateModuleInput,
};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::{MySql, MySqlPool, QueryBuilder};

const MODULE_COLUMNS: &str =
    "id, slug, name, description, icon, is_active, created_at, updated_at";

const MODULE_ACTION_DETAIL_QUERY: &str = r#"
    SELECT ma.id, ma.module_id, ma.action_id, a.slug AS action_slug, a.name AS action_name,
           a.category AS action_category, ma.created_at
    FROM module_actions ma
    INNER JOIN actions a ON a.id = ma.action_id
    WHERE ma.module_id = ?
    ORDER BY a.category ASC, a.name ASC
"#;

/// `UPDATE modules` writing only the columns present in the patch
fn update_query(id: StringUuid, input: &UpdateModuleInput) -> QueryBuilder<'static, MySql> {
    let mut builder = QueryBuilder::new("UPDATE modules SET ");
    {
        let mut set = builder.separated(", ");
        if let Some(name) = &input.name {
            set.push("name = ").push_bind_unseparated(name.clone());
        }
        if let Some(description) = &input.description {
            set.push("description = ")
                .push_bind_unseparated(description.clone());
        }
        if let Some(icon) = &input.icon {
            set.push("icon = ").push_bind_unseparated(icon.clone());
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
pub trait ModuleRepository: Send + Sync {
    /// All modules ordered by name
    async fn find_all(&self) -> Result<Vec<Module>>;
    async fn find_by_id(&self, id: StringUuid) -> Result<Option<Module>>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Module>>;
    async fn create(&self, input: &CreateModuleInput) -> Result<Module>;
    async fn update(&self, id: StringUuid, input: &UpdateModuleInput) -> Result<Module>;
    /// Insert or refresh the module keyed by slug
    async fn upsert_by_slug(&self, input: &CreateModuleInput) -> Result<Module>;
    /// Fails with `DependencyInUse` while the module still has actions
    async fn delete(&self, id: StringUuid) -> Result<()>;

    /// Idempotent: adding an existing pair returns the existing row
    async fn add_action(&self, module_id: StringUuid, action_id: StringUuid)
        -> Result<ModuleAction>;
    async fn remove_action(&self, module_id: StringUuid, action_id: StringUuid) -> Result<()>;
    /// Replace the module's whole action set in one unit of work. Readers see
    /// either the previous set or the new one, never a partial state.
    async fn set_actions(
        &self,
        module_id: StringUuid,
        action_ids: &[StringUuid],
    ) -> Result<Vec<ModuleActionDetail>>;
    /// Associations ordered by action category, then action name
    async fn find_actions(&self, module_id: StringUuid) -> Result<Vec<ModuleActionDetail>>;
}

pub struct ModuleRepositoryImpl {
    pool: MySqlPool,
}

impl ModuleRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn find_association(
        &self,
        module_id: StringUuid,
        action_id: StringUuid,
    ) -> Result<Option<ModuleAction>> {
        let row = sqlx::query_as::<_, ModuleAction>(
            "SELECT id, module_id, action_id, created_at FROM module_actions \
             WHERE module_id = ? AND action_id = ?",
        )
        .bind(module_id)
        .bind(action_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}

#[async_trait]
impl ModuleRepository for ModuleRepositoryImpl {
    async fn find_all(&self) -> Result<Vec<Module>> {
        let modules = sqlx::query_as::<_, Module>(&format!(
            "SELECT {} FROM modules ORDER BY name ASC",
            MODULE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(modules)
    }

    async fn find_by_id(&self, id: StringUuid) -> Result<Option<Module>> {
        let module = sqlx::query_as::<_, Module>(&format!(
            "SELECT {} FROM modules WHERE id = ?",
            MODULE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(module)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Module>> {
        let module = sqlx::query_as::<_, Module>(&format!(
            "SELECT {} FROM modules WHERE slug = ?",
            MODULE_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(module)
    }

    async fn create(&self, input: &CreateModuleInput) -> Result<Module> {
        let id = StringUuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO modules (id, slug, name, description, icon, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, NOW(), NOW())
            "#,
        )
        .bind(id)
        .bind(&input.slug)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.icon)
        .bind(input.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::from_write(e, &format!("Module '{}'", input.slug), false))?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to create module")))
    }

    async fn update(&self, id: StringUuid, input: &UpdateModuleInput) -> Result<Module> {
        update_query(id, input)
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::from_write(e, &format!("Module {}", id), false))?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Module {} not found", id)))
    }

    async fn upsert_by_slug(&self, input: &CreateModuleInput) -> Result<Module> {
        sqlx::query(
            r#"
            INSERT INTO modules (id, slug, name, description, icon, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, NOW(), NOW())
            ON DUPLICATE KEY UPDATE
                name = VALUES(name),
                description = VALUES(description),
                icon = VALUES(icon),
                is_active = VALUES(is_active),
                updated_at = NOW()
            "#,
        )
        .bind(StringUuid::new_v4())
        .bind(&input.slug)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.icon)
        .bind(input.is_active)
        .execute(&self.pool)
        .await?;

        self.find_by_slug(&input.slug)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to upsert module")))
    }

    async fn delete(&self, id: StringUuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM modules WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::from_write(e, &format!("Module {}", id), true))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Module {} not found", id)));
        }

        Ok(())
    }

    async fn add_action(
        &self,
        module_id: StringUuid,
        action_id: StringUuid,
    ) -> Result<ModuleAction> {
        sqlx::query(
            r#"
            INSERT INTO module_actions (id, module_id, action_id, created_at, updated_at)
            VALUES (?, ?, ?, NOW(), NOW())
            ON DUPLICATE KEY UPDATE updated_at = updated_at
            "#,
        )
        .bind(StringUuid::new_v4())
        .bind(module_id)
        .bind(action_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::from_write(e, "Module action", false))?;

        self.find_association(module_id, action_id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to add module action")))
    }

    async fn remove_action(&self, module_id: StringUuid, action_id: StringUuid) -> Result<()> {
        let result =
            sqlx::query("DELETE FROM module_actions WHERE module_id = ? AND action_id = ?")
                .bind(module_id)
                .bind(action_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Action {} is not part of module {}",
                action_id, module_id
            )));
        }

        Ok(())
    }

    async fn set_actions(
        &self,
        module_id: StringUuid,
        action_ids: &[StringUuid],
    ) -> Result<Vec<ModuleActionDetail>> {
        let mut tx = self.pool.begin().await?;

        // Row lock on the module serializes concurrent replacements
        let locked: Option<(StringUuid,)> =
            sqlx::query_as("SELECT id FROM modules WHERE id = ? FOR UPDATE")
                .bind(module_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(AppError::NotFound(format!("Module {} not found", module_id)));
        }

        sqlx::query("DELETE FROM module_actions WHERE module_id = ?")
            .bind(module_id)
            .execute(&mut *tx)
            .await?;

        for action_id in dedup_ids(action_ids) {
            sqlx::query(
                r#"
                INSERT INTO module_actions (id, module_id, action_id, created_at, updated_at)
                VALUES (?, ?, ?, NOW(), NOW())
                "#,
            )
            .bind(StringUuid::new_v4())
            .bind(module_id)
            .bind(action_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::from_write(e, &format!("Action {}", action_id), false))?;
        }

        // Dropping the transaction on any early return above rolls it back
        tx.commit().await?;

        self.find_actions(module_id).await
    }

    async fn find_actions(&self, module_id: StringUuid) -> Result<Vec<ModuleActionDetail>> {
        let rows = sqlx::query_as::<_, ModuleActionDetail>(MODULE_ACTION_DETAIL_QUERY)
            .bind(module_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }
}
