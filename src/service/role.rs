//! Role business logic

use crate::cache::PermissionCache;
use crate::domain::{CreateRoleInput, Role, StringUuid, UpdateRoleInput};
use crate::error::{AppError, Result};
use crate::repository::RoleRepository;
use std::sync::Arc;
use validator::Validate;

pub struct RoleService {
    repo: Arc<dyn RoleRepository>,
    cache: PermissionCache,
}

impl RoleService {
    pub fn new(repo: Arc<dyn RoleRepository>, cache: PermissionCache) -> Self {
        Self { repo, cache }
    }

    pub async fn create(&self, input: CreateRoleInput) -> Result<Role> {
        input.validate()?;
        let role = self.repo.create(&input).await?;
        self.cache.invalidate_role(role.id);
        Ok(role)
    }

    pub async fn get(&self, id: StringUuid) -> Result<Role> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Role {} not found", id)))
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Role> {
        self.repo
            .find_by_name(name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Role '{}' not found", name)))
    }

    /// Ordered by priority, then name. Priority is display order only.
    pub async fn list(&self) -> Result<Vec<Role>> {
        self.repo.find_all().await
    }

    pub async fn update(&self, id: StringUuid, input: UpdateRoleInput) -> Result<Role> {
        input.validate()?;
        let role = self.repo.update(id, &input).await?;
        self.cache.invalidate_role(id);
        Ok(role)
    }

    pub async fn delete(&self, id: StringUuid) -> Result<()> {
        self.repo.delete(id).await?;
        self.cache.invalidate_role(id);
        Ok(())
    }
}
