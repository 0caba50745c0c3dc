//! Feature module business logic
//!
//! Modules only group actions for navigation and admin screens. None of these
//! operations changes a permission decision, so none touches the cache.

use crate::domain::{
    CreateModuleInput, Module, ModuleAction, ModuleActionDetail, StringUuid, UpdateModuleInput,
};
use crate::error::{AppError, Result};
use crate::repository::{ActionRepository, ModuleRepository};
use std::sync::Arc;
use validator::Validate;

pub struct ModuleService {
    repo: Arc<dyn ModuleRepository>,
    actions: Arc<dyn ActionRepository>,
}

impl ModuleService {
    pub fn new(repo: Arc<dyn ModuleRepository>, actions: Arc<dyn ActionRepository>) -> Self {
        Self { repo, actions }
    }

    pub async fn create(&self, input: CreateModuleInput) -> Result<Module> {
        input.validate()?;
        self.repo.create(&input).await
    }

    pub async fn get(&self, id: StringUuid) -> Result<Module> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Module {} not found", id)))
    }

    pub async fn list(&self) -> Result<Vec<Module>> {
        self.repo.find_all().await
    }

    pub async fn update(&self, id: StringUuid, input: UpdateModuleInput) -> Result<Module> {
        input.validate()?;
        self.repo.update(id, &input).await
    }

    pub async fn delete(&self, id: StringUuid) -> Result<()> {
        self.repo.delete(id).await
    }

    pub async fn list_actions(&self, module_id: StringUuid) -> Result<Vec<ModuleActionDetail>> {
        let _ = self.get(module_id).await?;
        self.repo.find_actions(module_id).await
    }

    pub async fn add_action(
        &self,
        module_id: StringUuid,
        action_id: StringUuid,
    ) -> Result<ModuleAction> {
        let _ = self.get(module_id).await?;
        self.ensure_action(action_id).await?;
        self.repo.add_action(module_id, action_id).await
    }

    pub async fn remove_action(&self, module_id: StringUuid, action_id: StringUuid) -> Result<()> {
        self.repo.remove_action(module_id, action_id).await
    }

    /// Replace the module's action set. Repeated ids collapse to one row; an
    /// unknown id fails the whole call and leaves the previous set in place.
    pub async fn set_actions(
        &self,
        module_id: StringUuid,
        action_ids: Vec<StringUuid>,
    ) -> Result<Vec<ModuleActionDetail>> {
        let _ = self.get(module_id).await?;
        self.repo.set_actions(module_id, &action_ids).await
    }

    async fn ensure_action(&self, action_id: StringUuid) -> Result<()> {
        self.actions
            .find_by_id(action_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Action {} not found", action_id)))
    }
}
