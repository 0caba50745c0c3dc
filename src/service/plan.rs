//! Subscription plan business logic

use crate::cache::PermissionCache;
use crate::domain::{CreatePlanInput, Plan, StringUuid, UpdatePlanInput};
use crate::error::{AppError, Result};
use crate::repository::PlanRepository;
use std::sync::Arc;
use validator::Validate;

pub struct PlanService {
    repo: Arc<dyn PlanRepository>,
    cache: PermissionCache,
}

impl PlanService {
    pub fn new(repo: Arc<dyn PlanRepository>, cache: PermissionCache) -> Self {
        Self { repo, cache }
    }

    pub async fn create(&self, input: CreatePlanInput) -> Result<Plan> {
        input.validate()?;
        let plan = self.repo.create(&input).await?;
        self.cache.invalidate_plan(plan.id);
        Ok(plan)
    }

    pub async fn get(&self, id: StringUuid) -> Result<Plan> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Plan {} not found", id)))
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Plan> {
        self.repo
            .find_by_name(name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Plan '{}' not found", name)))
    }

    pub async fn list(&self) -> Result<Vec<Plan>> {
        self.repo.find_all().await
    }

    pub async fn update(&self, id: StringUuid, input: UpdatePlanInput) -> Result<Plan> {
        input.validate()?;
        let plan = self.repo.update(id, &input).await?;
        self.cache.invalidate_plan(id);
        Ok(plan)
    }

    pub async fn delete(&self, id: StringUuid) -> Result<()> {
        self.repo.delete(id).await?;
        self.cache.invalidate_plan(id);
        Ok(())
    }
}
