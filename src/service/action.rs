//! Action catalog business logic

use crate::cache::PermissionCache;
use crate::domain::{Action, CreateActionInput, StringUuid, UpdateActionInput};
use crate::error::{AppError, Result};
use crate::repository::ActionRepository;
use std::sync::Arc;
use validator::Validate;

pub struct ActionService {
    repo: Arc<dyn ActionRepository>,
    cache: PermissionCache,
}

impl ActionService {
    pub fn new(repo: Arc<dyn ActionRepository>, cache: PermissionCache) -> Self {
        Self { repo, cache }
    }

    pub async fn create(&self, input: CreateActionInput) -> Result<Action> {
        input.validate()?;
        let action = self.repo.create(&input).await?;
        // Denies cached while the slug was unknown must not outlive its creation
        self.cache.invalidate_action(&action.slug);
        Ok(action)
    }

    pub async fn get(&self, id: StringUuid) -> Result<Action> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Action {} not found", id)))
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Action> {
        self.repo
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Action '{}' not found", slug)))
    }

    pub async fn list(&self) -> Result<Vec<Action>> {
        self.repo.find_all().await
    }

    pub async fn update(&self, id: StringUuid, input: UpdateActionInput) -> Result<Action> {
        input.validate()?;
        let action = self.repo.update(id, &input).await?;
        self.cache.invalidate_action(&action.slug);
        Ok(action)
    }

    pub async fn delete(&self, id: StringUuid) -> Result<()> {
        let action = self.get(id).await?;
        self.repo.delete(id).await?;
        self.cache.invalidate_action(&action.slug);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::action::MockActionRepository;

    #[tokio::test]
    async fn test_create_rejects_lowercase_slug() {
        let mut mock = MockActionRepository::new();
        mock.expect_create().never();

        let service = ActionService::new(Arc::new(mock), PermissionCache::default());
        let result = service
            .create(CreateActionInput {
                slug: "project_view".to_string(),
                name: "View projects".to_string(),
                description: None,
                category: "project".to_string(),
            })
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_drops_cached_unknown_slug_denies() {
        let mut mock = MockActionRepository::new();
        mock.expect_create().returning(|input| {
            Ok(Action {
                slug: input.slug.clone(),
                name: input.name.clone(),
                category: input.category.clone(),
                ..Default::default()
            })
        });

        let cache = PermissionCache::default();
        let (plan, role) = (StringUuid::new_v4(), StringUuid::new_v4());
        cache.set(plan, role, "REPORT_EXPORT", false);

        let service = ActionService::new(Arc::new(mock), cache.clone());
        service
            .create(CreateActionInput {
                slug: "REPORT_EXPORT".to_string(),
                name: "Export reports".to_string(),
                description: None,
                category: "analytics".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(cache.get(plan, role, "REPORT_EXPORT"), None);
    }

    #[tokio::test]
    async fn test_delete_missing_action() {
        let mut mock = MockActionRepository::new();
        mock.expect_find_by_id().returning(|_| Ok(None));
        mock.expect_delete().never();

        let service = ActionService::new(Arc::new(mock), PermissionCache::default());
        let result = service.delete(StringUuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_in_use_is_rejected() {
        let mut mock = MockActionRepository::new();
        mock.expect_find_by_id().returning(|id| {
            Ok(Some(Action {
                id,
                slug: "PROJECT_DELETE".to_string(),
                ..Default::default()
            }))
        });
        mock.expect_delete()
            .returning(|_| Err(AppError::DependencyInUse("Action".to_string())));

        let service = ActionService::new(Arc::new(mock), PermissionCache::default());
        let result = service.delete(StringUuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::DependencyInUse(_))));
    }
}
