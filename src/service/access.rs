//! Cached permission checks for authorization guards and navigation

use super::evaluator::{record_outcome, PermissionEvaluator};
use crate::cache::PermissionCache;
use crate::domain::{Caller, NavigationGate, NavigationItem, StringUuid};
use crate::error::{AppError, Result};
use std::sync::Arc;
use tracing::{debug, error};

/// The entry point every consumer goes through: evaluator behind the cache.
#[derive(Clone)]
pub struct AccessControl {
    evaluator: Arc<PermissionEvaluator>,
    cache: PermissionCache,
}

impl AccessControl {
    pub fn new(evaluator: Arc<PermissionEvaluator>, cache: PermissionCache) -> Self {
        Self { evaluator, cache }
    }

    pub fn cache(&self) -> &PermissionCache {
        &self.cache
    }

    /// May `role_id` perform `action_slug` under `plan_id`.
    ///
    /// Served from the cache when possible. Failures deny and are not cached,
    /// so the next call retries the lookup.
    pub async fn can(&self, plan_id: StringUuid, role_id: StringUuid, action_slug: &str) -> bool {
        if let Some(allowed) = self.cache.get(plan_id, role_id, action_slug) {
            return allowed;
        }

        let generation = self.cache.generation();
        let outcome = self
            .evaluator
            .try_can_by_slug(plan_id, role_id, action_slug)
            .await;
        record_outcome(&outcome);

        match outcome {
            Ok(allowed) => {
                self.cache
                    .insert_if_current(plan_id, role_id, action_slug, allowed, generation);
                allowed
            }
            Err(e) => {
                error!(
                    plan_id = %plan_id,
                    role_id = %role_id,
                    action = action_slug,
                    error = %e,
                    "Permission evaluation failed; denying"
                );
                false
            }
        }
    }

    /// Plan-level feature gate, independent of role. Not cached.
    pub async fn is_enabled(&self, plan_id: StringUuid, action_slug: &str) -> bool {
        let outcome = self
            .evaluator
            .try_is_enabled_by_slug(plan_id, action_slug)
            .await;
        record_outcome(&outcome);

        outcome.unwrap_or_else(|e| {
            error!(
                plan_id = %plan_id,
                action = action_slug,
                error = %e,
                "Plan entitlement lookup failed; denying"
            );
            false
        })
    }

    /// Guard for mutating operations. A deny carries no detail.
    pub async fn authorize(&self, caller: &Caller, action_slug: &str) -> Result<()> {
        if self.can(caller.plan_id, caller.role_id, action_slug).await {
            Ok(())
        } else {
            debug!(
                plan_id = %caller.plan_id,
                role_id = %caller.role_id,
                action = action_slug,
                "Caller denied"
            );
            Err(AppError::Forbidden("Forbidden".to_string()))
        }
    }

    /// Keep only the entries the caller may see. Denied entries are dropped,
    /// never returned in a disabled state.
    pub async fn filter_navigation(
        &self,
        plan_id: StringUuid,
        role_id: StringUuid,
        items: Vec<NavigationItem>,
    ) -> Vec<NavigationItem> {
        let mut visible = Vec::with_capacity(items.len());
        for item in items {
            let shown = match &item.gate {
                NavigationGate::Open => true,
                NavigationGate::Plan { action } => self.is_enabled(plan_id, action).await,
                NavigationGate::Role { action } => self.can(plan_id, role_id, action).await,
            };
            if shown {
                visible.push(item);
            }
        }
        visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Action, PlanActionPermission, RoleActionPermission};
    use crate::repository::action::MockActionRepository;
    use crate::repository::permission::MockPermissionRepository;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn access(permissions: MockPermissionRepository, actions: MockActionRepository) -> AccessControl {
        AccessControl::new(
            Arc::new(PermissionEvaluator::new(Arc::new(permissions), Arc::new(actions))),
            PermissionCache::default(),
        )
    }

    fn slug_lookup() -> MockActionRepository {
        let mut actions = MockActionRepository::new();
        actions.expect_find_by_slug().returning(|slug| {
            Ok(Some(Action {
                slug: slug.to_string(),
                ..Default::default()
            }))
        });
        actions
    }

    fn granting_permissions(calls: Arc<AtomicUsize>) -> MockPermissionRepository {
        let mut permissions = MockPermissionRepository::new();
        permissions
            .expect_find_plan_action_permission()
            .returning(move |plan_id, action_id| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Some(PlanActionPermission {
                    id: StringUuid::new_v4(),
                    plan_id,
                    action_id,
                    enabled: true,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                }))
            });
        permissions
            .expect_find_role_action_permission()
            .returning(|plan_id, role_id, action_id| {
                Ok(Some(RoleActionPermission {
                    id: StringUuid::new_v4(),
                    plan_id,
                    role_id,
                    action_id,
                    allowed: true,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                }))
            });
        permissions
    }

    #[tokio::test]
    async fn test_second_check_is_served_from_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let access = access(granting_permissions(calls.clone()), slug_lookup());
        let (plan, role) = (StringUuid::new_v4(), StringUuid::new_v4());

        assert!(access.can(plan, role, "PROJECT_VIEW").await);
        assert!(access.can(plan, role, "PROJECT_VIEW").await);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(access.cache().get(plan, role, "PROJECT_VIEW"), Some(true));
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let mut permissions = MockPermissionRepository::new();
        permissions
            .expect_find_plan_action_permission()
            .times(2)
            .returning(|_, _| Err(AppError::Database(sqlx::Error::PoolTimedOut)));
        let access = access(permissions, slug_lookup());
        let (plan, role) = (StringUuid::new_v4(), StringUuid::new_v4());

        assert!(!access.can(plan, role, "PROJECT_VIEW").await);
        assert_eq!(access.cache().get(plan, role, "PROJECT_VIEW"), None);
        assert!(!access.can(plan, role, "PROJECT_VIEW").await);
    }

    #[tokio::test]
    async fn test_authorize_denies_with_generic_message() {
        let mut permissions = MockPermissionRepository::new();
        permissions
            .expect_find_plan_action_permission()
            .returning(|_, _| Ok(None));
        let access = access(permissions, slug_lookup());
        let caller = Caller {
            plan_id: StringUuid::new_v4(),
            role_id: StringUuid::new_v4(),
        };

        let err = access
            .authorize(&caller, "ADMIN_PERMISSIONS_MANAGE")
            .await
            .unwrap_err();
        match err {
            AppError::Forbidden(msg) => assert_eq!(msg, "Forbidden"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_filter_navigation_drops_denied_entries() {
        let mut actions = MockActionRepository::new();
        actions.expect_find_by_slug().returning(|slug| {
            // Only PROJECT_VIEW exists in the catalog
            Ok((slug == "PROJECT_VIEW").then(|| Action {
                slug: slug.to_string(),
                ..Default::default()
            }))
        });
        let access = access(
            granting_permissions(Arc::new(AtomicUsize::new(0))),
            actions,
        );

        let item = |key: &str, gate: NavigationGate| NavigationItem {
            key: key.to_string(),
            label: key.to_string(),
            href: format!("/{}", key),
            gate,
        };
        let items = vec![
            item("home", NavigationGate::Open),
            item(
                "projects",
                NavigationGate::Role {
                    action: "PROJECT_VIEW".to_string(),
                },
            ),
            item(
                "insights",
                NavigationGate::Plan {
                    action: "ANALYTICS_VIEW".to_string(),
                },
            ),
        ];

        let visible = access
            .filter_navigation(StringUuid::new_v4(), StringUuid::new_v4(), items)
            .await;
        let keys: Vec<&str> = visible.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["home", "projects"]);
    }
}
