//! Idempotent bootstrap of roles, actions, plans, modules and permission tables
//!
//! Every write is an upsert, so the pipeline can run on every deploy. Role
//! allowances are derived per plan as `nominal(role) ∩ enabled(plan)`: a role
//! granted "everything" still only receives what the plan entitles.

pub mod catalog;

use crate::cache::PermissionCache;
use crate::domain::{
    CreateActionInput, CreateModuleInput, CreatePlanInput, CreateRoleInput, StringUuid,
};
use crate::error::Result;
use crate::repository::{
    ActionRepository, ModuleRepository, PermissionRepository, PlanRepository, Repositories,
    RoleRepository,
};
use catalog::{PlanSeed, RoleGrant, ACTIONS, MODULES, PLANS, ROLES};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::info;

/// Rows written (or refreshed) by one run
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub actions: usize,
    pub roles: usize,
    pub plans: usize,
    pub modules: usize,
    pub module_actions: usize,
    pub plan_action_permissions: usize,
    pub role_action_permissions: usize,
    /// `allowed=true` rows removed because the plan no longer entitles the action
    pub pruned_role_action_permissions: usize,
}

/// Actions a role receives under a plan: its nominal grant limited to the
/// plan's enabled list.
pub fn derive_role_allowances(grant: &RoleGrant, plan: &PlanSeed) -> BTreeSet<&'static str> {
    plan.enabled
        .iter()
        .copied()
        .filter(|slug| grant.includes(slug))
        .collect()
}

pub struct Seeder {
    repos: Repositories,
    cache: PermissionCache,
}

impl Seeder {
    pub fn new(repos: Repositories, cache: PermissionCache) -> Self {
        Self { repos, cache }
    }

    pub async fn run(&self) -> Result<SeedReport> {
        let mut report = SeedReport::default();

        info!("Seeding action catalog...");
        let mut action_ids: HashMap<&str, StringUuid> = HashMap::new();
        for seed in ACTIONS {
            let action = self
                .repos
                .actions
                .upsert_by_slug(&CreateActionInput {
                    slug: seed.slug.to_string(),
                    name: seed.name.to_string(),
                    description: Some(seed.description.to_string()),
                    category: seed.category.to_string(),
                })
                .await?;
            action_ids.insert(seed.slug, action.id);
            report.actions += 1;
        }

        info!("Seeding roles...");
        let mut role_ids: Vec<(StringUuid, &RoleGrant)> = Vec::new();
        for seed in ROLES {
            let role = self
                .repos
                .roles
                .upsert_by_name(&CreateRoleInput {
                    name: seed.name.to_string(),
                    priority: seed.priority,
                    description: Some(seed.description.to_string()),
                })
                .await?;
            role_ids.push((role.id, &seed.grant));
            report.roles += 1;
        }

        info!("Seeding modules...");
        for seed in MODULES {
            let module = self
                .repos
                .modules
                .upsert_by_slug(&CreateModuleInput {
                    slug: seed.slug.to_string(),
                    name: seed.name.to_string(),
                    description: None,
                    icon: Some(seed.icon.to_string()),
                    is_active: true,
                })
                .await?;
            report.modules += 1;

            // Additive so associations added by an admin survive a re-run
            for slug in seed.actions {
                if let Some(action_id) = action_ids.get(slug) {
                    self.repos.modules.add_action(module.id, *action_id).await?;
                    report.module_actions += 1;
                }
            }
        }

        info!("Seeding plans and permission tables...");
        for seed in PLANS {
            let plan = self
                .repos
                .plans
                .upsert_by_name(&CreatePlanInput {
                    name: seed.name.to_string(),
                    display_name: seed.display_name.to_string(),
                    description: Some(seed.description.to_string()),
                    stripe_price_id_monthly: None,
                    stripe_price_id_yearly: None,
                    is_active: true,
                })
                .await?;
            report.plans += 1;

            // One entitlement row per catalog action keeps the admin matrix complete
            let enabled: HashSet<StringUuid> = seed
                .enabled
                .iter()
                .filter_map(|slug| action_ids.get(slug).copied())
                .collect();
            for action_id in action_ids.values() {
                self.repos
                    .permissions
                    .upsert_plan_action_permission(
                        plan.id,
                        *action_id,
                        enabled.contains(action_id),
                    )
                    .await?;
                report.plan_action_permissions += 1;
            }

            for (role_id, grant) in &role_ids {
                for slug in derive_role_allowances(grant, seed) {
                    if let Some(action_id) = action_ids.get(slug) {
                        self.repos
                            .permissions
                            .upsert_role_action_permission(plan.id, *role_id, *action_id, true)
                            .await?;
                        report.role_action_permissions += 1;
                    }
                }

                // Only rows outside the plan are pruned; grants added through
                // the admin API inside the plan survive re-runs.
                let existing = self
                    .repos
                    .permissions
                    .find_role_action_permissions(plan.id, Some(*role_id))
                    .await?;
                for row in existing {
                    if row.allowed && !enabled.contains(&row.action_id) {
                        self.repos
                            .permissions
                            .delete_role_action_permission(plan.id, *role_id, row.action_id)
                            .await?;
                        report.pruned_role_action_permissions += 1;
                    }
                }
            }
        }

        self.cache.clear();
        info!(
            actions = report.actions,
            roles = report.roles,
            plans = report.plans,
            role_action_permissions = report.role_action_permissions,
            pruned = report.pruned_role_action_permissions,
            "Seeding completed"
        );
        Ok(report)
    }
}
