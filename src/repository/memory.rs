//! In-memory implementation of every repository trait.
//!
//! Backs the test suite and `STORE_BACKEND=memory`. State lives in one set of
//! tables behind a single `tokio::sync::RwLock`, so every mutation (including
//! the restrict checks on delete and the replace-all of a module's action set)
//! is applied as one step: readers see the state before it or after it.
//!
//! Not durable, and each process has its own copy.

use super::{
    ActionRepository, ModuleRepository, PermissionRepository, PlanRepository, RoleRepository,
};
use crate::domain::{
    apply_nullable, dedup_ids, Action, CreateActionInput, CreateModuleInput, CreatePlanInput,
    CreateRoleInput, Module, ModuleAction, ModuleActionDetail, Plan, PlanActionPermission, Role,
    RoleActionPermission, StringUuid, UpdateActionInput, UpdateModuleInput, UpdatePlanInput,
    UpdateRoleInput,
};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    roles: HashMap<StringUuid, Role>,
    actions: HashMap<StringUuid, Action>,
    plans: HashMap<StringUuid, Plan>,
    modules: HashMap<StringUuid, Module>,
    module_actions: HashMap<(StringUuid, StringUuid), ModuleAction>,
    plan_permissions: HashMap<(StringUuid, StringUuid), PlanActionPermission>,
    role_permissions: HashMap<(StringUuid, StringUuid, StringUuid), RoleActionPermission>,
}

impl Tables {
    fn role_name_taken(&self, name: &str, except: Option<StringUuid>) -> bool {
        self.roles
            .values()
            .any(|r| r.name == name && Some(r.id) != except)
    }

    fn plan_name_taken(&self, name: &str, except: Option<StringUuid>) -> bool {
        self.plans
            .values()
            .any(|p| p.name == name && Some(p.id) != except)
    }

    fn module_details(&self, module_id: StringUuid) -> Vec<ModuleActionDetail> {
        let mut rows: Vec<ModuleActionDetail> = self
            .module_actions
            .values()
            .filter(|ma| ma.module_id == module_id)
            .filter_map(|ma| {
                let action = self.actions.get(&ma.action_id)?;
                Some(ModuleActionDetail {
                    id: ma.id,
                    module_id: ma.module_id,
                    action_id: ma.action_id,
                    action_slug: action.slug.clone(),
                    action_name: action.name.clone(),
                    action_category: action.category.clone(),
                    created_at: ma.created_at,
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            a.action_category
                .cmp(&b.action_category)
                .then_with(|| a.action_name.cmp(&b.action_name))
        });
        rows
    }
}

/// Shared in-memory store. Cloning shares the underlying tables.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn in_use(entity: String) -> AppError {
    AppError::DependencyInUse(format!("{} is still referenced by other records", entity))
}

#[async_trait]
impl RoleRepository for InMemoryStore {
    async fn find_all(&self) -> Result<Vec<Role>> {
        let tables = self.tables.read().await;
        let mut roles: Vec<Role> = tables.roles.values().cloned().collect();
        roles.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.name.cmp(&b.name)));
        Ok(roles)
    }

    async fn find_by_id(&self, id: StringUuid) -> Result<Option<Role>> {
        Ok(self.tables.read().await.roles.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Role>> {
        let tables = self.tables.read().await;
        Ok(tables.roles.values().find(|r| r.name == name).cloned())
    }

    async fn create(&self, input: &CreateRoleInput) -> Result<Role> {
        let mut tables = self.tables.write().await;
        if tables.role_name_taken(&input.name, None) {
            return Err(AppError::Duplicate(format!(
                "Role '{}' already exists",
                input.name
            )));
        }

        let now = Utc::now();
        let role = Role {
            id: StringUuid::new_v4(),
            name: input.name.clone(),
            priority: input.priority,
            description: input.description.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn update(&self, id: StringUuid, input: &UpdateRoleInput) -> Result<Role> {
        let mut tables = self.tables.write().await;
        if let Some(name) = &input.name {
            if tables.role_name_taken(name, Some(id)) {
                return Err(AppError::Duplicate(format!("Role '{}' already exists", name)));
            }
        }

        let role = tables
            .roles
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Role {} not found", id)))?;
        if let Some(name) = &input.name {
            role.name = name.clone();
        }
        if let Some(priority) = input.priority {
            role.priority = priority;
        }
        role.description = apply_nullable(&input.description, &role.description);
        role.updated_at = Utc::now();
        Ok(role.clone())
    }

    async fn upsert_by_name(&self, input: &CreateRoleInput) -> Result<Role> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        if let Some(role) = tables.roles.values_mut().find(|r| r.name == input.name) {
            role.priority = input.priority;
            role.description = input.description.clone();
            role.updated_at = now;
            return Ok(role.clone());
        }

        let role = Role {
            id: StringUuid::new_v4(),
            name: input.name.clone(),
            priority: input.priority,
            description: input.description.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn delete(&self, id: StringUuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.roles.contains_key(&id) {
            return Err(AppError::NotFound(format!("Role {} not found", id)));
        }
        if tables.role_permissions.values().any(|p| p.role_id == id) {
            return Err(in_use(format!("Role {}", id)));
        }
        tables.roles.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl ActionRepository for InMemoryStore {
    async fn find_all(&self) -> Result<Vec<Action>> {
        let tables = self.tables.read().await;
        let mut actions: Vec<Action> = tables.actions.values().cloned().collect();
        actions.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(actions)
    }

    async fn find_by_id(&self, id: StringUuid) -> Result<Option<Action>> {
        Ok(self.tables.read().await.actions.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Action>> {
        let tables = self.tables.read().await;
        Ok(tables.actions.values().find(|a| a.slug == slug).cloned())
    }

    async fn create(&self, input: &CreateActionInput) -> Result<Action> {
        let mut tables = self.tables.write().await;
        if tables.actions.values().any(|a| a.slug == input.slug) {
            return Err(AppError::Duplicate(format!(
                "Action '{}' already exists",
                input.slug
            )));
        }

        let now = Utc::now();
        let action = Action {
            id: StringUuid::new_v4(),
            slug: input.slug.clone(),
            name: input.name.clone(),
            description: input.description.clone(),
            category: input.category.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.actions.insert(action.id, action.clone());
        Ok(action)
    }

    async fn update(&self, id: StringUuid, input: &UpdateActionInput) -> Result<Action> {
        let mut tables = self.tables.write().await;
        let action = tables
            .actions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Action {} not found", id)))?;
        if let Some(name) = &input.name {
            action.name = name.clone();
        }
        if let Some(category) = &input.category {
            action.category = category.clone();
        }
        action.description = apply_nullable(&input.description, &action.description);
        action.updated_at = Utc::now();
        Ok(action.clone())
    }

    async fn upsert_by_slug(&self, input: &CreateActionInput) -> Result<Action> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        if let Some(action) = tables.actions.values_mut().find(|a| a.slug == input.slug) {
            action.name = input.name.clone();
            action.description = input.description.clone();
            action.category = input.category.clone();
            action.updated_at = now;
            return Ok(action.clone());
        }

        let action = Action {
            id: StringUuid::new_v4(),
            slug: input.slug.clone(),
            name: input.name.clone(),
            description: input.description.clone(),
            category: input.category.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.actions.insert(action.id, action.clone());
        Ok(action)
    }

    async fn delete(&self, id: StringUuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.actions.contains_key(&id) {
            return Err(AppError::NotFound(format!("Action {} not found", id)));
        }
        let referenced = tables.plan_permissions.values().any(|p| p.action_id == id)
            || tables.role_permissions.values().any(|p| p.action_id == id)
            || tables.module_actions.values().any(|ma| ma.action_id == id);
        if referenced {
            return Err(in_use(format!("Action {}", id)));
        }
        tables.actions.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl PlanRepository for InMemoryStore {
    async fn find_all(&self) -> Result<Vec<Plan>> {
        let tables = self.tables.read().await;
        let mut plans: Vec<Plan> = tables.plans.values().cloned().collect();
        plans.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(plans)
    }

    async fn find_by_id(&self, id: StringUuid) -> Result<Option<Plan>> {
        Ok(self.tables.read().await.plans.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Plan>> {
        let tables = self.tables.read().await;
        Ok(tables.plans.values().find(|p| p.name == name).cloned())
    }

    async fn create(&self, input: &CreatePlanInput) -> Result<Plan> {
        let mut tables = self.tables.write().await;
        if tables.plan_name_taken(&input.name, None) {
            return Err(AppError::Duplicate(format!(
                "Plan '{}' already exists",
                input.name
            )));
        }

        let now = Utc::now();
        let plan = Plan {
            id: StringUuid::new_v4(),
            name: input.name.clone(),
            display_name: input.display_name.clone(),
            description: input.description.clone(),
            stripe_price_id_monthly: input.stripe_price_id_monthly.clone(),
            stripe_price_id_yearly: input.stripe_price_id_yearly.clone(),
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        };
        tables.plans.insert(plan.id, plan.clone());
        Ok(plan)
    }

    async fn update(&self, id: StringUuid, input: &UpdatePlanInput) -> Result<Plan> {
        let mut tables = self.tables.write().await;
        if let Some(name) = &input.name {
            if tables.plan_name_taken(name, Some(id)) {
                return Err(AppError::Duplicate(format!("Plan '{}' already exists", name)));
            }
        }

        let plan = tables
            .plans
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Plan {} not found", id)))?;
        if let Some(name) = &input.name {
            plan.name = name.clone();
        }
        if let Some(display_name) = &input.display_name {
            plan.display_name = display_name.clone();
        }
        plan.description = apply_nullable(&input.description, &plan.description);
        plan.stripe_price_id_monthly = apply_nullable(
            &input.stripe_price_id_monthly,
            &plan.stripe_price_id_monthly,
        );
        plan.stripe_price_id_yearly =
            apply_nullable(&input.stripe_price_id_yearly, &plan.stripe_price_id_yearly);
        if let Some(is_active) = input.is_active {
            plan.is_active = is_active;
        }
        plan.updated_at = Utc::now();
        Ok(plan.clone())
    }

    async fn upsert_by_name(&self, input: &CreatePlanInput) -> Result<Plan> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        if let Some(plan) = tables.plans.values_mut().find(|p| p.name == input.name) {
            plan.display_name = input.display_name.clone();
            plan.description = input.description.clone();
            plan.stripe_price_id_monthly = input.stripe_price_id_monthly.clone();
            plan.stripe_price_id_yearly = input.stripe_price_id_yearly.clone();
            plan.is_active = input.is_active;
            plan.updated_at = now;
            return Ok(plan.clone());
        }

        let plan = Plan {
            id: StringUuid::new_v4(),
            name: input.name.clone(),
            display_name: input.display_name.clone(),
            description: input.description.clone(),
            stripe_price_id_monthly: input.stripe_price_id_monthly.clone(),
            stripe_price_id_yearly: input.stripe_price_id_yearly.clone(),
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        };
        tables.plans.insert(plan.id, plan.clone());
        Ok(plan)
    }

    async fn delete(&self, id: StringUuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.plans.contains_key(&id) {
            return Err(AppError::NotFound(format!("Plan {} not found", id)));
        }
        let referenced = tables.plan_permissions.values().any(|p| p.plan_id == id)
            || tables.role_permissions.values().any(|p| p.plan_id == id);
        if referenced {
            return Err(in_use(format!("Plan {}", id)));
        }
        tables.plans.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl ModuleRepository for InMemoryStore {
    async fn find_all(&self) -> Result<Vec<Module>> {
        let tables = self.tables.read().await;
        let mut modules: Vec<Module> = tables.modules.values().cloned().collect();
        modules.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(modules)
    }

    async fn find_by_id(&self, id: StringUuid) -> Result<Option<Module>> {
        Ok(self.tables.read().await.modules.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Module>> {
        let tables = self.tables.read().await;
        Ok(tables.modules.values().find(|m| m.slug == slug).cloned())
    }

    async fn create(&self, input: &CreateModuleInput) -> Result<Module> {
        let mut tables = self.tables.write().await;
        if tables.modules.values().any(|m| m.slug == input.slug) {
            return Err(AppError::Duplicate(format!(
                "Module '{}' already exists",
                input.slug
            )));
        }

        let now = Utc::now();
        let module = Module {
            id: StringUuid::new_v4(),
            slug: input.slug.clone(),
            name: input.name.clone(),
            description: input.description.clone(),
            icon: input.icon.clone(),
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        };
        tables.modules.insert(module.id, module.clone());
        Ok(module)
    }

    async fn update(&self, id: StringUuid, input: &UpdateModuleInput) -> Result<Module> {
        let mut tables = self.tables.write().await;
        let module = tables
            .modules
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Module {} not found", id)))?;
        if let Some(name) = &input.name {
            module.name = name.clone();
        }
        module.description = apply_nullable(&input.description, &module.description);
        module.icon = apply_nullable(&input.icon, &module.icon);
        if let Some(is_active) = input.is_active {
            module.is_active = is_active;
        }
        module.updated_at = Utc::now();
        Ok(module.clone())
    }

    async fn upsert_by_slug(&self, input: &CreateModuleInput) -> Result<Module> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        if let Some(module) = tables.modules.values_mut().find(|m| m.slug == input.slug) {
            module.name = input.name.clone();
            module.description = input.description.clone();
            module.icon = input.icon.clone();
            module.is_active = input.is_active;
            module.updated_at = now;
            return Ok(module.clone());
        }

        let module = Module {
            id: StringUuid::new_v4(),
            slug: input.slug.clone(),
            name: input.name.clone(),
            description: input.description.clone(),
            icon: input.icon.clone(),
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        };
        tables.modules.insert(module.id, module.clone());
        Ok(module)
    }

    async fn delete(&self, id: StringUuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.modules.contains_key(&id) {
            return Err(AppError::NotFound(format!("Module {} not found", id)));
        }
        if tables.module_actions.values().any(|ma| ma.module_id == id) {
            return Err(in_use(format!("Module {}", id)));
        }
        tables.modules.remove(&id);
        Ok(())
    }

    async fn add_action(
        &self,
        module_id: StringUuid,
        action_id: StringUuid,
    ) -> Result<ModuleAction> {
        let mut tables = self.tables.write().await;
        if !tables.modules.contains_key(&module_id) || !tables.actions.contains_key(&action_id) {
            return Err(AppError::NotFound(
                "Referenced record for Module action not found".to_string(),
            ));
        }

        let row = tables
            .module_actions
            .entry((module_id, action_id))
            .or_insert_with(|| ModuleAction {
                id: StringUuid::new_v4(),
                module_id,
                action_id,
                created_at: Utc::now(),
            });
        Ok(row.clone())
    }

    async fn remove_action(&self, module_id: StringUuid, action_id: StringUuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables
            .module_actions
            .remove(&(module_id, action_id))
            .map(|_| ())
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Action {} is not part of module {}",
                    action_id, module_id
                ))
            })
    }

    async fn set_actions(
        &self,
        module_id: StringUuid,
        action_ids: &[StringUuid],
    ) -> Result<Vec<ModuleActionDetail>> {
        let mut tables = self.tables.write().await;
        if !tables.modules.contains_key(&module_id) {
            return Err(AppError::NotFound(format!("Module {} not found", module_id)));
        }

        // Validate everything before touching the current set
        let ids = dedup_ids(action_ids);
        if let Some(missing) = ids.iter().find(|id| !tables.actions.contains_key(*id)) {
            return Err(AppError::NotFound(format!(
                "Referenced record for Action {} not found",
                missing
            )));
        }

        let now = Utc::now();
        tables
            .module_actions
            .retain(|(module, _), _| *module != module_id);
        for action_id in ids {
            tables.module_actions.insert(
                (module_id, action_id),
                ModuleAction {
                    id: StringUuid::new_v4(),
                    module_id,
                    action_id,
                    created_at: now,
                },
            );
        }

        Ok(tables.module_details(module_id))
    }

    async fn find_actions(&self, module_id: StringUuid) -> Result<Vec<ModuleActionDetail>> {
        Ok(self.tables.read().await.module_details(module_id))
    }
}

#[async_trait]
impl PermissionRepository for InMemoryStore {
    async fn upsert_plan_action_permission(
        &self,
        plan_id: StringUuid,
        action_id: StringUuid,
        enabled: bool,
    ) -> Result<PlanActionPermission> {
        let mut tables = self.tables.write().await;
        if !tables.plans.contains_key(&plan_id) || !tables.actions.contains_key(&action_id) {
            return Err(AppError::NotFound(
                "Referenced record for Plan action permission not found".to_string(),
            ));
        }

        let now = Utc::now();
        let row = tables
            .plan_permissions
            .entry((plan_id, action_id))
            .and_modify(|row| {
                row.enabled = enabled;
                row.updated_at = now;
            })
            .or_insert_with(|| PlanActionPermission {
                id: StringUuid::new_v4(),
                plan_id,
                action_id,
                enabled,
                created_at: now,
                updated_at: now,
            });
        Ok(row.clone())
    }

    async fn delete_plan_action_permission(
        &self,
        plan_id: StringUuid,
        action_id: StringUuid,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables
            .plan_permissions
            .remove(&(plan_id, action_id))
            .map(|_| ())
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "No entitlement for action {} in plan {}",
                    action_id, plan_id
                ))
            })
    }

    async fn find_plan_action_permission(
        &self,
        plan_id: StringUuid,
        action_id: StringUuid,
    ) -> Result<Option<PlanActionPermission>> {
        let tables = self.tables.read().await;
        Ok(tables.plan_permissions.get(&(plan_id, action_id)).cloned())
    }

    async fn find_plan_action_permissions(
        &self,
        plan_id: StringUuid,
    ) -> Result<Vec<PlanActionPermission>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<PlanActionPermission> = tables
            .plan_permissions
            .values()
            .filter(|p| p.plan_id == plan_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.action_id.cmp(&b.action_id));
        Ok(rows)
    }

    async fn upsert_role_action_permission(
        &self,
        plan_id: StringUuid,
        role_id: StringUuid,
        action_id: StringUuid,
        allowed: bool,
    ) -> Result<RoleActionPermission> {
        let mut tables = self.tables.write().await;
        if !tables.plans.contains_key(&plan_id)
            || !tables.roles.contains_key(&role_id)
            || !tables.actions.contains_key(&action_id)
        {
            return Err(AppError::NotFound(
                "Referenced record for Role action permission not found".to_string(),
            ));
        }

        let now = Utc::now();
        let row = tables
            .role_permissions
            .entry((plan_id, role_id, action_id))
            .and_modify(|row| {
                row.allowed = allowed;
                row.updated_at = now;
            })
            .or_insert_with(|| RoleActionPermission {
                id: StringUuid::new_v4(),
                plan_id,
                role_id,
                action_id,
                allowed,
                created_at: now,
                updated_at: now,
            });
        Ok(row.clone())
    }

    async fn delete_role_action_permission(
        &self,
        plan_id: StringUuid,
        role_id: StringUuid,
        action_id: StringUuid,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables
            .role_permissions
            .remove(&(plan_id, role_id, action_id))
            .map(|_| ())
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "No allowance for role {} and action {} in plan {}",
                    role_id, action_id, plan_id
                ))
            })
    }

    async fn find_role_action_permission(
        &self,
        plan_id: StringUuid,
        role_id: StringUuid,
        action_id: StringUuid,
    ) -> Result<Option<RoleActionPermission>> {
        let tables = self.tables.read().await;
        Ok(tables
            .role_permissions
            .get(&(plan_id, role_id, action_id))
            .cloned())
    }

    async fn find_role_action_permissions(
        &self,
        plan_id: StringUuid,
        role_id: Option<StringUuid>,
    ) -> Result<Vec<RoleActionPermission>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<RoleActionPermission> = tables
            .role_permissions
            .values()
            .filter(|p| p.plan_id == plan_id && role_id.map_or(true, |r| p.role_id == r))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.role_id
                .cmp(&b.role_id)
                .then_with(|| a.action_id.cmp(&b.action_id))
        });
        Ok(rows)
    }
}
