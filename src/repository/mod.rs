//! Data access layer (Repository pattern)

pub mod action;
pub mod memory;
pub mod module;
pub mod permission;
pub mod plan;
pub mod role;

pub use action::{ActionRepository, ActionRepositoryImpl};
pub use memory::InMemoryStore;
pub use module::{ModuleRepository, ModuleRepositoryImpl};
pub use permission::{PermissionRepository, PermissionRepositoryImpl};
pub use plan::{PlanRepository, PlanRepositoryImpl};
pub use role::{RoleRepository, RoleRepositoryImpl};

use sqlx::MySqlPool;
use std::sync::Arc;

/// One handle per store, shared by the services.
#[derive(Clone)]
pub struct Repositories {
    pub roles: Arc<dyn RoleRepository>,
    pub actions: Arc<dyn ActionRepository>,
    pub plans: Arc<dyn PlanRepository>,
    pub modules: Arc<dyn ModuleRepository>,
    pub permissions: Arc<dyn PermissionRepository>,
}

impl Repositories {
    /// MySQL-backed stores sharing one pool
    pub fn mysql(pool: MySqlPool) -> Self {
        Self {
            roles: Arc::new(RoleRepositoryImpl::new(pool.clone())),
            actions: Arc::new(ActionRepositoryImpl::new(pool.clone())),
            plans: Arc::new(PlanRepositoryImpl::new(pool.clone())),
            modules: Arc::new(ModuleRepositoryImpl::new(pool.clone())),
            permissions: Arc::new(PermissionRepositoryImpl::new(pool)),
        }
    }

    /// All stores backed by the same in-memory tables
    pub fn in_memory(store: InMemoryStore) -> Self {
        Self {
            roles: Arc::new(store.clone()),
            actions: Arc::new(store.clone()),
            plans: Arc::new(store.clone()),
            modules: Arc::new(store.clone()),
            permissions: Arc::new(store),
        }
    }
}
