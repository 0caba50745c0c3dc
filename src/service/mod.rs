//! Business logic layer

pub mod access;
pub mod action;
pub mod entitlement;
pub mod evaluator;
pub mod module;
pub mod plan;
pub mod role;

pub use access::AccessControl;
pub use action::ActionService;
pub use entitlement::EntitlementService;
pub use evaluator::PermissionEvaluator;
pub use module::ModuleService;
pub use plan::PlanService;
pub use role::RoleService;
