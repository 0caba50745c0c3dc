//! Plangate Core - plan entitlement and role allowance engine
//!
//! Decides whether a role, under a subscription plan, may perform an action.
//! A decision is the plan entitlement AND the role allowance, served through
//! an in-process TTL cache that every mutation invalidates before returning.
//! Also ships the action/role/plan/module catalog stores, an idempotent seed
//! pipeline and an admin REST API.

pub mod api;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod repository;
pub mod seed;
pub mod server;
pub mod service;
pub mod telemetry;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
