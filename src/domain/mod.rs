//! Domain models for Plangate Core

pub mod action;
pub mod common;
pub mod module;
pub mod permission;
pub mod plan;
pub mod role;

pub use action::*;
pub use common::*;
pub use module::*;
pub use permission::*;
pub use plan::*;
pub use role::*;
