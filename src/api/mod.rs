//! REST API handlers and shared response types

pub mod action;
pub mod health;
pub mod metrics;
pub mod module;
pub mod permission;
pub mod plan;
pub mod role;

use serde::{Deserialize, Serialize};

/// Action a caller must be allowed to perform to change the catalog or the
/// permission tables
pub const MANAGE_PERMISSIONS_ACTION: &str = "ADMIN_PERMISSIONS_MANAGE";

/// Success response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse<T> {
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Message response (for delete, etc.)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
