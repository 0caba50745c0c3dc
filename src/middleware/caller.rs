//! Caller context extraction
//!
//! The session layer in front of this service resolves the signed-in user's
//! plan and role and forwards them as `x-plan-id` / `x-role-id`.

use crate::domain::{Caller, StringUuid};
use crate::error::AppError;
use axum::{extract::FromRequestParts, http::request::Parts};

pub const PLAN_ID_HEADER: &str = "x-plan-id";
pub const ROLE_ID_HEADER: &str = "x-role-id";

fn header_id(parts: &Parts, name: &str) -> Option<StringUuid> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match (
            header_id(parts, PLAN_ID_HEADER),
            header_id(parts, ROLE_ID_HEADER),
        ) {
            (Some(plan_id), Some(role_id)) => Ok(Caller { plan_id, role_id }),
            // No usable caller context is treated like a deny
            _ => Err(AppError::Forbidden(
                "missing or malformed caller headers".to_string(),
            )),
        }
    }
}
