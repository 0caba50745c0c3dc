//! HTTP middleware for Plangate Core
//!
//! - Caller context extractor (`x-plan-id` / `x-role-id`)
//! - Request ID propagation and HTTP metrics

pub mod caller;
pub mod metrics;

pub use metrics::ObservabilityLayer;
