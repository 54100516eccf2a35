//! Response models for the proxy's own endpoints
//!
//! Proxied traffic is passed through untouched; these DTOs only cover the
//! health, stats and error bodies the proxy produces itself.

pub mod responses;

// Re-export commonly used types
pub use responses::{ErrorResponse, HealthResponse, StatsResponse};
