//! Response DTOs for the proxy's own endpoints
//!
//! Defines the structure of outgoing JSON bodies.

use serde::Serialize;

use crate::cache::StatsSnapshot;
use crate::worker::WorkerState;

/// Response body for the stats endpoint (GET /__offline/stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Lifecycle state of the interceptor
    pub state: WorkerState,
    /// Name of the current cache
    pub cache_name: String,
    /// Entries in the current cache
    pub cached_entries: usize,
    /// Request counters
    #[serde(flatten)]
    pub counters: StatsSnapshot,
    /// fallback_hits / (fallback_hits + fallback_misses)
    pub fallback_hit_rate: f64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from interceptor counters
    pub fn new(
        state: WorkerState,
        cache_name: impl Into<String>,
        cached_entries: usize,
        counters: StatsSnapshot,
    ) -> Self {
        let fallback_hit_rate = counters.fallback_hit_rate();
        Self {
            state,
            cache_name: cache_name.into(),
            cached_entries,
            counters,
            fallback_hit_rate,
        }
    }
}

/// Response body for the health endpoint (GET /__offline/health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
