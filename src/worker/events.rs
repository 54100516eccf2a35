//! Worker Events
//!
//! The three events a worker handles and what each one yields.

use serde::Serialize;

use crate::network::{FetchRequest, FetchResponse};

/// Event delivered by the host.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// Seed the store
    Install,
    /// Take control and drop outdated caches
    Activate,
    /// Answer an intercepted request
    Fetch(FetchRequest),
}

impl WorkerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Activate => "activate",
            Self::Fetch(_) => "fetch",
        }
    }
}

/// Completion value of a handled event.
#[derive(Debug, Clone)]
pub enum EventOutcome {
    Installed(InstallReport),
    Activated(ActivateReport),
    Responded(FetchResponse),
}

/// Result of the install handler.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InstallReport {
    /// Cache that was opened
    pub cache_name: String,
    /// Precache paths now in the store
    pub seeded: Vec<String>,
    /// Precache paths that could not be fetched
    pub failed: Vec<String>,
}

impl InstallReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Result of the activate handler.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActivateReport {
    /// Cache now in use
    pub cache_name: String,
    /// Outdated caches that were deleted
    pub deleted: Vec<String>,
}
