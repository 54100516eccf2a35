//! Worker Lifecycle
//!
//! States a worker moves through between startup and taking control.

use std::fmt;

use serde::Serialize;

// == Worker State ==
/// Lifecycle state of the interceptor.
///
/// `Parsed -> Installing -> Installed -> Activating -> Activated`. A failed
/// step falls back to the state it started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Created, no lifecycle event handled yet
    Parsed,
    /// Install handler running
    Installing,
    /// Installed, ready to activate right away
    Installed,
    /// Activate handler running
    Activating,
    /// In control; fetches are intercepted
    Activated,
}

impl WorkerState {
    /// Only an activated worker intercepts fetches.
    pub fn can_intercept_fetch(&self) -> bool {
        matches!(self, Self::Activated)
    }

    /// Whether moving from `self` to `next` is a legal step.
    pub fn can_transition_to(&self, next: WorkerState) -> bool {
        use WorkerState::*;
        matches!(
            (*self, next),
            (Parsed, Installing)
                | (Installing, Installed)
                | (Installing, Parsed)
                | (Installed, Activating)
                | (Activating, Activated)
                | (Activating, Installed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parsed => "parsed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Activated => "activated",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
