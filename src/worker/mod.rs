//! Worker Module
//!
//! The interceptor and the lifecycle it follows.
//!
//! # Events
//! - `Install` - open the current cache and seed the application shell
//! - `Activate` - take control, delete outdated caches
//! - `Fetch` - network first, stored response on failure

mod events;
mod interceptor;
mod lifecycle;

pub use events::{ActivateReport, EventOutcome, InstallReport, WorkerEvent};
pub use interceptor::{Interceptor, WorkerSettings};
pub use lifecycle::WorkerState;
