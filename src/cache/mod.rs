//! Cache Module
//!
//! Persistent response store keyed by request identity.

mod entry;
mod key;
mod stats;
mod store;


// Re-export public types
pub use entry::CachedResponse;
pub use key::RequestKey;
pub use stats::{FetchStats, StatsSnapshot};
pub use store::{validate_cache_name, CacheStorage, PendingWrite, ResponseCache};

// == Public Constants ==
/// Name of the current response cache
pub const DEFAULT_CACHE_NAME: &str = "kakeibo-v1";

/// Maximum request body forwarded upstream, in bytes
pub const MAX_BODY_SIZE: usize = 16 * 1024 * 1024; // 16 MB
