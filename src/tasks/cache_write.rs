//! Background Cache Write
//!
//! Detached task that stores a network response without holding up the caller.

use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::{CacheStorage, CachedResponse, FetchStats, RequestKey};
use crate::error::Result;

/// Spawns a task that writes `entry` under `key` in the named cache.
///
/// The storage write lock is held only for the in-memory update; the file
/// write happens after it is released. The caller is expected to drop the
/// returned handle; it exists so tests can wait for the write. Failures are
/// logged and counted, never returned.
///
/// # Example
/// ```ignore
/// let entry = CachedResponse::from_response(&response);
/// spawn_cache_write(storage.clone(), stats.clone(), "kakeibo-v1".into(), key, entry);
/// // respond immediately, the write completes on its own
/// ```
pub fn spawn_cache_write(
    storage: Arc<RwLock<CacheStorage>>,
    stats: Arc<FetchStats>,
    cache_name: String,
    key: RequestKey,
    entry: CachedResponse,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result: Result<()> = async {
            let pending = storage.write().await.stage_put(&cache_name, &key, entry)?;
            match pending {
                Some(pending) => pending.commit().await,
                None => Ok(()),
            }
        }
        .await;

        match result {
            Ok(()) => {
                stats.record_write();
                debug!("Stored {} in '{}'", key, cache_name);
            }
            Err(e) => {
                stats.record_failed_write();
                warn!("Failed to store {} in '{}': {}", key, cache_name, e);
            }
        }
    })
}
