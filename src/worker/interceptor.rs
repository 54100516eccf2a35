//! Network Interceptor
//!
//! Network-first request handling with fallback to the persistent store.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::{
    CacheStorage, CachedResponse, FetchStats, StatsSnapshot, DEFAULT_CACHE_NAME,
};
use crate::config::{Config, DEFAULT_BYPASS_PATTERN};
use crate::error::{ProxyError, Result};
use crate::network::{FetchRequest, FetchResponse, Network, NetworkError};
use crate::tasks::spawn_cache_write;

use super::events::{ActivateReport, EventOutcome, InstallReport, WorkerEvent};
use super::lifecycle::WorkerState;

// == Worker Settings ==
/// The parts of [`Config`] the interceptor cares about.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Current cache; every other cache is deleted on activate
    pub cache_name: String,
    /// URL substring that is never read from or written to the store
    pub bypass_pattern: String,
    /// Paths seeded on install
    pub precache_urls: Vec<String>,
}

impl WorkerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cache_name: config.cache_name.clone(),
            bypass_pattern: config.bypass_pattern.clone(),
            precache_urls: config.precache_urls.clone(),
        }
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            cache_name: DEFAULT_CACHE_NAME.to_string(),
            bypass_pattern: DEFAULT_BYPASS_PATTERN.to_string(),
            precache_urls: vec!["/".to_string()],
        }
    }
}

// == Interceptor ==
/// Handles install, activate and fetch events.
pub struct Interceptor {
    settings: WorkerSettings,
    storage: Arc<RwLock<CacheStorage>>,
    network: Arc<dyn Network>,
    state: RwLock<WorkerState>,
    stats: Arc<FetchStats>,
}

impl Interceptor {
    // == Constructor ==
    pub fn new(
        settings: WorkerSettings,
        storage: Arc<RwLock<CacheStorage>>,
        network: Arc<dyn Network>,
    ) -> Self {
        Self {
            settings,
            storage,
            network,
            state: RwLock::new(WorkerState::Parsed),
            stats: Arc::new(FetchStats::new()),
        }
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    /// Shared handle to the cache storage.
    pub fn storage(&self) -> &Arc<RwLock<CacheStorage>> {
        &self.storage
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Whether a URL skips the store entirely.
    pub fn is_bypassed(&self, url: &str) -> bool {
        url.contains(&self.settings.bypass_pattern)
    }

    // == Dispatch ==
    /// Routes an event to its handler.
    pub async fn dispatch(&self, event: WorkerEvent) -> Result<EventOutcome> {
        debug!("Dispatching {} event", event.name());
        match event {
            WorkerEvent::Install => self.on_install().await.map(EventOutcome::Installed),
            WorkerEvent::Activate => self.on_activate().await.map(EventOutcome::Activated),
            WorkerEvent::Fetch(request) => self.on_fetch(request).await.map(EventOutcome::Responded),
        }
    }

    // == Install ==
    /// Opens the current cache and seeds it with the precache paths.
    ///
    /// A path that cannot be fetched is reported in [`InstallReport::failed`]
    /// but does not fail the install; the worker is ready to activate either
    /// way. Only a storage failure is an error.
    pub async fn on_install(&self) -> Result<InstallReport> {
        self.transition(WorkerState::Installing).await?;

        match self.seed().await {
            Ok(report) => {
                self.transition(WorkerState::Installed).await?;
                info!(
                    "Installed cache '{}': {} seeded, {} failed",
                    report.cache_name,
                    report.seeded.len(),
                    report.failed.len()
                );
                Ok(report)
            }
            Err(e) => {
                self.transition(WorkerState::Parsed).await?;
                Err(e)
            }
        }
    }

    async fn seed(&self) -> Result<InstallReport> {
        let cache_name = &self.settings.cache_name;
        self.storage.write().await.open(cache_name).await?;

        let mut report = InstallReport {
            cache_name: cache_name.clone(),
            ..Default::default()
        };

        for url in &self.settings.precache_urls {
            let request = FetchRequest::get(url.clone());
            match self.network.fetch(&request).await {
                Ok(response) if response.status.is_success() => {
                    let entry = CachedResponse::from_response(&response);
                    self.storage
                        .write()
                        .await
                        .put(cache_name, &request.key(), entry)
                        .await?;
                    report.seeded.push(url.clone());
                }
                Ok(response) => {
                    warn!("Precache of {} returned {}, not seeding", url, response.status);
                    report.failed.push(url.clone());
                }
                Err(e) => {
                    warn!("Precache of {} failed: {}", url, e);
                    report.failed.push(url.clone());
                }
            }
        }

        Ok(report)
    }

    // == Activate ==
    /// Takes control and deletes every cache other than the current one.
    pub async fn on_activate(&self) -> Result<ActivateReport> {
        self.transition(WorkerState::Activating).await?;

        match self.delete_stale_caches().await {
            Ok(deleted) => {
                self.transition(WorkerState::Activated).await?;
                info!("Activated; now intercepting fetches");
                Ok(ActivateReport {
                    cache_name: self.settings.cache_name.clone(),
                    deleted,
                })
            }
            Err(e) => {
                self.transition(WorkerState::Installed).await?;
                Err(e)
            }
        }
    }

    async fn delete_stale_caches(&self) -> Result<Vec<String>> {
        let mut storage = self.storage.write().await;
        let stale: Vec<String> = storage
            .keys()
            .into_iter()
            .filter(|name| *name != self.settings.cache_name)
            .collect();

        for name in &stale {
            storage.delete(name).await?;
            info!("Deleted outdated cache '{}'", name);
        }

        Ok(stale)
    }

    // == Fetch ==
    /// Answers a request: network first, store on failure.
    ///
    /// Bypassed URLs return exactly what the network returns. Otherwise a
    /// network response is returned as soon as it arrives and a copy is
    /// written to the store in the background.
    pub async fn on_fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        if !self.state().await.can_intercept_fetch() {
            debug!("Not active, passing {} {} through", request.method, request.url);
            return Ok(self.network.fetch(&request).await?);
        }

        if self.is_bypassed(&request.url) {
            self.stats.record_bypass();
            return Ok(self.network.fetch(&request).await?);
        }

        let key = request.key();
        match self.network.fetch(&request).await {
            Ok(response) => {
                self.stats.record_network();
                if key.is_storable() {
                    // Detached: the caller does not wait for the write.
                    spawn_cache_write(
                        self.storage.clone(),
                        self.stats.clone(),
                        self.settings.cache_name.clone(),
                        key,
                        CachedResponse::from_response(&response),
                    );
                }
                Ok(response)
            }
            Err(e @ NetworkError::InvalidUrl(_)) => Err(e.into()),
            Err(e) => {
                let stored = self
                    .storage
                    .read()
                    .await
                    .match_request(&self.settings.cache_name, &key);

                match stored {
                    Some(entry) => {
                        self.stats.record_fallback_hit();
                        info!("Network failed for {} ({}), serving stored copy", key, e);
                        Ok(entry.to_response())
                    }
                    None => {
                        self.stats.record_fallback_miss();
                        warn!("Network failed for {} ({}), nothing stored", key, e);
                        Err(ProxyError::Offline(key.to_string()))
                    }
                }
            }
        }
    }

    async fn transition(&self, next: WorkerState) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.can_transition_to(next) {
            return Err(ProxyError::InvalidState(format!(
                "cannot move from {} to {}",
                *state, next
            )));
        }
        debug!("Worker state {} -> {}", *state, next);
        *state = next;
        Ok(())
    }
}
