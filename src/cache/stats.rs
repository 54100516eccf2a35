//! Fetch Statistics Module
//!
//! Counts how intercepted requests were answered.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Fetch Stats ==
/// Lock-free counters shared between request handlers and write tasks.
#[derive(Debug, Default)]
pub struct FetchStats {
    network: AtomicU64,
    fallback_hits: AtomicU64,
    fallback_misses: AtomicU64,
    bypassed: AtomicU64,
    writes: AtomicU64,
    failed_writes: AtomicU64,
}

/// Point-in-time copy of [`FetchStats`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Requests answered by the network (bypassed ones excluded)
    pub network: u64,
    /// Network failures answered from the store
    pub fallback_hits: u64,
    /// Network failures with nothing stored
    pub fallback_misses: u64,
    /// Requests matching the bypass pattern
    pub bypassed: u64,
    /// Completed background store writes
    pub writes: u64,
    /// Background store writes that failed
    pub failed_writes: u64,
}

impl FetchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_network(&self) {
        self.network.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback_hit(&self) {
        self.fallback_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback_miss(&self) {
        self.fallback_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bypass(&self) {
        self.bypassed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed_write(&self) {
        self.failed_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            network: self.network.load(Ordering::Relaxed),
            fallback_hits: self.fallback_hits.load(Ordering::Relaxed),
            fallback_misses: self.fallback_misses.load(Ordering::Relaxed),
            bypassed: self.bypassed.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            failed_writes: self.failed_writes.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    // == Fallback Hit Rate ==
    /// Share of network failures that the store could answer.
    ///
    /// Returns 0.0 if the network has never failed.
    pub fn fallback_hit_rate(&self) -> f64 {
        let total = self.fallback_hits + self.fallback_misses;
        if total == 0 {
            0.0
        } else {
            self.fallback_hits as f64 / total as f64
        }
    }
}
