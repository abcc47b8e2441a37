//! Registry configuration and accounting

use crate::config::PollingConfig;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Interval between scheduler scans
    pub tick_interval: Duration,
    /// Maximum number of node passes in flight at once
    pub max_concurrent_passes: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            max_concurrent_passes: 32,
        }
    }
}

impl From<&PollingConfig> for RegistryConfig {
    fn from(config: &PollingConfig) -> Self {
        Self {
            tick_interval: config.tick_interval(),
            max_concurrent_passes: config.max_concurrent_passes,
        }
    }
}

/// Live counters shared by the registry, its scheduler and its nodes
#[derive(Debug, Default)]
pub struct RegistryStats {
    ticks: AtomicU64,
    in_flight: AtomicUsize,
    refreshes_total: AtomicU64,
    passes_dispatched: AtomicU64,
    scheduler_faults: AtomicU64,
}

impl RegistryStats {
    pub(crate) fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dispatch(&self) {
        self.passes_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fault(&self) {
        self.scheduler_faults.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a refresh as in flight until the guard drops
    pub(crate) fn track_refresh(self: &Arc<Self>) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        self.refreshes_total.fetch_add(1, Ordering::Relaxed);
        InFlightGuard {
            stats: Arc::clone(self),
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn snapshot(&self, nodes: usize) -> StatsSnapshot {
        StatsSnapshot {
            nodes,
            ticks: self.ticks(),
            in_flight: self.in_flight(),
            refreshes_total: self.refreshes_total.load(Ordering::Relaxed),
            passes_dispatched: self.passes_dispatched.load(Ordering::Relaxed),
            scheduler_faults: self.scheduler_faults.load(Ordering::Relaxed),
        }
    }
}

/// Decrements the in-flight gauge on drop
pub struct InFlightGuard {
    stats: Arc<RegistryStats>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.stats.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Point-in-time copy of the registry counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub nodes: usize,
    pub ticks: u64,
    pub in_flight: usize,
    pub refreshes_total: u64,
    pub passes_dispatched: u64,
    pub scheduler_faults: u64,
}
