//! Configuration data models
//!
//! This module defines all configuration structures used by the engine and
//! the bundled binary.

pub mod issues;
pub mod logging;
pub mod polling;
pub mod target;

pub use issues::*;
pub use logging::*;
pub use polling::*;
pub use target::*;

/// Scheduler tick in milliseconds
pub fn default_tick_interval_ms() -> u64 {
    1000
}

pub fn default_max_concurrent_passes() -> usize {
    32
}

/// Minimum seconds between two passes of a node
pub fn default_min_interval_secs() -> u64 {
    1
}

pub fn default_fails_before_backoff() -> u32 {
    3
}

pub fn default_backoff_secs() -> u64 {
    120
}

pub fn default_fetch_timeout_secs() -> u64 {
    30
}

pub fn default_issues_cache_secs() -> u64 {
    15
}

pub fn default_issues_stale_secs() -> u64 {
    4 * 60 * 60 // 4 hours
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_true() -> bool {
    true
}

pub fn default_target_interval_secs() -> u64 {
    30
}

pub fn default_latency_warning_ms() -> u64 {
    2000
}
