//! Polling registry
//!
//! The registry holds at most one node per kind and key, owns the scheduler
//! that drives their passes and offers the manual poll API.
//!
//! # Module Structure
//!
//! - `types` - Scheduler configuration and live counters
//! - `polling_registry` - `PollingRegistry` itself
//! - `scheduler` - The tick loop and scan
//! - `tests` - Test suite for registration and scheduling

mod polling_registry;
mod scheduler;
#[cfg(test)]
mod tests;
pub mod types;

pub use polling_registry::PollingRegistry;
pub use types::{InFlightGuard, RegistryConfig, RegistryStats, StatsSnapshot};
