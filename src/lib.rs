//! # opwatch
//!
//! A polling and caching engine for operational monitoring.
//!
//! Each monitored target is a [`PollNode`] holding one or more
//! [`CacheEntry`] values. A [`PollingRegistry`] deduplicates nodes and runs a
//! background scheduler that refreshes stale entries in parallel, while
//! readers get cached data without waiting on I/O. Health rolls up through
//! [`MonitorStatus`], and an [`IssueAggregator`] turns unhealthy nodes into a
//! sorted issue list.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use opwatch::{CacheEntry, PollNode, PollingRegistry, RegistryConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> opwatch::Result<()> {
//!     let registry = PollingRegistry::new(RegistryConfig::default());
//!
//!     let uptime = CacheEntry::new("uptime", Duration::from_secs(30), || async {
//!         Ok(42u64)
//!     });
//!     let node = PollNode::builder("server", "web-01")
//!         .with_cache(uptime.clone())
//!         .build();
//!     registry.register(node)?;
//!
//!     registry.start();
//!     let seconds = uptime.poll(false).await;
//!     println!("uptime: {:?}", seconds);
//!     registry.shutdown().await;
//!     Ok(())
//! }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod targets;
pub mod utils;

// Re-export main types
pub use config::Config;
pub use core::cache::{CacheEntry, CacheEntryBuilder, CacheInfo, Pollable, RefreshOutcome};
pub use core::issues::{Issue, IssueAggregator, IssueProvider};
pub use core::node::{DomainStatus, NodeInfo, NodeKey, PassOutcome, PassReport, PollNode};
pub use core::registry::{PollingRegistry, RegistryConfig, StatsSnapshot};
pub use core::status::{MonitorStatus, MonitorStatusSource, worst_of};
pub use utils::error::{PollError, Result};

// Version information
/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate
pub const NAME: &str = env!("CARGO_PKG_NAME");
/// Description of the crate
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Build information
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Version number
    pub version: &'static str,
    /// Build time as seconds since the Unix epoch
    pub build_time: &'static str,
    /// Git commit hash
    pub git_hash: &'static str,
    /// Rust version
    pub rust_version: &'static str,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            version: VERSION,
            build_time: option_env!("BUILD_TIME").unwrap_or("unknown"),
            git_hash: option_env!("GIT_HASH").unwrap_or("unknown"),
            rust_version: option_env!("RUST_VERSION").unwrap_or("unknown"),
        }
    }
}

/// Build information of this binary
pub fn build_info() -> BuildInfo {
    BuildInfo::default()
}
