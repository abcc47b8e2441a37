//! Core polling engine
//!
//! This module contains the status model, cache entries, poll nodes, the
//! polling registry and the issue aggregator.

pub mod cache;
pub mod issues;
pub mod node;
pub mod registry;
pub mod status;

pub use cache::{CacheEntry, CacheInfo, Pollable, RefreshOutcome};
pub use issues::{Issue, IssueAggregator, IssueProvider};
pub use node::{DomainStatus, NodeInfo, NodeKey, PassOutcome, PollNode};
pub use registry::{PollingRegistry, RegistryConfig, StatsSnapshot};
pub use status::{MonitorStatus, MonitorStatusSource};
