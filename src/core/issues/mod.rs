//! Cross-cutting issue report
//!
//! # Module Structure
//!
//! - `types` - `Issue`, its display order and the `IssueProvider` contract
//! - `aggregator` - `IssueAggregator`, the cached merged list
//! - `tests` - Test suite for aggregation

pub mod aggregator;
pub mod types;

pub use aggregator::{
    DEFAULT_ISSUES_CACHE, DEFAULT_ISSUES_STALE, ISSUES_CACHE_KEY, IssueAggregator,
    count_by_status,
};
pub use types::{Issue, IssueProvider, display_order};
