//! Staleness-aware caches with single-flight refresh
//!
//! A [`CacheEntry`] holds one data point for a monitored target. Readers get
//! the cached value while it is fresh; once it goes stale the next poll
//! triggers a refresh, and concurrent refreshes collapse into a single fetch.
//!
//! # Module Structure
//!
//! - `entry` - `CacheEntry<T>` and its refresh algorithm
//! - `types` - Fetch closure aliases, refresh outcomes, snapshots and the
//!   type-erased `Pollable` view used by nodes
//! - `tests` - Test suite for cache behaviour

pub mod entry;
pub mod types;

pub use entry::{CacheEntry, CacheEntryBuilder};
pub use types::{CacheInfo, CacheOwner, FetchFn, FetchFuture, Pollable, RefreshOutcome};
