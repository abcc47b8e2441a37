//! Poll nodes
//!
//! A node groups the cache entries of one monitored target, decides when a
//! pass is due and rolls the entries' health up into one status.
//!
//! # Module Structure
//!
//! - `types` - Node identity, domain status, pass outcomes and snapshots
//! - `poll_node` - `PollNode` and its builder
//! - `tests` - Test suite for passes, backoff and status roll-up

mod poll_node;
pub mod types;

pub use poll_node::{PollNode, PollNodeBuilder};
pub use types::{
    DEFAULT_BACKOFF, DEFAULT_FAILS_BEFORE_BACKOFF, DEFAULT_MIN_INTERVAL, DomainStatus, NodeInfo,
    NodeKey, PassOutcome, PassReport, StatusHook,
};
