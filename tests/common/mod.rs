//! Common test utilities for opwatch
//!
//! - Fetch fixtures whose outcome and latency tests can steer
//! - Custom assertions for statuses

pub mod assertions;
pub mod fixtures;

pub use fixtures::ControlledFetch;
