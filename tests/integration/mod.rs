//! Integration tests for opwatch
//!
//! These tests drive the engine through its public API on tokio's paused
//! clock, so every timing assertion is exact.

pub mod cache_scenarios;
pub mod config_tests;
pub mod issue_tests;
pub mod registry_tests;
