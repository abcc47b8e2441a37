//! Error handling for the polling engine
//!
//! This module defines the error taxonomy shared by caches, nodes, the registry
//! and configuration loading.

mod helpers;
mod types;

pub use types::{PollError, Result};
