//! Utility modules
//!
//! - **error**: Error taxonomy and result alias
//! - **logging**: Tracing subscriber setup
//! - **shutdown**: Ctrl+C and SIGTERM handling
//! - **time**: Relative time rendering for status reasons

pub mod error;
pub mod logging;
pub mod shutdown;
pub mod time;

pub use error::{PollError, Result};
pub use time::{relative_time, to_relative_time};
