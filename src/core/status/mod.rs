//! Severity-ranked status shared by every monitored entity
//!
//! # Module Structure
//!
//! - `types` - `MonitorStatus`, the `MonitorStatusSource` contract and roll-up helpers
//! - `tests` - Test suite for status roll-up

pub mod types;

pub use types::{MonitorStatus, MonitorStatusSource, non_good, reason_summary, worst_of, worst_status};
