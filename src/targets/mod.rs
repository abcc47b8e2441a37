//! Probe targets for the bundled binary
//!
//! Targets turn configuration into registered poll nodes. They sit outside
//! the engine and only use its public API.

pub mod http;

pub use http::{HttpProbe, HttpTarget};
