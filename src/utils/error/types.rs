//! Error types for the polling engine

use std::time::Duration;
use thiserror::Error;

/// Result type alias for the polling engine
pub type Result<T> = std::result::Result<T, PollError>;

/// Main error type for the polling engine
#[derive(Error, Debug)]
pub enum PollError {
    /// The underlying fetch call failed
    #[error("{0}")]
    Fetch(String),

    /// The fetch did not complete before its deadline
    #[error("Timed out after {}", humanize(.0))]
    Timeout(Duration),

    /// A node with the same kind and key is already registered
    #[error("Registration conflict: {kind} node '{key}' is already registered")]
    RegistrationConflict { kind: String, key: String },

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

fn humanize(duration: &Duration) -> String {
    if duration.subsec_millis() == 0 {
        format!("{}s", duration.as_secs())
    } else {
        format!("{}ms", duration.as_millis())
    }
}
