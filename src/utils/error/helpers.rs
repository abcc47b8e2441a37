//! Helper functions for creating and inspecting errors

use super::types::PollError;

impl PollError {
    pub fn fetch<S: Into<String>>(message: S) -> Self {
        Self::Fetch(message.into())
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound(message.into())
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    pub fn registration_conflict<K: Into<String>, S: Into<String>>(kind: K, key: S) -> Self {
        Self::RegistrationConflict {
            kind: kind.into(),
            key: key.into(),
        }
    }

    /// Whether the error came from a fetch deadline rather than the fetch itself
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Whether the error describes a failed poll attempt (fetch or timeout)
    pub fn is_poll_failure(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::Timeout(_))
    }
}

impl From<anyhow::Error> for PollError {
    fn from(err: anyhow::Error) -> Self {
        Self::Fetch(format!("{:#}", err))
    }
}
