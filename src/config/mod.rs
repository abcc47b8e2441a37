//! Configuration management
//!
//! Settings come from a YAML file, then `OPWATCH_*` environment overrides,
//! and are validated before use.

mod loader;
pub mod models;
pub mod validation;

pub use models::*;
pub use validation::Validate;

use crate::utils::error::{PollError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub polling: PollingConfig,
    pub issues: IssuesConfig,
    pub logging: LoggingConfig,
    pub targets: Vec<HttpTargetConfig>,
}

impl Config {
    /// Load configuration from a YAML file, apply environment overrides and validate
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            PollError::config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let mut config = Self::from_yaml(&content)?;
        config.apply_env()?;
        config.validate()?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Defaults plus environment overrides, validated
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse YAML without applying overrides or validating
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| PollError::config(format!("Failed to parse config: {}", e)))
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        debug!("Validating configuration");

        self.polling
            .validate()
            .map_err(|e| PollError::config(format!("Polling config error: {}", e)))?;
        self.issues
            .validate()
            .map_err(|e| PollError::config(format!("Issues config error: {}", e)))?;
        self.logging
            .validate()
            .map_err(|e| PollError::config(format!("Logging config error: {}", e)))?;
        self.targets
            .as_slice()
            .validate()
            .map_err(|e| PollError::config(format!("Target config error: {}", e)))?;

        Ok(())
    }

    /// Convert to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
