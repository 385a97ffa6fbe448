// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordination engine configuration
//!
//! ```toml
//! sweep_interval = "30s"
//! registration_retries = 3
//! report_usage = true
//! sweep_app_id = "app-1"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoordinationConfig {
    /// Time between periodic sweeps
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
    /// Extra registration attempts after an order conflict
    pub registration_retries: u32,
    /// Publish constraint usage after each sweep
    pub report_usage: bool,
    /// Restrict periodic sweeps to one app
    pub sweep_app_id: Option<String>,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(30),
            registration_retries: 3,
            report_usage: true,
            sweep_app_id: None,
        }
    }
}

impl CoordinationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn with_registration_retries(mut self, retries: u32) -> Self {
        self.registration_retries = retries;
        self
    }

    pub fn with_report_usage(mut self, enabled: bool) -> Self {
        self.report_usage = enabled;
        self
    }

    pub fn with_sweep_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.sweep_app_id = Some(app_id.into());
        self
    }

    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: CoordinationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "sweep_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
