// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client configuration.
//!
//! Configuration is read from a TOML file. Every field is optional:
//! - `url`: base URL of the remote (default `http://127.0.0.1:7890`)
//! - `perform_path`: endpoint operations are posted to (default `/api/perform`)
//! - `health_path`: liveness probe endpoint (default `/api/health`)
//! - `probe_interval_ms`: connectivity probe period (default 1000)
//! - `max_replay_batch`: queued operations replayed per reconnect, 0 = all

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Configuration for a tally client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the remote, without a trailing path.
    #[serde(default = "default_url")]
    pub url: String,
    /// Path operations are posted to.
    #[serde(default = "default_perform_path")]
    pub perform_path: String,
    /// Path probed for liveness.
    #[serde(default = "default_health_path")]
    pub health_path: String,
    /// Liveness probe period in milliseconds.
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,
    /// Maximum number of queued operations replayed per reconnect. 0 = unlimited.
    #[serde(default)]
    pub max_replay_batch: usize,
}

fn default_url() -> String {
    "http://127.0.0.1:7890".to_string()
}

fn default_perform_path() -> String {
    "/api/perform".to_string()
}

fn default_health_path() -> String {
    "/api/health".to_string()
}

fn default_probe_interval_ms() -> u64 {
    1000
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            url: default_url(),
            perform_path: default_perform_path(),
            health_path: default_health_path(),
            probe_interval_ms: default_probe_interval_ms(),
            max_replay_batch: 0,
        }
    }
}

impl ClientConfig {
    /// Creates a default configuration pointing at `url`.
    pub fn with_url(url: impl Into<String>) -> Self {
        ClientConfig {
            url: url.into(),
            ..ClientConfig::default()
        }
    }

    /// Loads and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ClientConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the URL and paths are usable.
    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "url must start with http:// or https://, got '{}'",
                self.url
            )));
        }
        for (name, path) in [
            ("perform_path", &self.perform_path),
            ("health_path", &self.health_path),
        ] {
            if !path.starts_with('/') {
                return Err(Error::Config(format!(
                    "{} must start with '/', got '{}'",
                    name, path
                )));
            }
        }
        if self.probe_interval_ms == 0 {
            return Err(Error::Config("probe_interval_ms must be positive".into()));
        }
        Ok(())
    }

    /// Full URL operations are posted to.
    pub fn perform_url(&self) -> String {
        format!("{}{}", self.url.trim_end_matches('/'), self.perform_path)
    }

    /// Full URL of the liveness probe.
    pub fn health_url(&self) -> String {
        format!("{}{}", self.url.trim_end_matches('/'), self.health_path)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
