// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client and lock configuration
//!
//! Loaded from TOML:
//!
//! ```toml
//! [client]
//! hosts = "zk1:2181,zk2:2181"
//! session_timeout = "10s"
//! recovery_timeout = "30s"
//!
//! [lock]
//! lock_root = "/Locks"
//! acquire_timeout = "5s"
//! revoke = "gentle"
//! ```

use crate::node::validate_path;
use crate::revoke::RevokeMode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default container for lock nodes
pub const DEFAULT_LOCK_ROOT: &str = "/Locks";

/// Errors from loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Connection settings for the coordination service
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Comma-separated `host:port` list
    pub hosts: String,
    /// Session lifetime negotiated with the service
    #[serde(with = "humantime_serde")]
    pub session_timeout: Duration,
    /// How long to wait for the initial connection
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// How long an operation may wait for a lost connection to come back;
    /// absent means wait until the session reconnects or expires
    #[serde(with = "humantime_serde")]
    pub recovery_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            hosts: "localhost:2181".to_string(),
            session_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
            recovery_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl ClientConfig {
    pub fn new(hosts: impl Into<String>) -> Self {
        Self {
            hosts: hosts.into(),
            ..Self::default()
        }
    }

    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_recovery_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.recovery_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hosts.split(',').all(|h| h.trim().is_empty()) {
            return Err(ConfigError::Invalid("hosts must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Defaults applied to lock handles
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Container node under which every named lock lives
    pub lock_root: String,
    /// Default acquire timeout; absent means wait forever
    #[serde(with = "humantime_serde")]
    pub acquire_timeout: Option<Duration>,
    /// Default revocation behavior
    pub revoke: RevokeMode,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            lock_root: DEFAULT_LOCK_ROOT.to_string(),
            acquire_timeout: None,
            revoke: RevokeMode::None,
        }
    }
}

impl LockConfig {
    pub fn new(lock_root: impl Into<String>) -> Self {
        Self {
            lock_root: lock_root.into(),
            ..Self::default()
        }
    }

    pub fn with_acquire_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn with_revoke(mut self, revoke: RevokeMode) -> Self {
        self.revoke = revoke;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_path(&self.lock_root).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

/// Top-level configuration file
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub client: ClientConfig,
    pub lock: LockConfig,
}

impl Config {
    /// Load and validate a TOML configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate TOML configuration
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.client.validate()?;
        self.lock.validate()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
