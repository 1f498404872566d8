// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! zkl: inspect and clean up distributed locks

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use output::OutputFormat;
use std::path::PathBuf;
use zkl_core::{Config, ConfigError};

#[derive(Parser, Debug)]
#[command(
    name = "zkl",
    version,
    about = "Inspect and clean up distributed locks"
)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Coordination service hosts (host:port,...)
    #[arg(long, global = true)]
    pub hosts: Option<String>,

    /// Container node holding the locks
    #[arg(long, global = true)]
    pub root: Option<String>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List every lock with its status
    List,
    /// Show the candidates of one lock
    Show {
        /// Lock name
        name: String,
    },
    /// Force-delete one candidate
    Remove {
        /// Lock name
        name: String,
        /// Candidate node name
        candidate: String,
    },
    /// Force-delete every candidate of a lock
    Clear {
        /// Lock name
        name: String,
    },
}

impl Cli {
    /// Load the configuration file, if any, then apply flag overrides
    pub fn resolve_config(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(hosts) = &self.hosts {
            config.client.hosts = hosts.clone();
        }
        if let Some(root) = &self.root {
            config.lock.lock_root = root.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
