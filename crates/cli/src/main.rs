// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! zkl - distributed lock administration

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use zkl::{commands, Cli};
use zkl_adapters::{RetryingClient, TracedClient, ZooKeeperClient};

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    let client = ZooKeeperClient::connect(&config.client)
        .await
        .with_context(|| format!("failed to connect to {}", config.client.hosts))?;
    let client = RetryingClient::new(TracedClient::new(client), config.client.recovery_timeout);

    let output = commands::run(&client, &config.lock.lock_root, &cli.command, cli.format).await?;
    println!("{}", output);
    Ok(())
}
