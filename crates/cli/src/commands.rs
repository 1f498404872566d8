// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock administration commands

use crate::output::{render, render_list, OutputFormat};
use crate::Command;
use chrono::{DateTime, SecondsFormat};
use serde::Serialize;
use std::fmt;
use zkl_adapters::CoordinationClient;
use zkl_core::LockRoot;
use zkl_engine::admin::{self, CandidateInfo, LockStatus, LockSummary};

#[derive(Serialize)]
struct LockRow {
    name: String,
    path: String,
    status: LockStatus,
    candidates: usize,
}

impl From<LockSummary> for LockRow {
    fn from(summary: LockSummary) -> Self {
        Self {
            name: summary.name,
            path: summary.path,
            status: summary.status,
            candidates: summary.candidates,
        }
    }
}

impl fmt::Display for LockRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<24} {:<8} {}",
            self.name,
            self.status.to_string(),
            self.candidates
        )
    }
}

#[derive(Serialize)]
struct CandidateRow {
    name: String,
    role: String,
    sequence: u64,
    holding: bool,
    revoke_requested: bool,
    payload: String,
    created: String,
    modified: String,
}

impl From<CandidateInfo> for CandidateRow {
    fn from(info: CandidateInfo) -> Self {
        Self {
            role: info.role.prefix().to_string(),
            sequence: info.sequence,
            holding: info.holding,
            revoke_requested: info.revoke_requested,
            created: format_millis(info.created),
            modified: format_millis(info.modified),
            payload: info.payload,
            name: info.name,
        }
    }
}

impl fmt::Display for CandidateRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match (self.holding, self.revoke_requested) {
            (true, true) => "revoking",
            (true, false) => "held",
            (false, _) => "waiting",
        };
        write!(
            f,
            "{:<40} {:<6} {:>10} {:<9} {:<26} {:<26} {}",
            self.name, self.role, self.sequence, state, self.created, self.modified, self.payload
        )
    }
}

#[derive(Serialize)]
struct Removal {
    lock: String,
    candidate: String,
    removed: bool,
}

impl fmt::Display for Removal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.removed {
            write!(f, "Removed {} from {}", self.candidate, self.lock)
        } else {
            write!(f, "No candidate {} in {}", self.candidate, self.lock)
        }
    }
}

#[derive(Serialize)]
struct Cleared {
    lock: String,
    removed: usize,
}

impl fmt::Display for Cleared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cleared {} candidate(s) from {}", self.removed, self.lock)
    }
}

/// Milliseconds since the epoch as RFC 3339, or the raw number if out of range
fn format_millis(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| ms.to_string())
}

/// Run one command against `lock_root`, returning the rendered output
pub async fn run<C: CoordinationClient>(
    client: &C,
    lock_root: &str,
    command: &Command,
    format: OutputFormat,
) -> anyhow::Result<String> {
    match command {
        Command::List => list(client, lock_root, format).await,
        Command::Show { name } => show(client, &LockRoot::new(lock_root, name)?, format).await,
        Command::Remove { name, candidate } => {
            remove(client, &LockRoot::new(lock_root, name)?, candidate, format).await
        }
        Command::Clear { name } => clear(client, &LockRoot::new(lock_root, name)?, format).await,
    }
}

async fn list<C: CoordinationClient>(
    client: &C,
    lock_root: &str,
    format: OutputFormat,
) -> anyhow::Result<String> {
    let rows: Vec<LockRow> = admin::list_locks(client, lock_root)
        .await?
        .into_iter()
        .map(LockRow::from)
        .collect();
    let header = format!("{:<24} {:<8} CANDIDATES", "NAME", "STATUS");
    Ok(render_list(&rows, &header, "No locks found.", format)?)
}

async fn show<C: CoordinationClient>(
    client: &C,
    root: &LockRoot,
    format: OutputFormat,
) -> anyhow::Result<String> {
    let rows: Vec<CandidateRow> = admin::show_lock(client, root)
        .await?
        .into_iter()
        .map(CandidateRow::from)
        .collect();
    let header = format!(
        "{:<40} {:<6} {:>10} {:<9} {:<26} {:<26} PAYLOAD",
        "NAME", "ROLE", "SEQUENCE", "STATE", "CREATED", "MODIFIED"
    );
    Ok(render_list(&rows, &header, "No candidates.", format)?)
}

async fn remove<C: CoordinationClient>(
    client: &C,
    root: &LockRoot,
    candidate: &str,
    format: OutputFormat,
) -> anyhow::Result<String> {
    let removed = admin::remove_candidate(client, root, candidate).await?;
    let removal = Removal {
        lock: root.path().to_string(),
        candidate: candidate.to_string(),
        removed,
    };
    Ok(render(&removal, format)?)
}

async fn clear<C: CoordinationClient>(
    client: &C,
    root: &LockRoot,
    format: OutputFormat,
) -> anyhow::Result<String> {
    let removed = admin::clear_lock(client, root).await?;
    let cleared = Cleared {
        lock: root.path().to_string(),
        removed,
    };
    Ok(render(&cleared, format)?)
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
