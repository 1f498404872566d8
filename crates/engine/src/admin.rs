// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock inspection and forced cleanup
//!
//! These work on any lock under a container without owning a candidate, so
//! an operator can see who holds what and remove candidates left by
//! misbehaving participants.

use crate::LockError;
use serde::Serialize;
use std::fmt;
use zkl_adapters::{ClientError, CoordinationClient};
use zkl_core::node::UNLOCK_PAYLOAD;
use zkl_core::{CandidateName, LockRoot, QueueSnapshot, Role};

/// Whether any candidate is queued on a lock
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum LockStatus {
    Locked,
    Free,
}

impl fmt::Display for LockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockStatus::Locked => f.write_str("Locked"),
            LockStatus::Free => f.write_str("Free"),
        }
    }
}

/// One named lock under a container
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LockSummary {
    pub name: String,
    pub path: String,
    pub status: LockStatus,
    pub candidates: usize,
}

/// One candidate of a lock
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CandidateInfo {
    pub name: String,
    pub role: Role,
    pub sequence: u64,
    /// Whether the candidate holds the lock under its role's policy
    pub holding: bool,
    /// Whether a waiter wrote `unlock` to it
    pub revoke_requested: bool,
    pub payload: String,
    /// Milliseconds since the epoch
    pub created: i64,
    /// Milliseconds since the epoch
    pub modified: i64,
}

async fn children_or_empty<C: CoordinationClient>(
    client: &C,
    path: &str,
) -> Result<Vec<String>, LockError> {
    match client.get_children(path).await {
        Ok(children) => Ok(children),
        Err(ClientError::NoNode(_)) => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Summarize every lock under `container`, sorted by name
pub async fn list_locks<C: CoordinationClient>(
    client: &C,
    container: &str,
) -> Result<Vec<LockSummary>, LockError> {
    let mut names = children_or_empty(client, container).await?;
    names.sort();

    let mut summaries = Vec::with_capacity(names.len());
    for name in names {
        let root = LockRoot::new(container, &name)?;
        let snapshot = QueueSnapshot::from_children(children_or_empty(client, root.path()).await?);
        summaries.push(LockSummary {
            status: if snapshot.is_empty() {
                LockStatus::Free
            } else {
                LockStatus::Locked
            },
            candidates: snapshot.len(),
            path: root.path().to_string(),
            name,
        });
    }
    Ok(summaries)
}

/// Describe every candidate of one lock, in queue order
pub async fn show_lock<C: CoordinationClient>(
    client: &C,
    root: &LockRoot,
) -> Result<Vec<CandidateInfo>, LockError> {
    let snapshot = QueueSnapshot::from_children(children_or_empty(client, root.path()).await?);
    let holders: Vec<&CandidateName> = snapshot.holders();

    let mut infos = Vec::with_capacity(snapshot.len());
    for candidate in snapshot.candidates() {
        let (data, stat) = match client.get(&root.child_path(candidate.name())).await {
            Ok(found) => found,
            // Released between the listing and the read
            Err(ClientError::NoNode(_)) => continue,
            Err(e) => return Err(e.into()),
        };
        infos.push(CandidateInfo {
            name: candidate.name().to_string(),
            role: candidate.role(),
            sequence: candidate.sequence(),
            holding: holders.contains(&candidate),
            revoke_requested: data == UNLOCK_PAYLOAD,
            payload: String::from_utf8_lossy(&data).into_owned(),
            created: stat.ctime,
            modified: stat.mtime,
        });
    }
    Ok(infos)
}

/// Force-delete one candidate; `Ok(false)` if it was already gone
pub async fn remove_candidate<C: CoordinationClient>(
    client: &C,
    root: &LockRoot,
    candidate: &str,
) -> Result<bool, LockError> {
    if candidate.is_empty() || candidate.contains('/') {
        return Err(LockError::InvalidName(candidate.to_string()));
    }
    match client.delete(&root.child_path(candidate), None).await {
        Ok(()) => {
            tracing::info!(lock = %root, candidate, "candidate removed");
            Ok(true)
        }
        Err(ClientError::NoNode(_)) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Force-delete every child of a lock node, returning how many were removed
pub async fn clear_lock<C: CoordinationClient>(
    client: &C,
    root: &LockRoot,
) -> Result<usize, LockError> {
    let children = children_or_empty(client, root.path()).await?;
    let mut removed = 0;
    for child in &children {
        match client.delete(&root.child_path(child), None).await {
            Ok(()) => removed += 1,
            Err(ClientError::NoNode(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }
    tracing::info!(lock = %root, removed, "lock cleared");
    Ok(removed)
}

#[cfg(test)]
#[path = "admin_tests.rs"]
mod tests;
