// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock paths and candidate node names
//!
//! The on-the-wire layout is `<container>/<lock_name>/<role>-<token>-<sequence>`.
//! The coordination service appends the sequence, a zero-padded counter that is
//! strictly increasing among the children of one lock node.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Payload written to a fresh candidate node
pub const INITIAL_PAYLOAD: &[u8] = b"0";

/// Payload a revoker writes to ask a holder to release
pub const UNLOCK_PAYLOAD: &[u8] = b"unlock";

/// Payload of the lock container node
pub const CONTAINER_PAYLOAD: &[u8] = b"zkl lock dir";

/// Payload of a named lock node
pub const LOCK_NODE_PAYLOAD: &[u8] = b"lock";

/// Width of the sequence suffix appended by the coordination service
pub const SEQUENCE_WIDTH: usize = 10;

/// Errors from building lock paths
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NodeError {
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("invalid lock name: {0}")]
    InvalidLockName(String),
}

/// Role of a candidate, encoded as the node name prefix
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Exclusive lock (`lock-`)
    Lock,
    /// Shared read lock (`read-`)
    Read,
    /// Shared write lock (`write-`)
    Write,
}

impl Role {
    pub fn prefix(&self) -> &'static str {
        match self {
            Role::Lock => "lock",
            Role::Read => "read",
            Role::Write => "write",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "lock" => Some(Role::Lock),
            "read" => Some(Role::Read),
            "write" => Some(Role::Write),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// A parsed candidate node name
///
/// Candidates order by sequence number, never lexically: a random token may
/// precede the sequence, so `lock-ffff-0000000003` sorts before
/// `lock-0000-0000000007`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CandidateName {
    name: String,
    role: Role,
    sequence: u64,
}

impl CandidateName {
    /// Parse a child name into a candidate
    ///
    /// The sequence is the all-digit suffix after the last `-`. The role is the
    /// first dash-separated segment naming a known role, so both
    /// `write-<token>-<seq>` and `<token>-write-<seq>` parse.
    pub fn parse(name: &str) -> Option<Self> {
        let (head, suffix) = name.rsplit_once('-')?;
        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let sequence = suffix.parse().ok()?;
        let role = head.split('-').find_map(Role::from_prefix)?;
        Some(Self {
            name: name.to_string(),
            role,
            sequence,
        })
    }

    /// Name passed to a sequential create; the service appends the sequence
    pub fn request_prefix(role: Role, token: &str) -> String {
        format!("{}-{}-", role.prefix(), token)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl Ord for CandidateName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sequence
            .cmp(&other.sequence)
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl PartialOrd for CandidateName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CandidateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The persistent node grouping all candidates of one named lock
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LockRoot {
    container: String,
    name: String,
    path: String,
}

impl LockRoot {
    /// Bind a lock name under a container path such as `/Locks`
    pub fn new(container: &str, name: &str) -> Result<Self, NodeError> {
        validate_path(container)?;
        if name.is_empty() || name.contains('/') {
            return Err(NodeError::InvalidLockName(name.to_string()));
        }
        Ok(Self {
            container: container.to_string(),
            name: name.to_string(),
            path: join_path(container, name),
        })
    }

    /// Path of the container node (e.g. `/Locks`)
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Lock name (e.g. `my-lock`)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full path of the lock node (e.g. `/Locks/my-lock`)
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Full path of a child of this lock node
    pub fn child_path(&self, child: &str) -> String {
        join_path(&self.path, child)
    }
}

impl fmt::Display for LockRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Check that a path is absolute, has no empty segments and no trailing slash
pub fn validate_path(path: &str) -> Result<(), NodeError> {
    if path == "/" {
        return Ok(());
    }
    let valid = path.starts_with('/')
        && !path.ends_with('/')
        && path[1..].split('/').all(|segment| !segment.is_empty());
    if valid {
        Ok(())
    } else {
        Err(NodeError::InvalidPath(path.to_string()))
    }
}

/// Join a parent path and a child name
pub fn join_path(parent: &str, child: &str) -> String {
    if parent == "/" {
        format!("/{}", child)
    } else {
        format!("{}/{}", parent, child)
    }
}

/// Split a path into its parent path and final segment
pub fn split_path(path: &str) -> Option<(&str, &str)> {
    let idx = path.rfind('/')?;
    let name = &path[idx + 1..];
    if name.is_empty() {
        return None;
    }
    let parent = if idx == 0 { "/" } else { &path[..idx] };
    Some((parent, name))
}

/// Every ancestor of a path, shallowest first, excluding `/` and the path itself
pub fn ancestors(path: &str) -> Vec<&str> {
    path.match_indices('/')
        .filter(|(idx, _)| *idx > 0)
        .map(|(idx, _)| &path[..idx])
        .collect()
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
