// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock candidates and the nodes they live under

use crate::LockError;
use zkl_adapters::{Acl, ClientError, CoordinationClient, CreateMode};
use zkl_core::node::{ancestors, split_path, CONTAINER_PAYLOAD, INITIAL_PAYLOAD, LOCK_NODE_PAYLOAD};
use zkl_core::{CandidateName, LockRoot, Role};

/// One participant's bid for a lock: an ephemeral sequential node
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    path: String,
    name: CandidateName,
}

impl Candidate {
    /// Create a candidate node under the lock root
    ///
    /// The client is expected to resolve an unacknowledged create to the node
    /// it actually made, so a lost reply never leaves a duplicate behind.
    pub async fn create<C: CoordinationClient>(
        client: &C,
        root: &LockRoot,
        role: Role,
        token: &str,
    ) -> Result<Self, LockError> {
        let requested = root.child_path(&CandidateName::request_prefix(role, token));
        let path = client
            .create(
                &requested,
                INITIAL_PAYLOAD,
                &Acl::open_unsafe(),
                CreateMode::EphemeralSequential,
            )
            .await?;

        let name = split_path(&path)
            .and_then(|(_, child)| CandidateName::parse(child))
            .ok_or_else(|| ClientError::Other(format!("unexpected candidate path: {}", path)))?;

        tracing::debug!(
            lock = %root,
            candidate = name.name(),
            sequence = name.sequence(),
            "candidate created"
        );
        Ok(Self { path, name })
    }

    /// Full path of the candidate node
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &CandidateName {
        &self.name
    }

    pub fn sequence(&self) -> u64 {
        self.name.sequence()
    }
}

/// Create the container and lock node if missing
pub async fn ensure_root<C: CoordinationClient>(
    client: &C,
    root: &LockRoot,
) -> Result<(), LockError> {
    let parents = ancestors(root.path());
    for (i, path) in parents.iter().enumerate() {
        let payload: &[u8] = if i + 1 == parents.len() {
            CONTAINER_PAYLOAD
        } else {
            b""
        };
        create_persistent(client, path, payload).await?;
    }
    create_persistent(client, root.path(), LOCK_NODE_PAYLOAD).await
}

async fn create_persistent<C: CoordinationClient>(
    client: &C,
    path: &str,
    payload: &[u8],
) -> Result<(), LockError> {
    match client
        .create(path, payload, &Acl::open_unsafe(), CreateMode::Persistent)
        .await
    {
        Ok(_) | Err(ClientError::NodeExists(_)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[path = "candidate_tests.rs"]
mod tests;
