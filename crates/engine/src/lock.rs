// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock state machine
//!
//! Each acquisition creates an ephemeral sequential candidate under the lock
//! node, then loops: list the siblings, evaluate the ordering policy, and if
//! blocked wait on a watch of the nearest blocker (optionally asking blockers
//! to give way first). The candidate's own node doubles as its revocation
//! channel.

use crate::admin;
use crate::candidate::{ensure_root, Candidate};
use crate::guard::LockGuard;
use crate::revocation::{Revocation, RevocationWatcher};
use crate::LockError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use zkl_adapters::{ClientError, CoordinationClient, SessionState};
use zkl_core::node::UNLOCK_PAYLOAD;
use zkl_core::{
    Evaluation, LockConfig, LockRoot, OrderingPolicy, QueueSnapshot, RevokeMode, Role, TokenGen,
    UuidTokenGen,
};

/// Lifecycle of a lock handle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    Idle,
    Pending,
    Held,
    Released,
    /// Was held, but the candidate node was deleted out from under it
    Revoked,
}

/// Options for one acquisition
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AcquireOptions {
    /// `None` waits forever
    pub timeout: Option<Duration>,
    pub revoke: RevokeMode,
}

impl AcquireOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &LockConfig) -> Self {
        Self {
            timeout: config.acquire_timeout,
            revoke: config.revoke,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_revoke(mut self, revoke: RevokeMode) -> Self {
        self.revoke = revoke;
        self
    }
}

/// Client-side handle for one named lock
///
/// A handle owns at most one candidate at a time. Handles are cheap; create
/// one per participant and share the client between them.
pub struct LockHandle<C: CoordinationClient, T: TokenGen = UuidTokenGen> {
    client: C,
    root: LockRoot,
    role: Role,
    policy: OrderingPolicy,
    tokens: T,
    candidate: Option<Candidate>,
    watcher: Option<RevocationWatcher>,
    state: LockState,
}

impl<C: CoordinationClient> LockHandle<C> {
    /// Exclusive lock `<container>/<name>`
    pub fn exclusive(client: C, container: &str, name: &str) -> Result<Self, LockError> {
        Ok(Self::new(
            client,
            LockRoot::new(container, name)?,
            Role::Lock,
            UuidTokenGen,
        ))
    }

    /// Shared read lock: held alongside other readers
    pub fn read(client: C, container: &str, name: &str) -> Result<Self, LockError> {
        Ok(Self::new(
            client,
            LockRoot::new(container, name)?,
            Role::Read,
            UuidTokenGen,
        ))
    }

    /// Shared write lock: excludes readers and other writers
    pub fn write(client: C, container: &str, name: &str) -> Result<Self, LockError> {
        Ok(Self::new(
            client,
            LockRoot::new(container, name)?,
            Role::Write,
            UuidTokenGen,
        ))
    }
}

impl<C: CoordinationClient, T: TokenGen> LockHandle<C, T> {
    pub fn new(client: C, root: LockRoot, role: Role, tokens: T) -> Self {
        Self {
            client,
            root,
            role,
            policy: OrderingPolicy::for_role(role),
            tokens,
            candidate: None,
            watcher: None,
            state: LockState::Idle,
        }
    }

    pub fn root(&self) -> &LockRoot {
        &self.root
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Path of the current candidate node, if any
    pub fn candidate_path(&self) -> Option<&str> {
        self.candidate.as_ref().map(Candidate::path)
    }

    pub fn state(&self) -> LockState {
        if self.state == LockState::Held && self.revocation() == Revocation::Removed {
            LockState::Revoked
        } else {
            self.state
        }
    }

    /// Whether the session is currently connected
    pub fn is_connected(&self) -> bool {
        *self.client.session_state().borrow() == SessionState::Connected
    }

    /// What the revocation watcher has observed for the current candidate
    pub fn revocation(&self) -> Revocation {
        self.watcher
            .as_ref()
            .map_or(Revocation::NotRevoked, RevocationWatcher::status)
    }

    /// Whether another participant asked for, or took, this lock
    pub fn revoked(&self) -> bool {
        self.revocation().is_revoked()
    }

    /// Wait until revocation is observed
    ///
    /// Returns at once with `NotRevoked` when the handle has no candidate.
    pub async fn wait_revoked(&self) -> Revocation {
        match &self.watcher {
            Some(watcher) => watcher.wait().await,
            None => Revocation::NotRevoked,
        }
    }

    /// Subscribe to revocation updates for the current candidate
    pub fn subscribe_revocation(&self) -> Option<watch::Receiver<Revocation>> {
        self.watcher.as_ref().map(RevocationWatcher::subscribe)
    }

    /// Acquire the lock
    ///
    /// Returns `Ok(false)` if `timeout` passes first, leaving no candidate
    /// behind. `Some(Duration::ZERO)` never waits.
    pub async fn acquire(
        &mut self,
        timeout: Option<Duration>,
        revoke: RevokeMode,
    ) -> Result<bool, LockError> {
        if matches!(self.state(), LockState::Held | LockState::Pending) {
            return Err(LockError::AlreadyAcquired(self.root.path().to_string()));
        }
        self.stop_watcher();
        self.candidate = None;

        let result = self.run_acquire(timeout, revoke).await;
        if let Err(e) = &result {
            tracing::warn!(lock = %self.root, error = %e, "acquire failed");
            if e.is_session_fatal() {
                self.forget();
            } else if self.abandon().await.is_err() {
                // Left pending; release() can remove the candidate later
                tracing::warn!(lock = %self.root, "could not remove candidate after failure");
            }
        }
        result
    }

    /// Acquire with options, returning a guard that releases on drop
    pub async fn lock(
        &mut self,
        options: AcquireOptions,
    ) -> Result<Option<LockGuard<'_, C, T>>, LockError> {
        if self.acquire(options.timeout, options.revoke).await? {
            Ok(Some(LockGuard::new(self)))
        } else {
            Ok(None)
        }
    }

    async fn run_acquire(
        &mut self,
        timeout: Option<Duration>,
        revoke: RevokeMode,
    ) -> Result<bool, LockError> {
        let deadline = timeout.map(|t| Instant::now() + t);

        ensure_root(&self.client, &self.root).await?;
        self.state = LockState::Pending;
        self.create_candidate().await?;

        let mut first_round = true;
        let mut requested: HashSet<String> = HashSet::new();
        loop {
            if !first_round && deadline.is_some_and(|d| Instant::now() >= d) {
                tracing::info!(lock = %self.root, "acquire timed out");
                self.abandon().await?;
                return Ok(false);
            }

            let Some(own) = self.candidate.as_ref().map(|c| c.name().clone()) else {
                self.create_candidate().await?;
                continue;
            };
            let children = self.client.get_children(self.root.path()).await?;
            let snapshot = QueueSnapshot::from_children(&children);

            let blockers = match snapshot.evaluate(own.name(), self.policy) {
                Evaluation::Acquired => {
                    self.state = LockState::Held;
                    tracing::info!(
                        lock = %self.root,
                        candidate = own.name(),
                        sequence = own.sequence(),
                        "lock acquired"
                    );
                    return Ok(true);
                }
                Evaluation::Missing => {
                    tracing::warn!(
                        lock = %self.root,
                        candidate = own.name(),
                        "candidate vanished, recreating"
                    );
                    self.create_candidate().await?;
                    continue;
                }
                Evaluation::Blocked { blockers } => blockers,
            };

            tracing::debug!(
                lock = %self.root,
                candidate = own.name(),
                blockers = blockers.len(),
                "blocked"
            );

            match revoke {
                RevokeMode::Immediate => {
                    for blocker in &blockers {
                        self.delete_blocker(blocker.name()).await?;
                    }
                    continue;
                }
                RevokeMode::Gentle => {
                    // Each set wakes every watcher of the blocker, so ask once
                    for blocker in &blockers {
                        if !requested.contains(blocker.name()) {
                            self.request_release(blocker.name()).await?;
                            requested.insert(blocker.name().to_string());
                        }
                    }
                }
                RevokeMode::None => {}
            }

            // Only an immediate revoke loops back without counting the round
            first_round = false;
            let Some(nearest) = blockers.last() else {
                continue;
            };
            let nearest_path = self.root.child_path(nearest.name());
            let (stat, watch) = self.client.exists_and_watch(&nearest_path).await?;
            if stat.is_none() {
                continue;
            }

            match deadline {
                Some(deadline) => {
                    tokio::select! {
                        event = watch.changed() => {
                            tracing::trace!(lock = %self.root, ?event, "blocker changed");
                        }
                        _ = tokio::time::sleep_until(deadline) => {}
                    }
                }
                None => {
                    let event = watch.changed().await;
                    tracing::trace!(lock = %self.root, ?event, "blocker changed");
                }
            }
        }
    }

    async fn delete_blocker(&self, name: &str) -> Result<(), LockError> {
        let path = self.root.child_path(name);
        match self.client.delete(&path, None).await {
            Ok(()) => {
                tracing::info!(lock = %self.root, blocker = name, "revoked blocker");
                Ok(())
            }
            Err(ClientError::NoNode(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn request_release(&self, name: &str) -> Result<(), LockError> {
        let path = self.root.child_path(name);
        match self.client.set(&path, UNLOCK_PAYLOAD, None).await {
            Ok(_) => {
                tracing::debug!(lock = %self.root, blocker = name, "requested release");
                Ok(())
            }
            Err(ClientError::NoNode(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_candidate(&mut self) -> Result<(), LockError> {
        self.stop_watcher();
        let token = self.tokens.next();
        let candidate = Candidate::create(&self.client, &self.root, self.role, &token).await?;
        self.watcher = Some(RevocationWatcher::spawn(
            self.client.clone(),
            candidate.path().to_string(),
        ));
        self.candidate = Some(candidate);
        Ok(())
    }

    /// Check whether the current candidate holds the lock right now
    pub async fn has_lock(&mut self) -> Result<bool, LockError> {
        let Some(own) = self.candidate.as_ref().map(|c| c.name().clone()) else {
            return Ok(false);
        };
        let children = match self.client.get_children(self.root.path()).await {
            Ok(children) => children,
            Err(e) => {
                if e.is_session_fatal() {
                    self.forget();
                }
                return Err(e.into());
            }
        };
        Ok(QueueSnapshot::from_children(&children)
            .evaluate(own.name(), self.policy)
            .is_acquired())
    }

    /// Release the lock
    ///
    /// Returns `Ok(true)` when a candidate node was deleted and `Ok(false)`
    /// when there was nothing to release.
    ///
    /// Through [`RetryingClient`](zkl_adapters::RetryingClient), a delete
    /// retried after a connection loss cannot tell whether it or someone
    /// else removed the node. Such a release reports `Ok(true)` even if an
    /// immediate revoker deleted the candidate during the outage.
    pub async fn release(&mut self) -> Result<bool, LockError> {
        let Some(candidate) = self.candidate.take() else {
            self.stop_watcher();
            return Ok(false);
        };
        self.stop_watcher();

        match self.client.delete(candidate.path(), None).await {
            Ok(()) => {
                tracing::info!(
                    lock = %self.root,
                    candidate = candidate.name().name(),
                    "lock released"
                );
                self.state = LockState::Released;
                Ok(true)
            }
            Err(ClientError::NoNode(_)) => {
                tracing::debug!(
                    lock = %self.root,
                    candidate = candidate.name().name(),
                    "already gone"
                );
                self.state = LockState::Released;
                Ok(false)
            }
            Err(e) if e.is_session_fatal() => {
                self.state = LockState::Idle;
                Err(e.into())
            }
            Err(e) => {
                // Keep the candidate so release can be retried
                self.candidate = Some(candidate);
                Err(e.into())
            }
        }
    }

    /// Delete every child of the lock node, held or not
    pub async fn clear(&self) -> Result<usize, LockError> {
        admin::clear_lock(&self.client, &self.root).await
    }

    /// Drop the candidate after a timeout or failure
    async fn abandon(&mut self) -> Result<(), LockError> {
        self.stop_watcher();
        if let Some(candidate) = self.candidate.take() {
            match self.client.delete(candidate.path(), None).await {
                Ok(()) | Err(ClientError::NoNode(_)) => {}
                Err(e) => {
                    self.candidate = Some(candidate);
                    return Err(e.into());
                }
            }
        }
        self.state = LockState::Idle;
        Ok(())
    }

    /// Forget the candidate without touching the service
    fn forget(&mut self) {
        self.stop_watcher();
        self.candidate = None;
        self.state = LockState::Idle;
    }

    fn stop_watcher(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.stop();
        }
    }

    /// Delete the candidate in the background, if a runtime is available
    pub(crate) fn spawn_cleanup(&mut self) {
        self.stop_watcher();
        let Some(candidate) = self.candidate.take() else {
            return;
        };
        self.state = LockState::Released;

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                candidate = candidate.path(),
                "no runtime to release candidate, leaving it to session end"
            );
            return;
        };
        let client = self.client.clone();
        runtime.spawn(async move {
            match client.delete(candidate.path(), None).await {
                Ok(()) | Err(ClientError::NoNode(_)) => {
                    tracing::debug!(candidate = candidate.path(), "released on drop");
                }
                Err(e) => tracing::warn!(
                    candidate = candidate.path(),
                    error = %e,
                    "release on drop failed"
                ),
            }
        });
    }
}

impl<C: CoordinationClient, T: TokenGen> Drop for LockHandle<C, T> {
    fn drop(&mut self) {
        self.spawn_cleanup();
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
