// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection-loss recovery for coordination clients
//!
//! Transient failures (connection loss, operation timeout) are retried once
//! the session reports it is connected again. Terminal session states end the
//! wait with the matching error, and an optional recovery timeout bounds it.
//!
//! Two operations are not naively idempotent:
//!
//! - A sequential create whose reply was lost may have been applied. Before
//!   creating again the parent is listed, and a child named by the requested
//!   prefix plus a sequence suffix is taken as the original result.
//! - A delete whose reply was lost may have been applied, so `NoNode` on a
//!   retried delete counts as success.

use crate::client::{Acl, ClientError, CoordinationClient, CreateMode, SessionState, Stat, Watch};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use zkl_core::node::{join_path, split_path};

/// Pause before retrying when the session never left the connected state
const RETRY_PAUSE: Duration = Duration::from_millis(50);

/// Wrapper that retries transient failures of any CoordinationClient
#[derive(Clone)]
pub struct RetryingClient<C> {
    inner: C,
    recovery_timeout: Option<Duration>,
}

impl<C: CoordinationClient> RetryingClient<C> {
    /// Wrap a client; `None` waits for recovery until the session ends
    pub fn new(inner: C, recovery_timeout: Option<Duration>) -> Self {
        Self {
            inner,
            recovery_timeout,
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Wait until the session is usable again
    async fn recover(
        &self,
        op: &'static str,
        path: &str,
        err: &ClientError,
        deadline: &mut Option<Instant>,
    ) -> Result<(), ClientError> {
        tracing::warn!(op, path, error = %err, "connection interrupted, waiting to retry");

        let deadline = match (*deadline, self.recovery_timeout) {
            (Some(d), _) => Some(d),
            (None, Some(timeout)) => {
                *deadline = Some(Instant::now() + timeout);
                *deadline
            }
            (None, None) => None,
        };

        let wait = wait_connected(self.inner.session_state());
        let result = match deadline {
            Some(d) => tokio::time::timeout_at(d, wait)
                .await
                .map_err(|_| ClientError::RecoveryTimeout)?,
            None => wait.await,
        };

        match &result {
            Ok(()) => tracing::debug!(op, path, "session connected, retrying"),
            Err(e) => tracing::error!(op, path, error = %e, "recovery failed"),
        }
        result
    }

    async fn retry<T, F, Fut>(
        &self,
        op: &'static str,
        path: &str,
        mut call: F,
    ) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, ClientError>> + Send,
        T: Send,
    {
        let mut deadline = None;
        loop {
            match call().await {
                Err(err) if err.is_transient() => {
                    self.recover(op, path, &err, &mut deadline).await?
                }
                result => return result,
            }
        }
    }

    /// Find the node an earlier, unacknowledged sequential create made
    async fn find_sequential(&self, requested: &str) -> Result<Option<String>, ClientError> {
        let Some((parent, prefix)) = split_path(requested) else {
            return Ok(None);
        };
        let children = self
            .retry("get_children", parent, || self.inner.get_children(parent))
            .await?;

        let mut matches: Vec<&String> = children
            .iter()
            .filter(|child| {
                child.strip_prefix(prefix).is_some_and(|suffix| {
                    !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit())
                })
            })
            .collect();
        matches.sort();
        Ok(matches.first().map(|child| join_path(parent, child)))
    }
}

/// Resolve once the session is connected, or fail on a terminal state
async fn wait_connected(mut rx: watch::Receiver<SessionState>) -> Result<(), ClientError> {
    let mut first = true;
    loop {
        let state = *rx.borrow_and_update();
        match state {
            SessionState::Connected if first => {
                // The failure raced the state change; pause so a reconnect can land
                tokio::time::sleep(RETRY_PAUSE).await;
                return Ok(());
            }
            SessionState::Connected => return Ok(()),
            SessionState::Expired => return Err(ClientError::SessionExpired),
            SessionState::AuthFailed => return Err(ClientError::AuthFailed),
            SessionState::Closed => return Err(ClientError::Closed),
            SessionState::Disconnected | SessionState::Connecting => {}
        }
        first = false;
        if rx.changed().await.is_err() {
            return Err(ClientError::Closed);
        }
    }
}

#[async_trait]
impl<C: CoordinationClient> CoordinationClient for RetryingClient<C> {
    async fn create(
        &self,
        path: &str,
        data: &[u8],
        acl: &[Acl],
        mode: CreateMode,
    ) -> Result<String, ClientError> {
        let mut deadline = None;
        loop {
            match self.inner.create(path, data, acl, mode).await {
                Err(err) if err.is_transient() => {
                    self.recover("create", path, &err, &mut deadline).await?;
                    if mode.is_sequential() {
                        if let Some(created) = self.find_sequential(path).await? {
                            tracing::info!(
                                path,
                                created = %created,
                                "recovered unacknowledged create"
                            );
                            return Ok(created);
                        }
                    }
                }
                result => return result,
            }
        }
    }

    async fn delete(&self, path: &str, version: Option<i32>) -> Result<(), ClientError> {
        let mut deadline = None;
        let mut retried = false;
        loop {
            match self.inner.delete(path, version).await {
                Err(err) if err.is_transient() => {
                    self.recover("delete", path, &err, &mut deadline).await?;
                    retried = true;
                }
                Err(ClientError::NoNode(_)) if retried => {
                    tracing::debug!(path, "delete applied before connection loss");
                    return Ok(());
                }
                result => return result,
            }
        }
    }

    async fn get(&self, path: &str) -> Result<(Vec<u8>, Stat), ClientError> {
        self.retry("get", path, || self.inner.get(path)).await
    }

    async fn get_and_watch(&self, path: &str) -> Result<(Vec<u8>, Stat, Watch), ClientError> {
        self.retry("get", path, || self.inner.get_and_watch(path)).await
    }

    async fn set(
        &self,
        path: &str,
        data: &[u8],
        version: Option<i32>,
    ) -> Result<Stat, ClientError> {
        self.retry("set", path, || self.inner.set(path, data, version)).await
    }

    async fn exists(&self, path: &str) -> Result<Option<Stat>, ClientError> {
        self.retry("exists", path, || self.inner.exists(path)).await
    }

    async fn exists_and_watch(&self, path: &str) -> Result<(Option<Stat>, Watch), ClientError> {
        self.retry("exists", path, || self.inner.exists_and_watch(path)).await
    }

    async fn get_children(&self, path: &str) -> Result<Vec<String>, ClientError> {
        self.retry("get_children", path, || self.inner.get_children(path)).await
    }

    fn session_state(&self) -> watch::Receiver<SessionState> {
        self.inner.session_state()
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
