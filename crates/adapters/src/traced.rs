// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced client wrapper for consistent observability

use crate::client::{Acl, ClientError, CoordinationClient, CreateMode, SessionState, Stat, Watch};
use async_trait::async_trait;
use tokio::sync::watch;
use tracing::Instrument;
use zkl_core::node::validate_path;

/// Wrapper that adds tracing to any CoordinationClient
#[derive(Clone)]
pub struct TracedClient<C> {
    inner: C,
}

impl<C> TracedClient<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

/// Reject malformed paths before they reach the service
fn check_path(path: &str) -> Result<(), ClientError> {
    validate_path(path).map_err(|_| {
        tracing::error!(path, "invalid path");
        ClientError::InvalidPath(path.to_string())
    })
}

#[async_trait]
impl<C: CoordinationClient> CoordinationClient for TracedClient<C> {
    async fn create(
        &self,
        path: &str,
        data: &[u8],
        acl: &[Acl],
        mode: CreateMode,
    ) -> Result<String, ClientError> {
        let span = tracing::info_span!("coordination.create", path, mode = ?mode);
        async {
            // Sequential requests end in a name prefix that may be empty
            let base = if mode.is_sequential() {
                format!("{}0", path)
            } else {
                path.to_string()
            };
            check_path(&base)?;

            tracing::debug!(data_len = data.len(), "creating");
            let start = std::time::Instant::now();
            let result = self.inner.create(path, data, acl, mode).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(created) => tracing::debug!(
                    created = %created,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "created"
                ),
                // Callers routinely create containers that may already exist
                Err(ClientError::NodeExists(_)) => tracing::debug!("already exists"),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "create failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn delete(&self, path: &str, version: Option<i32>) -> Result<(), ClientError> {
        let span = tracing::info_span!("coordination.delete", path, version = ?version);
        async {
            check_path(path)?;
            let result = self.inner.delete(path, version).await;
            match &result {
                Ok(()) => tracing::debug!("deleted"),
                Err(ClientError::NoNode(_)) => tracing::debug!("already gone"),
                Err(e) => tracing::warn!(error = %e, "delete failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn get(&self, path: &str) -> Result<(Vec<u8>, Stat), ClientError> {
        check_path(path)?;
        let result = self.inner.get(path).await;
        tracing::trace!(path, data_len = ?result.as_ref().map(|(d, _)| d.len()).ok(), "get");
        result
    }

    async fn get_and_watch(&self, path: &str) -> Result<(Vec<u8>, Stat, Watch), ClientError> {
        check_path(path)?;
        let result = self.inner.get_and_watch(path).await;
        tracing::trace!(path, ok = result.is_ok(), "get with watch");
        result
    }

    async fn set(
        &self,
        path: &str,
        data: &[u8],
        version: Option<i32>,
    ) -> Result<Stat, ClientError> {
        let span = tracing::info_span!("coordination.set", path, data_len = data.len());
        async {
            check_path(path)?;
            let result = self.inner.set(path, data, version).await;
            match &result {
                Ok(stat) => tracing::debug!(version = stat.version, "set"),
                Err(e) => tracing::warn!(error = %e, "set failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn exists(&self, path: &str) -> Result<Option<Stat>, ClientError> {
        check_path(path)?;
        let result = self.inner.exists(path).await;
        tracing::trace!(path, exists = ?result.as_ref().map(Option::is_some).ok(), "exists");
        result
    }

    async fn exists_and_watch(&self, path: &str) -> Result<(Option<Stat>, Watch), ClientError> {
        check_path(path)?;
        let result = self.inner.exists_and_watch(path).await;
        tracing::trace!(
            path,
            exists = ?result.as_ref().map(|(s, _)| s.is_some()).ok(),
            "exists with watch"
        );
        result
    }

    async fn get_children(&self, path: &str) -> Result<Vec<String>, ClientError> {
        check_path(path)?;
        let result = self.inner.get_children(path).await;
        tracing::trace!(path, count = ?result.as_ref().map(Vec::len).ok(), "children");
        result
    }

    fn session_state(&self) -> watch::Receiver<SessionState> {
        self.inner.session_state()
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
