// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Revocation signaling for a candidate
//!
//! A background task keeps a data watch on the candidate's own node. Another
//! participant asks for the lock by writing `unlock` to it, or takes the lock
//! by deleting it. The task publishes what it saw on a watch channel; it never
//! releases anything itself.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use zkl_adapters::{ClientError, CoordinationClient, WatchEvent};
use zkl_core::node::UNLOCK_PAYLOAD;

/// What the candidate's watcher has observed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Revocation {
    NotRevoked,
    /// A waiter wrote `unlock`; the holder should release soon
    Requested,
    /// The node is gone: deleted by a revoker or by session end
    Removed,
}

impl Revocation {
    pub fn is_revoked(&self) -> bool {
        !matches!(self, Revocation::NotRevoked)
    }
}

/// Watch task bound to one candidate node
#[derive(Debug)]
pub struct RevocationWatcher {
    rx: watch::Receiver<Revocation>,
    task: JoinHandle<()>,
}

impl RevocationWatcher {
    /// Start watching `path`
    pub fn spawn<C: CoordinationClient>(client: C, path: String) -> Self {
        let (tx, rx) = watch::channel(Revocation::NotRevoked);
        let task = tokio::spawn(watch_candidate(client, path, tx));
        Self { rx, task }
    }

    pub fn status(&self) -> Revocation {
        *self.rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Revocation> {
        self.rx.clone()
    }

    /// Wait until revocation is observed
    ///
    /// Returns the last known status if the watcher stops first.
    pub async fn wait(&self) -> Revocation {
        let mut rx = self.rx.clone();
        let observed = rx.wait_for(Revocation::is_revoked).await.map(|status| *status);
        observed.unwrap_or_else(|_| *rx.borrow())
    }

    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for RevocationWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn mark(tx: &watch::Sender<Revocation>, status: Revocation) {
    tx.send_if_modified(|current| {
        // Removed is final; Requested only upgrades
        let upgrade = match (*current, status) {
            (Revocation::Removed, _) => false,
            (Revocation::Requested, Revocation::NotRevoked) => false,
            (old, new) => old != new,
        };
        if upgrade {
            *current = status;
        }
        upgrade
    });
}

async fn watch_candidate<C: CoordinationClient>(
    client: C,
    path: String,
    tx: watch::Sender<Revocation>,
) {
    loop {
        let watch = match client.get_and_watch(&path).await {
            Ok((data, _, watch)) => {
                if data == UNLOCK_PAYLOAD {
                    tracing::info!(candidate = %path, "revocation requested");
                    mark(&tx, Revocation::Requested);
                }
                watch
            }
            Err(ClientError::NoNode(_)) => {
                tracing::info!(candidate = %path, "candidate removed");
                mark(&tx, Revocation::Removed);
                return;
            }
            Err(e) if e.is_session_fatal() || e == ClientError::Closed => {
                tracing::warn!(candidate = %path, error = %e, "session ended while holding");
                mark(&tx, Revocation::Removed);
                return;
            }
            Err(e) => {
                tracing::warn!(candidate = %path, error = %e, "revocation watch stopped");
                return;
            }
        };

        match watch.changed().await {
            WatchEvent::NodeDeleted => {
                tracing::info!(candidate = %path, "candidate removed");
                mark(&tx, Revocation::Removed);
                return;
            }
            WatchEvent::Session(state) if state.is_terminal() => {
                tracing::warn!(candidate = %path, %state, "session ended while holding");
                mark(&tx, Revocation::Removed);
                return;
            }
            // Data changes and anything else re-arm with a fresh read
            _ => {}
        }
    }
}

#[cfg(test)]
#[path = "revocation_tests.rs"]
mod tests;
