// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordination service client interface
//!
//! The lock protocol needs exactly these operations from a ZooKeeper-like
//! service: create (optionally ephemeral and sequential), delete, get and set,
//! existence checks, children listing, one-shot watches, and a view of the
//! session state.

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{ClientCall, Fault, FakeClient, FakeCoordinationService};

#[cfg(feature = "zookeeper")]
mod zookeeper;
#[cfg(feature = "zookeeper")]
pub use self::zookeeper::ZooKeeperClient;

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;
use tokio::sync::{oneshot, watch};

/// Errors from coordination service operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("node does not exist: {0}")]
    NoNode(String),
    #[error("node already exists: {0}")]
    NodeExists(String),
    #[error("version mismatch: {0}")]
    BadVersion(String),
    #[error("node has children: {0}")]
    NotEmpty(String),
    #[error("connection lost")]
    ConnectionLoss,
    #[error("operation timed out")]
    OperationTimeout,
    #[error("client is closing")]
    Closing,
    #[error("session expired")]
    SessionExpired,
    #[error("authentication failed")]
    AuthFailed,
    #[error("client closed")]
    Closed,
    #[error("connection did not recover before the deadline")]
    RecoveryTimeout,
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("coordination service error: {0}")]
    Other(String),
}

impl ClientError {
    /// Conditions that clear up once the session reconnects
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ClientError::ConnectionLoss | ClientError::OperationTimeout | ClientError::Closing
        )
    }

    /// Conditions after which every ephemeral node of the session is gone
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, ClientError::SessionExpired | ClientError::AuthFailed)
    }
}

/// Node creation flags
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CreateMode {
    Persistent,
    Ephemeral,
    PersistentSequential,
    EphemeralSequential,
}

impl CreateMode {
    pub fn is_ephemeral(&self) -> bool {
        matches!(self, CreateMode::Ephemeral | CreateMode::EphemeralSequential)
    }

    pub fn is_sequential(&self) -> bool {
        matches!(
            self,
            CreateMode::PersistentSequential | CreateMode::EphemeralSequential
        )
    }
}

/// Access control entry
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Acl {
    pub perms: u32,
    pub scheme: String,
    pub id: String,
}

impl Acl {
    /// All permissions
    pub const ALL: u32 = 0x1f;

    /// World-readable and writable
    pub fn open_unsafe() -> Vec<Acl> {
        vec![Acl {
            perms: Self::ALL,
            scheme: "world".to_string(),
            id: "anyone".to_string(),
        }]
    }
}

/// Node metadata
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stat {
    /// Data version, incremented on every set
    pub version: i32,
    /// Creation time, milliseconds since the epoch
    pub ctime: i64,
    /// Last modification time, milliseconds since the epoch
    pub mtime: i64,
    /// Owning session of an ephemeral node, 0 otherwise
    pub ephemeral_owner: i64,
    pub num_children: i32,
}

/// State of the client's session with the service
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    /// Terminal: the service dropped the session and its ephemeral nodes
    Expired,
    /// Terminal
    AuthFailed,
    /// Terminal: closed locally
    Closed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Expired | SessionState::AuthFailed | SessionState::Closed
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Expired => "expired",
            SessionState::AuthFailed => "auth_failed",
            SessionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Notification delivered to a one-shot watch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WatchEvent {
    NodeCreated,
    NodeDataChanged,
    NodeDeleted,
    NodeChildrenChanged,
    Session(SessionState),
}

/// Receiving half of a one-shot watch
#[derive(Debug)]
pub struct Watch {
    rx: oneshot::Receiver<WatchEvent>,
}

/// Sending half of a one-shot watch, held by the client implementation
#[derive(Debug)]
pub struct WatchTrigger {
    tx: oneshot::Sender<WatchEvent>,
}

impl Watch {
    pub fn channel() -> (WatchTrigger, Watch) {
        let (tx, rx) = oneshot::channel();
        (WatchTrigger { tx }, Watch { rx })
    }

    /// Wait for the watch to fire
    ///
    /// A watch dropped by its client without firing reports a closed session.
    pub async fn changed(self) -> WatchEvent {
        self.rx
            .await
            .unwrap_or(WatchEvent::Session(SessionState::Closed))
    }
}

impl WatchTrigger {
    /// Deliver the event; the receiver may already be gone
    pub fn fire(self, event: WatchEvent) {
        let _ = self.tx.send(event);
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Operations the lock protocol needs from the coordination service
///
/// Implementations must be safe to call concurrently from many lock handles.
#[async_trait]
pub trait CoordinationClient: Clone + Send + Sync + 'static {
    /// Create a node, returning its actual path (with sequence suffix if any)
    async fn create(
        &self,
        path: &str,
        data: &[u8],
        acl: &[Acl],
        mode: CreateMode,
    ) -> Result<String, ClientError>;

    /// Delete a node, optionally only at the given version
    async fn delete(&self, path: &str, version: Option<i32>) -> Result<(), ClientError>;

    /// Read a node's data and metadata
    async fn get(&self, path: &str) -> Result<(Vec<u8>, Stat), ClientError>;

    /// Read a node and watch for its next change or deletion
    async fn get_and_watch(&self, path: &str) -> Result<(Vec<u8>, Stat, Watch), ClientError>;

    /// Replace a node's data, optionally only at the given version
    async fn set(&self, path: &str, data: &[u8], version: Option<i32>)
        -> Result<Stat, ClientError>;

    /// Metadata of a node if it exists
    async fn exists(&self, path: &str) -> Result<Option<Stat>, ClientError>;

    /// Check a node and watch for its creation, change, or deletion
    async fn exists_and_watch(&self, path: &str) -> Result<(Option<Stat>, Watch), ClientError>;

    /// Names of a node's children, in no particular order
    async fn get_children(&self, path: &str) -> Result<Vec<String>, ClientError>;

    /// Observe session state transitions
    fn session_state(&self) -> watch::Receiver<SessionState>;
}
