// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for lock operations

use thiserror::Error;
use zkl_adapters::ClientError;
use zkl_core::NodeError;

/// Errors that can occur while acquiring, holding, or inspecting a lock
#[derive(Debug, Error)]
pub enum LockError {
    #[error("coordination error: {0}")]
    Client(#[from] ClientError),
    #[error("lock already acquired: {0}")]
    AlreadyAcquired(String),
    #[error("invalid lock name: {0}")]
    InvalidName(String),
}

impl LockError {
    /// The session ended and every candidate it owned is gone
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, LockError::Client(e) if e.is_session_fatal())
    }
}

impl From<NodeError> for LockError {
    fn from(err: NodeError) -> Self {
        match err {
            NodeError::InvalidPath(s) | NodeError::InvalidLockName(s) => LockError::InvalidName(s),
        }
    }
}
