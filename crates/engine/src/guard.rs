// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scoped lock ownership

use crate::lock::LockHandle;
use crate::revocation::Revocation;
use crate::LockError;
use zkl_adapters::CoordinationClient;
use zkl_core::TokenGen;

/// A held lock, released when the guard goes away
///
/// Prefer [`LockGuard::release`]; dropping an unreleased guard only schedules
/// a background delete on the current tokio runtime.
pub struct LockGuard<'a, C: CoordinationClient, T: TokenGen> {
    handle: &'a mut LockHandle<C, T>,
    released: bool,
}

impl<'a, C: CoordinationClient, T: TokenGen> LockGuard<'a, C, T> {
    pub(crate) fn new(handle: &'a mut LockHandle<C, T>) -> Self {
        Self {
            handle,
            released: false,
        }
    }

    pub fn handle(&self) -> &LockHandle<C, T> {
        self.handle
    }

    pub fn revoked(&self) -> bool {
        self.handle.revoked()
    }

    pub async fn wait_revoked(&self) -> Revocation {
        self.handle.wait_revoked().await
    }

    /// Release the lock now
    pub async fn release(mut self) -> Result<bool, LockError> {
        self.released = true;
        self.handle.release().await
    }
}

impl<C: CoordinationClient, T: TokenGen> Drop for LockGuard<'_, C, T> {
    fn drop(&mut self) {
        if !self.released {
            self.handle.spawn_cleanup();
        }
    }
}
