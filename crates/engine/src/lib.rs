// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Distributed lock engine
//!
//! Exclusive, shared read, and shared write locks over any
//! [`CoordinationClient`](zkl_adapters::CoordinationClient), with optional
//! revocation of blocking holders.

pub mod admin;
mod candidate;
mod error;
mod guard;
mod lock;
mod revocation;

pub use admin::{CandidateInfo, LockStatus, LockSummary};
pub use candidate::{ensure_root, Candidate};
pub use error::LockError;
pub use guard::LockGuard;
pub use lock::{AcquireOptions, LockHandle, LockState};
pub use revocation::{Revocation, RevocationWatcher};
