// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! zkl-core: pure lock protocol logic
//!
//! This crate provides:
//! - Candidate node naming and lock paths
//! - The lock queue ordering engine (exclusive and shared read/write policies)
//! - Revocation modes
//! - Token generation for candidate names
//! - Client and lock configuration
//!
//! Nothing in here talks to a coordination service.

pub mod config;
pub mod id;
pub mod node;
pub mod queue;
pub mod revoke;

pub use config::{ClientConfig, Config, ConfigError, LockConfig};
pub use id::{SequentialTokenGen, TokenGen, UuidTokenGen};
pub use node::{CandidateName, LockRoot, NodeError, Role};
pub use queue::{Evaluation, OrderingPolicy, QueueSnapshot};
pub use revoke::RevokeMode;
