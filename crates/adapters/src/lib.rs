// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Coordination service clients and wrappers

pub mod client;
pub mod retry;
pub mod traced;

pub use client::{
    Acl, ClientError, CoordinationClient, CreateMode, SessionState, Stat, Watch, WatchEvent,
    WatchTrigger,
};
pub use retry::RetryingClient;
pub use traced::TracedClient;

#[cfg(feature = "zookeeper")]
pub use client::ZooKeeperClient;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use client::{ClientCall, Fault, FakeClient, FakeCoordinationService};
