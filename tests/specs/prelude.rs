// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for lock specs

#![allow(dead_code)]

pub use std::time::Duration;
pub use zkl_adapters::{
    ClientCall, ClientError, CoordinationClient, FakeClient, FakeCoordinationService, Fault,
    RetryingClient, TracedClient,
};
pub use zkl_core::{LockRoot, RevokeMode, Role};
pub use zkl_engine::{admin, AcquireOptions, LockHandle, LockState, Revocation};

pub const CONTAINER: &str = "/Locks";
pub const LOCK: &str = "job";
pub const LOCK_PATH: &str = "/Locks/job";

/// Client stack used by every participant
pub type Client = RetryingClient<TracedClient<FakeClient>>;

/// One participant: a session on the service plus its client stack
pub struct Participant {
    pub session: FakeClient,
    pub client: Client,
}

impl Participant {
    pub fn join(service: &FakeCoordinationService) -> Self {
        Self::join_with_recovery(service, Some(Duration::from_secs(30)))
    }

    pub fn join_with_recovery(
        service: &FakeCoordinationService,
        recovery_timeout: Option<Duration>,
    ) -> Self {
        let session = service.connect();
        let client = RetryingClient::new(TracedClient::new(session.clone()), recovery_timeout);
        Self { session, client }
    }

    pub fn exclusive(&self) -> LockHandle<Client> {
        LockHandle::exclusive(self.client.clone(), CONTAINER, LOCK).unwrap()
    }

    pub fn reader(&self) -> LockHandle<Client> {
        LockHandle::read(self.client.clone(), CONTAINER, LOCK).unwrap()
    }

    pub fn writer(&self) -> LockHandle<Client> {
        LockHandle::write(self.client.clone(), CONTAINER, LOCK).unwrap()
    }

    /// Whether this participant set a watch on `path`
    pub fn watched(&self, path: &str) -> bool {
        self.session.calls().iter().any(|call| {
            matches!(call, ClientCall::Exists { path: p, watch: true } if p == path)
        })
    }
}

pub type Handle = LockHandle<Client>;

/// An acquire running in the background
pub type Acquiring = tokio::task::JoinHandle<(Result<bool, zkl_engine::LockError>, Handle)>;

/// Acquire in a background task, handing the handle back when done
pub fn spawn_acquire(mut handle: Handle, options: AcquireOptions) -> Acquiring {
    tokio::spawn(async move {
        let acquired = handle.acquire(options.timeout, options.revoke).await;
        (acquired, handle)
    })
}

/// Yield until `condition` holds
pub async fn until(mut condition: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never held");
}

/// Let every runnable task make progress
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

/// Full path of the candidate carrying sequence `sequence`
pub fn candidate_with_sequence(service: &FakeCoordinationService, sequence: u64) -> String {
    let child = service
        .children(LOCK_PATH)
        .into_iter()
        .find(|child| sequence_of(child) == sequence)
        .unwrap();
    format!("{}/{}", LOCK_PATH, child)
}

/// Sequence suffix of a candidate path
pub fn sequence_of(path: &str) -> u64 {
    path.rsplit('-').next().unwrap().parse().unwrap()
}
