// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session loss, lost replies, and recovery

use crate::prelude::*;
use zkl_engine::Candidate;

#[tokio::test]
async fn expired_holder_frees_the_next_waiter() {
    let service = FakeCoordinationService::new();
    let a = Participant::join(&service);
    let b = Participant::join(&service);
    let mut holder = a.exclusive();
    holder.acquire(None, RevokeMode::None).await.unwrap();
    let holder_path = holder.candidate_path().unwrap().to_string();

    let waiter = spawn_acquire(b.exclusive(), AcquireOptions::new());
    until(|| b.watched(&holder_path)).await;
    a.session.expire();

    let (acquired, waiter) = waiter.await.unwrap();
    assert!(acquired.unwrap());
    assert_eq!(waiter.state(), LockState::Held);
    assert_eq!(holder.wait_revoked().await, Revocation::Removed);
}

#[tokio::test]
async fn closed_holder_frees_the_next_waiter() {
    let service = FakeCoordinationService::new();
    let a = Participant::join(&service);
    let b = Participant::join(&service);
    let mut holder = a.exclusive();
    holder.acquire(None, RevokeMode::None).await.unwrap();
    let holder_path = holder.candidate_path().unwrap().to_string();

    let waiter = spawn_acquire(b.exclusive(), AcquireOptions::new());
    until(|| b.watched(&holder_path)).await;
    a.session.close();

    let (acquired, _waiter) = waiter.await.unwrap();
    assert!(acquired.unwrap());
}

#[tokio::test(start_paused = true)]
async fn lost_create_reply_yields_the_created_node() {
    let service = FakeCoordinationService::new();
    let participant = Participant::join(&service);
    let root = LockRoot::new(CONTAINER, LOCK).unwrap();
    zkl_engine::ensure_root(&participant.client, &root)
        .await
        .unwrap();
    participant.session.inject(Fault::LoseReply);

    let candidate = Candidate::create(&participant.client, &root, Role::Lock, "tok")
        .await
        .unwrap();

    assert_eq!(candidate.path(), "/Locks/job/lock-tok-0000000000");
    assert_eq!(service.children(LOCK_PATH), vec!["lock-tok-0000000000"]);
}

#[tokio::test(start_paused = true)]
async fn acquire_survives_a_brief_disconnect() {
    let service = FakeCoordinationService::new();
    let participant = Participant::join(&service);
    participant.session.disconnect();

    let task = spawn_acquire(participant.exclusive(), AcquireOptions::new());
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(!task.is_finished());
    participant.session.reconnect();

    let (acquired, _handle) = task.await.unwrap();
    assert!(acquired.unwrap());
    assert_eq!(service.children(LOCK_PATH).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn long_disconnect_surfaces_recovery_timeout() {
    let service = FakeCoordinationService::new();
    let participant = Participant::join_with_recovery(&service, Some(Duration::from_secs(1)));
    participant.session.disconnect();

    let mut handle = participant.exclusive();
    let err = handle
        .acquire(None, RevokeMode::None)
        .await
        .unwrap_err();

    assert!(matches!(err, zkl_engine::LockError::Client(ClientError::RecoveryTimeout)));
    assert_eq!(handle.state(), LockState::Idle);
}

#[tokio::test]
async fn own_expiry_while_waiting_is_reported() {
    let service = FakeCoordinationService::new();
    let a = Participant::join(&service);
    let b = Participant::join(&service);
    let mut holder = a.exclusive();
    holder.acquire(None, RevokeMode::None).await.unwrap();
    let holder_path = holder.candidate_path().unwrap().to_string();

    let waiter = spawn_acquire(b.exclusive(), AcquireOptions::new());
    until(|| b.watched(&holder_path)).await;
    b.session.expire();

    let (acquired, waiter) = waiter.await.unwrap();
    assert!(acquired.unwrap_err().is_session_fatal());
    assert!(waiter.candidate_path().is_none());
    assert!(holder.has_lock().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn release_with_lost_reply_reports_deleted() {
    let service = FakeCoordinationService::new();
    let participant = Participant::join(&service);
    let mut handle = participant.exclusive();
    handle.acquire(None, RevokeMode::None).await.unwrap();
    participant.session.inject(Fault::LoseReply);

    assert!(handle.release().await.unwrap());
    assert_eq!(handle.state(), LockState::Released);
    assert!(service.children(LOCK_PATH).is_empty());
}
