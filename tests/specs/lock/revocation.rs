// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Revocation of blocking holders

use crate::prelude::*;
use zkl_core::node::UNLOCK_PAYLOAD;

#[tokio::test]
async fn immediate_revocation_deletes_the_holder() {
    let service = FakeCoordinationService::new();
    let a = Participant::join(&service);
    let b = Participant::join(&service);
    let mut holder = a.exclusive();
    holder.acquire(None, RevokeMode::None).await.unwrap();

    let mut taker = b.exclusive();
    let acquired = taker
        .acquire(Some(Duration::ZERO), RevokeMode::Immediate)
        .await
        .unwrap();

    assert!(acquired);
    assert_eq!(holder.wait_revoked().await, Revocation::Removed);
    assert_eq!(holder.state(), LockState::Revoked);
    assert_eq!(service.children(LOCK_PATH).len(), 1);
}

#[tokio::test]
async fn immediate_writer_revokes_every_reader() {
    let service = FakeCoordinationService::new();
    let a = Participant::join(&service);
    let b = Participant::join(&service);
    let w = Participant::join(&service);
    let mut r1 = a.reader();
    let mut r2 = b.reader();
    r1.acquire(None, RevokeMode::None).await.unwrap();
    r2.acquire(None, RevokeMode::None).await.unwrap();

    let mut writer = w.writer();
    assert!(writer
        .acquire(None, RevokeMode::Immediate)
        .await
        .unwrap());

    assert_eq!(r1.wait_revoked().await, Revocation::Removed);
    assert_eq!(r2.wait_revoked().await, Revocation::Removed);
}

#[tokio::test]
async fn gentle_revocation_waits_for_cooperative_release() {
    let service = FakeCoordinationService::new();
    let a = Participant::join(&service);
    let b = Participant::join(&service);
    let mut holder = a.exclusive();
    holder.acquire(None, RevokeMode::None).await.unwrap();
    let holder_path = holder.candidate_path().unwrap().to_string();

    let taker = spawn_acquire(
        b.exclusive(),
        AcquireOptions::new().with_revoke(RevokeMode::Gentle),
    );

    assert_eq!(holder.wait_revoked().await, Revocation::Requested);
    assert_eq!(service.data(&holder_path).unwrap(), UNLOCK_PAYLOAD);
    settle().await;
    assert!(!taker.is_finished());
    assert!(holder.has_lock().await.unwrap());

    holder.release().await.unwrap();
    let (acquired, _taker) = taker.await.unwrap();
    assert!(acquired.unwrap());
}

#[tokio::test]
async fn guard_holder_observes_revocation() {
    let service = FakeCoordinationService::new();
    let a = Participant::join(&service);
    let b = Participant::join(&service);
    let mut handle = a.exclusive();
    let guard = handle.lock(AcquireOptions::new()).await.unwrap().unwrap();

    let taker = spawn_acquire(
        b.exclusive(),
        AcquireOptions::new().with_revoke(RevokeMode::Gentle),
    );
    assert_eq!(guard.wait_revoked().await, Revocation::Requested);
    assert!(guard.revoked());
    guard.release().await.unwrap();

    let (acquired, _taker) = taker.await.unwrap();
    assert!(acquired.unwrap());
}

/// Writer `A` holding, readers `B` and `C` queued behind it
async fn writer_then_two_readers(
    service: &FakeCoordinationService,
) -> (Handle, Acquiring, Acquiring) {
    let mut a = Participant::join(service).writer();
    a.acquire(None, RevokeMode::None).await.unwrap();
    let b = spawn_acquire(Participant::join(service).reader(), AcquireOptions::new());
    until(|| service.children(LOCK_PATH).len() == 2).await;
    let c = spawn_acquire(Participant::join(service).reader(), AcquireOptions::new());
    until(|| service.children(LOCK_PATH).len() == 3).await;
    (a, b, c)
}

#[tokio::test]
async fn gentle_writer_waits_for_mixed_queue_to_give_way() {
    let service = FakeCoordinationService::new();
    let (mut a, b, c) = writer_then_two_readers(&service).await;

    let d = spawn_acquire(
        Participant::join(&service).writer(),
        AcquireOptions::new().with_revoke(RevokeMode::Gentle),
    );
    assert_eq!(a.wait_revoked().await, Revocation::Requested);
    for sequence in 1..=2 {
        let path = candidate_with_sequence(&service, sequence);
        until(|| service.data(&path).as_deref() == Some(UNLOCK_PAYLOAD)).await;
    }
    settle().await;
    assert!(!d.is_finished());

    a.release().await.unwrap();
    let (acquired, mut b) = b.await.unwrap();
    assert!(acquired.unwrap());
    let (acquired, mut c) = c.await.unwrap();
    assert!(acquired.unwrap());
    assert_eq!(b.wait_revoked().await, Revocation::Requested);
    assert_eq!(c.wait_revoked().await, Revocation::Requested);
    settle().await;
    assert!(!d.is_finished());

    b.release().await.unwrap();
    settle().await;
    assert!(!d.is_finished());
    c.release().await.unwrap();

    let (acquired, d) = d.await.unwrap();
    assert!(acquired.unwrap());
    assert_eq!(d.state(), LockState::Held);
    assert_eq!(service.children(LOCK_PATH).len(), 1);
}

#[tokio::test]
async fn immediate_writer_clears_mixed_queue() {
    let service = FakeCoordinationService::new();
    let (a, b, c) = writer_then_two_readers(&service).await;

    let mut d = Participant::join(&service).writer();
    assert!(d.acquire(None, RevokeMode::Immediate).await.unwrap());
    assert_eq!(a.wait_revoked().await, Revocation::Removed);
    assert_eq!(sequence_of(d.candidate_path().unwrap()), 3);

    // Displaced readers rejoin behind the new writer
    until(|| service.children(LOCK_PATH).len() == 3).await;
    settle().await;
    assert!(!b.is_finished());
    assert!(!c.is_finished());

    d.release().await.unwrap();
    let (acquired, b) = b.await.unwrap();
    assert!(acquired.unwrap());
    assert!(sequence_of(b.candidate_path().unwrap()) > 3);
    let (acquired, _c) = c.await.unwrap();
    assert!(acquired.unwrap());
}
