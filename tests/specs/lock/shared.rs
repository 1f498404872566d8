// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared read/write lock behavior

use crate::prelude::*;

#[tokio::test]
async fn readers_hold_together() {
    let service = FakeCoordinationService::new();
    let participants: Vec<Participant> = (0..3).map(|_| Participant::join(&service)).collect();
    let mut readers: Vec<Handle> = participants.iter().map(Participant::reader).collect();

    for reader in &mut readers {
        assert!(reader
            .acquire(Some(Duration::ZERO), RevokeMode::None)
            .await
            .unwrap());
    }
    for reader in &mut readers {
        assert!(reader.has_lock().await.unwrap());
    }
}

#[tokio::test]
async fn writer_waits_for_every_earlier_reader() {
    let service = FakeCoordinationService::new();
    let a = Participant::join(&service);
    let b = Participant::join(&service);
    let w = Participant::join(&service);
    let mut r1 = a.reader();
    let mut r2 = b.reader();
    r1.acquire(None, RevokeMode::None).await.unwrap();
    r2.acquire(None, RevokeMode::None).await.unwrap();

    let writer = spawn_acquire(w.writer(), AcquireOptions::new());
    until(|| service.children(LOCK_PATH).len() == 3).await;

    r2.release().await.unwrap();
    settle().await;
    assert!(!writer.is_finished());

    r1.release().await.unwrap();
    let (acquired, writer) = writer.await.unwrap();
    assert!(acquired.unwrap());
    assert_eq!(writer.state(), LockState::Held);
}

#[tokio::test]
async fn reader_queued_behind_writer_waits() {
    let service = FakeCoordinationService::new();
    let w = Participant::join(&service);
    let r = Participant::join(&service);
    let mut writer = w.writer();
    writer.acquire(None, RevokeMode::None).await.unwrap();

    let mut reader = r.reader();
    assert!(!reader
        .acquire(Some(Duration::ZERO), RevokeMode::None)
        .await
        .unwrap());

    let reader = spawn_acquire(r.reader(), AcquireOptions::new());
    until(|| service.children(LOCK_PATH).len() == 2).await;
    writer.release().await.unwrap();
    let (acquired, _reader) = reader.await.unwrap();
    assert!(acquired.unwrap());
}

#[tokio::test]
async fn writers_exclude_each_other() {
    let service = FakeCoordinationService::new();
    let a = Participant::join(&service);
    let b = Participant::join(&service);
    let mut w1 = a.writer();
    let mut w2 = b.writer();

    assert!(w1.acquire(None, RevokeMode::None).await.unwrap());
    assert!(!w2
        .acquire(Some(Duration::ZERO), RevokeMode::None)
        .await
        .unwrap());
}

#[tokio::test]
async fn exclusive_lock_waits_for_reader() {
    let service = FakeCoordinationService::new();
    let a = Participant::join(&service);
    let b = Participant::join(&service);
    let mut reader = a.reader();
    reader.acquire(None, RevokeMode::None).await.unwrap();

    let mut exclusive = b.exclusive();
    assert!(!exclusive
        .acquire(Some(Duration::ZERO), RevokeMode::None)
        .await
        .unwrap());
}
