// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exclusive lock behavior

use crate::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[tokio::test]
async fn at_most_one_holder_at_a_time() {
    let service = FakeCoordinationService::new();
    let inside = Arc::new(AtomicUsize::new(0));
    let rounds = Arc::new(AtomicUsize::new(0));

    let mut tasks = Vec::new();
    for _ in 0..5 {
        let participant = Participant::join(&service);
        let inside = Arc::clone(&inside);
        let rounds = Arc::clone(&rounds);
        tasks.push(tokio::spawn(async move {
            let mut handle = participant.exclusive();
            for _ in 0..3 {
                let guard = handle.lock(AcquireOptions::new()).await.unwrap().unwrap();
                assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                settle().await;
                inside.fetch_sub(1, Ordering::SeqCst);
                rounds.fetch_add(1, Ordering::SeqCst);
                guard.release().await.unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(rounds.load(Ordering::SeqCst), 15);
    assert!(service.children(LOCK_PATH).is_empty());
}

#[tokio::test]
async fn waiters_are_served_in_arrival_order() {
    let service = FakeCoordinationService::new();
    let holder = Participant::join(&service);
    let mut first = holder.exclusive();
    assert!(first.acquire(None, RevokeMode::None).await.unwrap());

    let order = Arc::new(Mutex::new(Vec::new()));
    let mut tasks = Vec::new();
    for id in 1..=3 {
        let participant = Participant::join(&service);
        let order = Arc::clone(&order);
        tasks.push(tokio::spawn(async move {
            let mut handle = participant.exclusive();
            let guard = handle.lock(AcquireOptions::new()).await.unwrap().unwrap();
            order.lock().unwrap().push(id);
            guard.release().await.unwrap();
        }));
        until(|| service.children(LOCK_PATH).len() == id + 1).await;
    }

    first.release().await.unwrap();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
}

#[tokio::test]
async fn order_follows_sequence_not_token() {
    let service = FakeCoordinationService::new();
    let holder = Participant::join(&service);
    let mut first = holder.exclusive();
    first.acquire(None, RevokeMode::None).await.unwrap();

    let order = Arc::new(Mutex::new(Vec::new()));
    let mut tasks = Vec::new();
    for waiting in 1..=4 {
        let participant = Participant::join(&service);
        let order = Arc::clone(&order);
        tasks.push(tokio::spawn(async move {
            let mut handle = participant.exclusive();
            handle.acquire(None, RevokeMode::None).await.unwrap();
            let path = handle.candidate_path().unwrap().to_string();
            order.lock().unwrap().push(sequence_of(&path));
            handle.release().await.unwrap();
        }));
        until(|| service.children(LOCK_PATH).len() == waiting + 1).await;
    }

    let root = LockRoot::new(CONTAINER, LOCK).unwrap();
    let infos = admin::show_lock(&holder.client, &root).await.unwrap();
    let holding: Vec<u64> = infos.iter().filter(|i| i.holding).map(|i| i.sequence).collect();
    assert_eq!(holding, vec![0]);

    first.release().await.unwrap();
    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(*order.lock().unwrap(), vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn zero_timeout_fails_fast_without_leaving_a_candidate() {
    let service = FakeCoordinationService::new();
    let holder = Participant::join(&service);
    let mut held = holder.exclusive();
    held.acquire(None, RevokeMode::None).await.unwrap();

    let other = Participant::join(&service);
    let mut attempt = other.exclusive();

    assert!(!attempt
        .acquire(Some(Duration::ZERO), RevokeMode::None)
        .await
        .unwrap());
    assert_eq!(attempt.state(), LockState::Idle);
    assert_eq!(service.children(LOCK_PATH).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn timed_out_waiter_withdraws() {
    let service = FakeCoordinationService::new();
    let holder = Participant::join(&service);
    let mut held = holder.exclusive();
    held.acquire(None, RevokeMode::None).await.unwrap();

    let other = Participant::join(&service);
    let mut attempt = other.exclusive();
    let acquired = attempt
        .acquire(Some(Duration::from_secs(5)), RevokeMode::None)
        .await
        .unwrap();

    assert!(!acquired);
    assert_eq!(attempt.state(), LockState::Idle);
    assert_eq!(service.children(LOCK_PATH).len(), 1);
    assert!(held.has_lock().await.unwrap());
}

#[tokio::test]
async fn release_twice_is_harmless() {
    let service = FakeCoordinationService::new();
    let participant = Participant::join(&service);
    let mut handle = participant.exclusive();
    handle.acquire(None, RevokeMode::None).await.unwrap();

    assert!(handle.release().await.unwrap());
    assert!(!handle.release().await.unwrap());
    assert!(!handle.has_lock().await.unwrap());
}

#[tokio::test]
async fn waiter_watches_only_its_predecessor() {
    let service = FakeCoordinationService::new();
    let participants: Vec<Participant> = (0..3).map(|_| Participant::join(&service)).collect();
    let mut first = participants[0].exclusive();
    first.acquire(None, RevokeMode::None).await.unwrap();
    let first_path = first.candidate_path().unwrap().to_string();

    let second = spawn_acquire(participants[1].exclusive(), AcquireOptions::new());
    until(|| participants[1].watched(&first_path)).await;
    let second_path = candidate_with_sequence(&service, 1);
    let third = spawn_acquire(participants[2].exclusive(), AcquireOptions::new());
    until(|| participants[2].watched(&second_path)).await;

    assert!(!participants[2].watched(&first_path));

    first.release().await.unwrap();
    let (acquired, mut second) = second.await.unwrap();
    assert!(acquired.unwrap());
    second.release().await.unwrap();
    let (acquired, _third) = third.await.unwrap();
    assert!(acquired.unwrap());
}
