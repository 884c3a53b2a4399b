// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Tests for activation, login merge and teardown.

use favsync_core::{MemoryStorage, Mode, Phase, SyncEvent};

use crate::common::{FakeRemote, FetchOutcome, MutationOutcome, engine, ids, tab_store, wait_until};

#[tokio::test]
async fn activation_merges_local_into_server() {
    let storage = MemoryStorage::new();
    tab_store(&storage).save(&ids(&["A", "B"]));
    let remote = FakeRemote::with_members(&["B", "C"]);

    let favorites = engine(&storage, &remote);
    let phase = favorites.activate().await;

    assert_eq!(phase, Phase::Ready(Mode::Authenticated));
    assert_eq!(favorites.members(), ids(&["B", "C", "A"]));
    assert_eq!(favorites.count(), 3);
    assert_eq!(remote.applied(), vec![("A".to_string(), true)]);
    assert_eq!(remote.mutate_calls(), 1);
}

#[tokio::test]
async fn activation_clears_local_list_after_merge() {
    let storage = MemoryStorage::new();
    tab_store(&storage).save(&ids(&["A"]));
    let remote = FakeRemote::with_members(&[]);

    let favorites = engine(&storage, &remote);
    favorites.activate().await;

    assert!(tab_store(&storage).load().is_empty());
    assert!(favorites.is_member("A"));
}

#[tokio::test]
async fn activation_without_local_favorites_pushes_nothing() {
    let storage = MemoryStorage::new();
    let remote = FakeRemote::with_members(&["A"]);

    let favorites = engine(&storage, &remote);
    favorites.activate().await;

    assert_eq!(favorites.members(), ids(&["A"]));
    assert_eq!(remote.mutate_calls(), 0);
}

#[tokio::test]
async fn failed_merge_push_is_dropped_without_rollback() {
    let storage = MemoryStorage::new();
    tab_store(&storage).save(&ids(&["A"]));
    let remote = FakeRemote::with_members(&[]);
    remote.script_mutation(MutationOutcome::Status(503));

    let favorites = engine(&storage, &remote);
    favorites.activate().await;

    assert!(favorites.is_member("A"));
    assert!(!favorites.is_pending("A"));
    assert_eq!(remote.mutate_calls(), 1);
    assert!(remote.applied().is_empty());
}

#[tokio::test]
async fn unauthorized_fetch_falls_back_to_local() {
    let storage = MemoryStorage::new();
    tab_store(&storage).save(&ids(&["X", "Y"]));
    let remote = FakeRemote::with_members(&["S"]);
    remote.script_fetch(FetchOutcome::Unauthorized);

    let favorites = engine(&storage, &remote);
    let phase = favorites.activate().await;

    assert_eq!(phase, Phase::Ready(Mode::Anonymous));
    assert_eq!(favorites.mode(), Some(Mode::Anonymous));
    assert_eq!(favorites.members(), ids(&["X", "Y"]));
    assert!(!favorites.is_member("S"));
    assert_eq!(tab_store(&storage).load(), ids(&["X", "Y"]));
}

#[tokio::test]
async fn server_error_falls_back_to_local() {
    let storage = MemoryStorage::new();
    tab_store(&storage).save(&ids(&["X"]));
    let remote = FakeRemote::with_members(&[]);
    remote.script_fetch(FetchOutcome::Status(503));

    let favorites = engine(&storage, &remote);

    assert_eq!(favorites.activate().await, Phase::Ready(Mode::Anonymous));
    assert!(favorites.is_member("X"));
    assert_eq!(remote.mutate_calls(), 0);
}

#[tokio::test]
async fn activation_runs_once() {
    let storage = MemoryStorage::new();
    let remote = FakeRemote::with_members(&["A"]);

    let favorites = engine(&storage, &remote);
    favorites.activate().await;
    remote.set_server(&["B"]);
    let phase = favorites.activate().await;

    assert_eq!(phase, Phase::Ready(Mode::Authenticated));
    assert_eq!(remote.fetch_calls(), 1);
    assert_eq!(favorites.members(), ids(&["A"]));
}

#[tokio::test]
async fn activation_announces_mode() {
    let storage = MemoryStorage::new();
    let remote = FakeRemote::with_members(&[]);
    let favorites = engine(&storage, &remote);
    let mut events = favorites.subscribe();

    favorites.activate().await;

    assert_eq!(
        events.recv().await.unwrap(),
        SyncEvent::ModeChanged {
            mode: Mode::Authenticated
        }
    );
}

#[tokio::test]
async fn mutations_before_activation_are_ignored() {
    let storage = MemoryStorage::new();
    let remote = FakeRemote::with_members(&[]);
    let favorites = engine(&storage, &remote);

    assert_eq!(favorites.phase(), Phase::Idle);
    assert!(!favorites.add("A").await);
    assert!(!favorites.toggle("A").await);
    assert_eq!(favorites.count(), 0);
    assert_eq!(remote.mutate_calls(), 0);
    assert!(tab_store(&storage).load().is_empty());
}

#[tokio::test]
async fn dispose_while_loading_fails_activation() {
    let storage = MemoryStorage::new();
    tab_store(&storage).save(&ids(&["A"]));
    let remote = FakeRemote::with_members(&[]);
    remote.script_fetch(FetchOutcome::Hang);

    let favorites = engine(&storage, &remote);
    let activating = tokio::spawn({
        let favorites = favorites.clone();
        async move { favorites.activate().await }
    });
    wait_until(|| remote.fetch_calls() == 1).await;
    assert_eq!(favorites.phase(), Phase::Loading);

    favorites.dispose();

    assert_eq!(activating.await.unwrap(), Phase::Failed);
    assert_eq!(favorites.phase(), Phase::Failed);
    assert_eq!(favorites.count(), 0);
    assert!(!favorites.add("B").await);
}

#[tokio::test]
async fn dispose_after_activation_stops_mutations() {
    let storage = MemoryStorage::new();
    let remote = FakeRemote::with_members(&["A"]);

    let favorites = engine(&storage, &remote);
    favorites.activate().await;
    favorites.dispose();

    assert_eq!(favorites.phase(), Phase::Disposed);
    assert!(!favorites.add("B").await);
    assert!(favorites.remove("A").await);
    assert_eq!(remote.mutate_calls(), 0);
    assert!(!favorites.refresh().await);
}

#[tokio::test]
async fn dispose_cancels_in_flight_mutation() {
    let storage = MemoryStorage::new();
    let remote = FakeRemote::with_members(&[]);
    let favorites = engine(&storage, &remote);
    favorites.activate().await;
    remote.script_mutation(MutationOutcome::Hang);

    let adding = tokio::spawn({
        let favorites = favorites.clone();
        async move { favorites.add("A").await }
    });
    wait_until(|| favorites.is_pending("A")).await;
    favorites.dispose();

    adding.await.unwrap();
    assert!(!favorites.is_pending("A"));
    assert!(remote.applied().is_empty());
}
