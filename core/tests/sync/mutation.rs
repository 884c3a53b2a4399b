// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Tests for optimistic mutations, rollback and supersession.

use std::sync::Arc;

use favsync_core::{Favorites, MemberId, MemoryStorage, Mode, Phase, SyncEvent};
use tokio::sync::Notify;
use tokio::sync::broadcast::error::TryRecvError;

use crate::common::{FakeRemote, FetchOutcome, MutationOutcome, ids, tab_store, wait_until};

async fn signed_in(server: &[&str]) -> (Favorites, Arc<FakeRemote>, MemoryStorage) {
    let storage = MemoryStorage::new();
    let remote = FakeRemote::with_members(server);
    let favorites = Favorites::new(tab_store(&storage), remote.clone());
    assert_eq!(
        favorites.activate().await,
        Phase::Ready(Mode::Authenticated)
    );
    (favorites, remote, storage)
}

async fn anonymous(local: &[&str]) -> (Favorites, Arc<FakeRemote>, MemoryStorage) {
    let storage = MemoryStorage::new();
    tab_store(&storage).save(&ids(local));
    let remote = FakeRemote::with_members(&[]);
    remote.script_fetch(FetchOutcome::Unauthorized);
    let favorites = Favorites::new(tab_store(&storage), remote.clone());
    assert_eq!(favorites.activate().await, Phase::Ready(Mode::Anonymous));
    (favorites, remote, storage)
}

#[tokio::test]
async fn add_is_visible_before_server_confirms() {
    let (favorites, remote, _storage) = signed_in(&[]).await;
    let gate = Arc::new(Notify::new());
    remote.script_mutation(MutationOutcome::Gated(
        gate.clone(),
        Box::new(MutationOutcome::Accept),
    ));

    let adding = tokio::spawn({
        let favorites = favorites.clone();
        async move { favorites.add("A").await }
    });
    wait_until(|| favorites.is_pending("A")).await;
    assert!(favorites.is_member("A"));
    assert_eq!(favorites.count(), 1);

    gate.notify_one();

    assert!(adding.await.unwrap());
    assert!(favorites.is_member("A"));
    assert!(!favorites.is_pending("A"));
    assert_eq!(remote.server(), vec!["A".to_string()]);
}

#[tokio::test]
async fn redundant_mutations_do_not_reach_the_server() {
    let (favorites, remote, _storage) = signed_in(&["A"]).await;

    assert!(favorites.add("A").await);
    assert!(!favorites.remove("B").await);

    assert_eq!(remote.mutate_calls(), 0);
    assert_eq!(favorites.members(), ids(&["A"]));
}

#[tokio::test]
async fn failed_add_rolls_back_and_notifies() {
    let (favorites, remote, _storage) = signed_in(&[]).await;
    remote.script_mutation(MutationOutcome::Status(500));
    let mut events = favorites.subscribe();

    assert!(!favorites.add("A").await);

    assert!(!favorites.is_member("A"));
    assert!(!favorites.is_pending("A"));
    match events.recv().await.unwrap() {
        SyncEvent::MutationFailed { id, desired, .. } => {
            assert_eq!(id, MemberId::from("A"));
            assert!(desired);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(favorites.mode(), Some(Mode::Authenticated));
}

#[tokio::test]
async fn failed_remove_restores_original_position() {
    let (favorites, remote, _storage) = signed_in(&["A", "B", "C"]).await;
    remote.script_mutation(MutationOutcome::Rejected("collection is locked"));
    let mut events = favorites.subscribe();

    assert!(favorites.remove("B").await);

    assert_eq!(favorites.members(), ids(&["A", "B", "C"]));
    match events.recv().await.unwrap() {
        SyncEvent::MutationFailed { reason, .. } => {
            assert!(reason.contains("collection is locked"), "{reason}");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn rollback_keeps_other_ids_mutated_meanwhile() {
    let (favorites, remote, _storage) = signed_in(&[]).await;
    let gate = Arc::new(Notify::new());
    remote.script_mutation(MutationOutcome::Gated(
        gate.clone(),
        Box::new(MutationOutcome::Status(500)),
    ));

    let adding = tokio::spawn({
        let favorites = favorites.clone();
        async move { favorites.add("A").await }
    });
    wait_until(|| favorites.is_pending("A")).await;

    assert!(favorites.add("B").await);
    gate.notify_one();

    assert!(!adding.await.unwrap());
    assert_eq!(favorites.members(), ids(&["B"]));
    assert_eq!(remote.applied(), vec![("B".to_string(), true)]);
}

#[tokio::test]
async fn add_then_remove_ends_absent() {
    let (favorites, remote, _storage) = signed_in(&[]).await;
    remote.script_mutation(MutationOutcome::Hang);

    let (added, removed) = tokio::join!(favorites.add("A"), favorites.remove("A"));

    assert!(!added);
    assert!(!removed);
    assert!(!favorites.is_member("A"));
    assert!(!favorites.is_pending("A"));
    assert_eq!(remote.mutate_calls(), 2);
    assert_eq!(remote.applied(), vec![("A".to_string(), false)]);
}

#[tokio::test]
async fn last_mutation_wins() {
    let (favorites, remote, _storage) = signed_in(&[]).await;
    remote.script_mutation(MutationOutcome::Hang);
    remote.script_mutation(MutationOutcome::Hang);

    let (first, second, third) = tokio::join!(
        favorites.add("A"),
        favorites.remove("A"),
        favorites.add("A"),
    );

    assert!(first);
    assert!(second);
    assert!(third);
    assert!(favorites.is_member("A"));
    assert!(!favorites.is_pending("A"));
    assert_eq!(remote.mutate_calls(), 3);
    assert_eq!(remote.applied(), vec![("A".to_string(), true)]);
}

#[tokio::test]
async fn failed_superseding_mutation_restores_last_confirmed_state() {
    let (favorites, remote, _storage) = signed_in(&[]).await;
    let gate = Arc::new(Notify::new());
    remote.script_mutation(MutationOutcome::Gated(
        gate.clone(),
        Box::new(MutationOutcome::Accept),
    ));
    remote.script_mutation(MutationOutcome::Status(500));
    let mut events = favorites.subscribe();

    let adding = tokio::spawn({
        let favorites = favorites.clone();
        async move { favorites.add("A").await }
    });
    wait_until(|| favorites.is_pending("A")).await;

    // the add never confirmed, so the failed removal rolls back past it
    assert!(!favorites.remove("A").await);
    assert!(!adding.await.unwrap());

    assert!(!favorites.is_member("A"));
    assert!(!favorites.is_pending("A"));
    assert!(remote.server().is_empty());
    assert!(matches!(
        events.recv().await.unwrap(),
        SyncEvent::MutationFailed { desired: false, .. }
    ));
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn unauthorized_mutation_demotes_to_anonymous() {
    let (favorites, remote, storage) = signed_in(&["A"]).await;
    remote.script_mutation(MutationOutcome::Unauthorized);
    let mut events = favorites.subscribe();

    assert!(!favorites.add("B").await);

    assert_eq!(favorites.mode(), Some(Mode::Anonymous));
    assert_eq!(favorites.members(), ids(&["A"]));
    assert!(matches!(
        events.recv().await.unwrap(),
        SyncEvent::MutationFailed { desired: true, .. }
    ));
    assert_eq!(
        events.recv().await.unwrap(),
        SyncEvent::ModeChanged {
            mode: Mode::Anonymous
        }
    );

    assert!(favorites.add("C").await);
    assert_eq!(remote.mutate_calls(), 1);
    assert_eq!(tab_store(&storage).load(), ids(&["A", "C"]));
}

#[tokio::test]
async fn sign_out_cancels_other_pending_mutations() {
    let (favorites, remote, storage) = signed_in(&[]).await;
    let gate = Arc::new(Notify::new());
    remote.script_mutation(MutationOutcome::Gated(
        gate.clone(),
        Box::new(MutationOutcome::Status(500)),
    ));
    remote.script_mutation(MutationOutcome::Unauthorized);
    let mut events = favorites.subscribe();

    let adding = tokio::spawn({
        let favorites = favorites.clone();
        async move { favorites.add("A").await }
    });
    wait_until(|| favorites.is_pending("A")).await;

    assert!(!favorites.add("B").await);
    assert_eq!(favorites.mode(), Some(Mode::Anonymous));
    assert!(!favorites.is_pending("A"));

    assert!(!favorites.remove("A").await);
    assert!(favorites.add("A").await);
    gate.notify_one();
    assert!(adding.await.unwrap());

    assert!(favorites.is_member("A"));
    assert_eq!(tab_store(&storage).load(), ids(&["A"]));
    assert!(matches!(
        events.recv().await.unwrap(),
        SyncEvent::MutationFailed { desired: true, .. }
    ));
    assert_eq!(
        events.recv().await.unwrap(),
        SyncEvent::ModeChanged {
            mode: Mode::Anonymous
        }
    );
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    assert_eq!(remote.mutate_calls(), 2);
}

#[tokio::test]
async fn anonymous_mutations_persist_locally() {
    let (favorites, remote, storage) = anonymous(&["X"]).await;

    assert!(favorites.add("A").await);
    assert!(favorites.add("B").await);
    assert!(!favorites.remove("X").await);

    assert_eq!(favorites.members(), ids(&["A", "B"]));
    assert_eq!(tab_store(&storage).load(), ids(&["A", "B"]));
    assert_eq!(remote.mutate_calls(), 0);
    assert!(!favorites.is_pending("A"));
}

#[tokio::test]
async fn toggle_flips_membership() {
    let (favorites, remote, _storage) = signed_in(&[]).await;

    assert!(favorites.toggle("A").await);
    assert!(!favorites.toggle("A").await);

    assert_eq!(
        remote.applied(),
        vec![("A".to_string(), true), ("A".to_string(), false)]
    );
}

#[tokio::test]
async fn user_removal_supersedes_merge_push() {
    let storage = MemoryStorage::new();
    tab_store(&storage).save(&ids(&["A"]));
    let remote = FakeRemote::with_members(&[]);
    remote.script_mutation(MutationOutcome::Hang);
    let favorites = Favorites::new(tab_store(&storage), remote.clone());

    let activating = tokio::spawn({
        let favorites = favorites.clone();
        async move { favorites.activate().await }
    });
    wait_until(|| favorites.is_pending("A")).await;
    assert_eq!(favorites.phase(), Phase::Ready(Mode::Authenticated));

    assert!(!favorites.remove("A").await);

    assert_eq!(
        activating.await.unwrap(),
        Phase::Ready(Mode::Authenticated)
    );
    assert!(!favorites.is_member("A"));
    assert_eq!(remote.applied(), vec![("A".to_string(), false)]);
}
