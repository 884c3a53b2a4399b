// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Tests for anonymous tabs observing each other's writes.

use favsync_core::{
    DEFAULT_STORAGE_KEY, Favorites, MemoryStorage, Mode, Phase, ReplaceSource, StorageMedium,
    SyncEvent,
};
use tokio::sync::broadcast::error::TryRecvError;

use crate::common::{FakeRemote, FetchOutcome, engine, ids, tab_store, wait_until};

async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

async fn anonymous_tab(storage: &MemoryStorage) -> Favorites {
    let remote = FakeRemote::with_members(&[]);
    remote.script_fetch(FetchOutcome::Unauthorized);
    let favorites = engine(storage, &remote);
    assert_eq!(favorites.activate().await, Phase::Ready(Mode::Anonymous));
    favorites
}

#[tokio::test]
async fn anonymous_tabs_converge() {
    let storage = MemoryStorage::new();
    let first = anonymous_tab(&storage).await;
    let second = anonymous_tab(&storage).await;
    let mut events = second.subscribe();

    assert!(first.add("A").await);
    wait_until(|| second.is_member("A")).await;
    assert_eq!(
        events.recv().await.unwrap(),
        SyncEvent::MembersReplaced {
            source: ReplaceSource::CrossTab
        }
    );

    assert!(second.add("B").await);
    wait_until(|| first.is_member("B")).await;
    assert_eq!(first.members(), ids(&["A", "B"]));
    assert_eq!(second.members(), ids(&["A", "B"]));
}

#[tokio::test]
async fn own_writes_are_not_echoed() {
    let storage = MemoryStorage::new();
    let favorites = anonymous_tab(&storage).await;
    let mut events = favorites.subscribe();

    assert!(favorites.add("A").await);
    settle().await;

    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    assert_eq!(favorites.members(), ids(&["A"]));
}

#[tokio::test]
async fn authenticated_engine_ignores_other_tabs() {
    let storage = MemoryStorage::new();
    let remote = FakeRemote::with_members(&["S"]);
    let signed_in = engine(&storage, &remote);
    assert_eq!(
        signed_in.activate().await,
        Phase::Ready(Mode::Authenticated)
    );
    let anonymous = anonymous_tab(&storage).await;

    assert!(anonymous.add("X").await);
    settle().await;

    assert!(!signed_in.is_member("X"));
    assert_eq!(signed_in.members(), ids(&["S"]));
}

#[tokio::test]
async fn corrupt_write_from_other_tab_empties_the_list() {
    let storage = MemoryStorage::new();
    tab_store(&storage).save(&ids(&["A"]));
    let favorites = anonymous_tab(&storage).await;
    assert!(favorites.is_member("A"));

    storage.tab().set_item(DEFAULT_STORAGE_KEY, "{not json").unwrap();

    wait_until(|| favorites.count() == 0).await;
}

#[tokio::test]
async fn removal_of_the_key_empties_the_list() {
    let storage = MemoryStorage::new();
    tab_store(&storage).save(&ids(&["A", "B"]));
    let favorites = anonymous_tab(&storage).await;

    storage.tab().remove_item(DEFAULT_STORAGE_KEY).unwrap();

    wait_until(|| favorites.count() == 0).await;
}

#[tokio::test]
async fn writes_to_other_keys_are_ignored() {
    let storage = MemoryStorage::new();
    let favorites = anonymous_tab(&storage).await;

    storage.tab().set_item("cart:v1", r#"["Z"]"#).unwrap();
    settle().await;

    assert_eq!(favorites.count(), 0);
}

#[tokio::test]
async fn disposed_engine_stops_listening() {
    let storage = MemoryStorage::new();
    let favorites = anonymous_tab(&storage).await;
    favorites.dispose();

    storage.tab().set_item(DEFAULT_STORAGE_KEY, r#"["A"]"#).unwrap();
    settle().await;

    assert!(!favorites.is_member("A"));
    assert_eq!(favorites.phase(), Phase::Disposed);
}
