// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use favsync_core::{MemoryStorage, Mode, ReplaceSource, SyncEvent};

use crate::common::{FakeRemote, FetchOutcome, engine, ids, tab_store};

#[tokio::test]
async fn refresh_replaces_members_with_server_list() {
    let storage = MemoryStorage::new();
    let remote = FakeRemote::with_members(&["A"]);
    let favorites = engine(&storage, &remote);
    favorites.activate().await;
    let mut events = favorites.subscribe();

    remote.set_server(&["C", "B"]);

    assert!(favorites.refresh().await);
    assert_eq!(favorites.members(), ids(&["C", "B"]));
    assert_eq!(
        events.recv().await.unwrap(),
        SyncEvent::MembersReplaced {
            source: ReplaceSource::Refresh
        }
    );
}

#[tokio::test]
async fn refresh_is_noop_when_anonymous() {
    let storage = MemoryStorage::new();
    let remote = FakeRemote::with_members(&["A"]);
    remote.script_fetch(FetchOutcome::Unauthorized);
    let favorites = engine(&storage, &remote);
    favorites.activate().await;

    assert!(!favorites.refresh().await);
    assert_eq!(remote.fetch_calls(), 1);
    assert_eq!(favorites.count(), 0);
}

#[tokio::test]
async fn refresh_failure_keeps_members() {
    let storage = MemoryStorage::new();
    let remote = FakeRemote::with_members(&["A", "B"]);
    let favorites = engine(&storage, &remote);
    favorites.activate().await;
    remote.script_fetch(FetchOutcome::Status(502));

    assert!(!favorites.refresh().await);
    assert_eq!(favorites.members(), ids(&["A", "B"]));
    assert_eq!(favorites.mode(), Some(Mode::Authenticated));
}

#[tokio::test]
async fn expired_session_on_refresh_reloads_local_list() {
    let storage = MemoryStorage::new();
    let remote = FakeRemote::with_members(&["A"]);
    let favorites = engine(&storage, &remote);
    favorites.activate().await;

    // another tab, still anonymous, saved a list after the login merge
    tab_store(&storage).save(&ids(&["L"]));
    remote.script_fetch(FetchOutcome::Unauthorized);
    let mut events = favorites.subscribe();

    assert!(!favorites.refresh().await);
    assert_eq!(favorites.mode(), Some(Mode::Anonymous));
    assert_eq!(favorites.members(), ids(&["L"]));
    assert_eq!(
        events.recv().await.unwrap(),
        SyncEvent::ModeChanged {
            mode: Mode::Anonymous
        }
    );
}
