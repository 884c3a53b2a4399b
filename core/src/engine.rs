// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Reconciliation engine for the favorites list.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use favsync_remote::{MemberId, RemoteCollection, RemoteError};
use futures::future::join_all;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::local::{LocalStore, parse_member_list};
use crate::lock;
use crate::member_set::{MemberSet, OptimisticSnapshot};
use crate::notifier::CrossTabNotifier;
use crate::storage::TabId;
use crate::types::{Mode, Phase, ReplaceSource, SyncEvent};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Optimistic, eventually consistent favorites list.
///
/// Anonymous users keep their favorites in local storage, kept in step
/// across tabs. Authenticated users keep them on the server; mutations are
/// applied in memory first and rolled back if the server refuses them.
///
/// `Favorites` is a cheap handle: clones share the same state. The engine is
/// torn down by [`Favorites::dispose`] or when the last handle is dropped.
///
/// # Example
///
/// ```ignore
/// let favorites = Favorites::new(local, Arc::new(client));
/// favorites.activate().await;
/// if !favorites.toggle("sku-42").await {
///     println!("removed");
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Favorites {
    shared: Arc<Shared>,
}

#[derive(Debug)]
pub(crate) struct Shared {
    local: LocalStore,
    remote: Arc<dyn RemoteCollection>,
    state: Mutex<State>,
    pending: Mutex<HashMap<MemberId, PendingMutation>>,
    generation: AtomicU64,
    shutdown: CancellationToken,
    notifier: Mutex<Option<CrossTabNotifier>>,
    events: broadcast::Sender<SyncEvent>,
}

#[derive(Debug)]
struct State {
    phase: Phase,
    members: MemberSet,
}

/// The in-flight network operation of one id.
#[derive(Debug)]
struct PendingMutation {
    generation: u64,
    cancel: CancellationToken,
    /// Members before the oldest unconfirmed mutation of this id.
    baseline: OptimisticSnapshot,
}

impl Favorites {
    /// Creates an idle engine; call [`Favorites::activate`] before use.
    pub fn new(local: LocalStore, remote: Arc<dyn RemoteCollection>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                local,
                remote,
                state: Mutex::new(State {
                    phase: Phase::Idle,
                    members: MemberSet::new(),
                }),
                pending: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
                shutdown: CancellationToken::new(),
                notifier: Mutex::new(None),
                events,
            }),
        }
    }

    /// Loads the favorites and decides the operating mode.
    ///
    /// A successful remote fetch means the user is signed in: local favorites
    /// are merged into the server's and pushed upstream. Any failure falls
    /// back to the anonymous local list. Only runs once; later calls return
    /// the current phase.
    #[tracing::instrument(skip(self))]
    pub async fn activate(&self) -> Phase {
        {
            let mut state = lock(&self.shared.state);
            if state.phase != Phase::Idle {
                return state.phase;
            }
            state.phase = Phase::Loading;
        }

        self.start_notifier();

        let shutdown = &self.shared.shutdown;
        let fetched = tokio::select! {
            biased;
            () = shutdown.cancelled() => Err(RemoteError::Cancelled),
            result = self.shared.remote.fetch_all(shutdown) => result,
        };

        match fetched {
            Ok(server) => self.merge(server).await,
            Err(RemoteError::Cancelled) => {
                tracing::debug!("activation cancelled");
                self.shared.fail_loading();
            }
            Err(RemoteError::Unauthorized) => {
                tracing::debug!("not signed in, using local favorites");
                self.shared.enter_anonymous();
            }
            Err(e) => {
                tracing::warn!(err = %e, "remote favorites unavailable, falling back to local");
                self.shared.enter_anonymous();
            }
        }

        self.phase()
    }

    fn start_notifier(&self) {
        let Some(subscription) = self.shared.local.subscribe() else {
            return;
        };
        let notifier = CrossTabNotifier::spawn(
            subscription,
            self.shared.local.key().to_string(),
            Arc::downgrade(&self.shared),
            self.shared.shutdown.child_token(),
        );
        *lock(&self.shared.notifier) = Some(notifier);
    }

    async fn merge(&self, server: Vec<MemberId>) {
        let server: MemberSet = server.into_iter().collect();
        let local: MemberSet = self.shared.local.load().into_iter().collect();
        let to_push = local.difference(&server);

        let merged = {
            let mut state = lock(&self.shared.state);
            if state.phase != Phase::Loading {
                return;
            }
            state.members = server.union(&local);
            state.phase = Phase::Ready(Mode::Authenticated);
            OptimisticSnapshot::capture(&state.members)
        };
        self.shared.local.clear();
        self.shared.emit(SyncEvent::ModeChanged {
            mode: Mode::Authenticated,
        });

        if to_push.is_empty() {
            return;
        }

        tracing::info!(count = to_push.len(), "pushing local favorites to server");
        let pushes = to_push.iter().map(|id| {
            let baseline = merged.clone();
            async move {
                let (generation, cancel, _) = self.shared.begin_pending(id, baseline);
                let result = self.shared.remote.mutate(id, true, &cancel).await;
                self.shared.finish_pending(id, generation);
                (id, result)
            }
        });
        for (id, result) in join_all(pushes).await {
            match result {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => tracing::debug!(%id, "merge push superseded"),
                Err(e) => tracing::warn!(%id, err = %e, "failed to push local favorite, dropping"),
            }
        }
    }

    /// Returns `true` if `id` is a favorite.
    pub fn is_member(&self, id: &str) -> bool {
        lock(&self.shared.state).members.contains(id)
    }

    /// Number of favorites.
    pub fn count(&self) -> usize {
        lock(&self.shared.state).members.len()
    }

    /// Favorites in display order.
    pub fn members(&self) -> Vec<MemberId> {
        lock(&self.shared.state).members.to_vec()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        lock(&self.shared.state).phase
    }

    /// Current mode, if ready.
    pub fn mode(&self) -> Option<Mode> {
        self.phase().mode()
    }

    /// Returns `true` while a network mutation of `id` is in flight.
    pub fn is_pending(&self, id: &str) -> bool {
        lock(&self.shared.pending).contains_key(id)
    }

    /// Subscribes to mode changes, rollbacks and wholesale replacements.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.shared.events.subscribe()
    }

    /// Makes `id` a favorite, returning the resulting membership.
    pub async fn add(&self, id: impl Into<MemberId>) -> bool {
        self.set_membership(id.into(), true).await
    }

    /// Removes `id` from the favorites, returning the resulting membership.
    pub async fn remove(&self, id: impl Into<MemberId>) -> bool {
        self.set_membership(id.into(), false).await
    }

    /// Removes `id` if it is a favorite, adds it otherwise.
    pub async fn toggle(&self, id: impl Into<MemberId>) -> bool {
        let id = id.into();
        if self.is_member(&id) {
            self.remove(id).await
        } else {
            self.add(id).await
        }
    }

    #[tracing::instrument(skip(self, id), fields(id = %id))]
    async fn set_membership(&self, id: MemberId, desired: bool) -> bool {
        let snapshot = {
            let mut state = lock(&self.shared.state);
            let Phase::Ready(mode) = state.phase else {
                tracing::debug!(phase = ?state.phase, "engine not ready, ignoring mutation");
                return state.members.contains(&id);
            };
            if state.members.contains(&id) == desired {
                return desired;
            }

            let snapshot = OptimisticSnapshot::capture(&state.members);
            if desired {
                state.members.insert(id.clone());
            } else {
                state.members.remove(&id);
            }

            if mode == Mode::Anonymous {
                self.shared.local.save(&state.members.to_vec());
                drop(state);
                self.shared.cancel_pending(&id);
                return desired;
            }
            snapshot
        };

        let (generation, cancel, snapshot) = self.shared.begin_pending(&id, snapshot);
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(RemoteError::Cancelled),
            result = self.shared.remote.mutate(&id, desired, &cancel) => result,
        };
        let latest = self.shared.finish_pending(&id, generation);

        match result {
            Err(e) if e.is_cancelled() => {
                tracing::debug!("mutation superseded");
                self.is_member(&id)
            }
            _ if !latest => self.is_member(&id),
            Ok(()) => {
                tracing::debug!("mutation confirmed");
                desired
            }
            Err(e) => self.shared.rollback(&id, desired, &snapshot, &e),
        }
    }

    /// Re-reads the server's list, replacing the local view outright.
    ///
    /// Does nothing unless signed in. Returns `true` if the list was
    /// replaced.
    #[tracing::instrument(skip(self))]
    pub async fn refresh(&self) -> bool {
        if self.phase() != Phase::Ready(Mode::Authenticated) {
            return false;
        }

        let shutdown = &self.shared.shutdown;
        let fetched = tokio::select! {
            biased;
            () = shutdown.cancelled() => Err(RemoteError::Cancelled),
            result = self.shared.remote.fetch_all(shutdown) => result,
        };

        match fetched {
            Ok(ids) => {
                {
                    let mut state = lock(&self.shared.state);
                    if state.phase != Phase::Ready(Mode::Authenticated) {
                        return false;
                    }
                    state.members = ids.into_iter().collect();
                }
                self.shared.emit(SyncEvent::MembersReplaced {
                    source: ReplaceSource::Refresh,
                });
                true
            }
            Err(RemoteError::Cancelled) => false,
            Err(RemoteError::Unauthorized) => {
                tracing::info!("session expired, switching to local favorites");
                let members = self.shared.local.load().into_iter().collect();
                if self.shared.demote(Some(members)) {
                    self.shared.emit(SyncEvent::ModeChanged {
                        mode: Mode::Anonymous,
                    });
                }
                false
            }
            Err(e) => {
                tracing::warn!(err = %e, "failed to refresh favorites");
                false
            }
        }
    }

    /// Tears the engine down, aborting all in-flight network operations.
    pub fn dispose(&self) {
        self.shared.shutdown.cancel();
        lock(&self.shared.notifier).take();

        let mut state = lock(&self.shared.state);
        state.phase = match state.phase {
            Phase::Loading | Phase::Failed => Phase::Failed,
            Phase::Idle | Phase::Ready(_) | Phase::Disposed => Phase::Disposed,
        };
        tracing::debug!(phase = ?state.phase, "favorites engine disposed");
    }
}

impl Shared {
    fn emit(&self, event: SyncEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    fn enter_anonymous(&self) {
        let members = self.local.load().into_iter().collect();
        {
            let mut state = lock(&self.state);
            if state.phase != Phase::Loading {
                return;
            }
            state.members = members;
            state.phase = Phase::Ready(Mode::Anonymous);
        }
        self.emit(SyncEvent::ModeChanged {
            mode: Mode::Anonymous,
        });
    }

    fn fail_loading(&self) {
        let mut state = lock(&self.state);
        if state.phase == Phase::Loading {
            state.phase = Phase::Failed;
        }
    }

    /// Switches an authenticated engine to anonymous mode, cancelling every
    /// in-flight mutation.
    ///
    /// Returns `false` if the engine was not authenticated.
    fn demote(&self, members: Option<MemberSet>) -> bool {
        {
            let mut state = lock(&self.state);
            if state.phase != Phase::Ready(Mode::Authenticated) {
                return false;
            }
            state.phase = Phase::Ready(Mode::Anonymous);
            if let Some(members) = members {
                state.members = members;
            }
        }

        let drained: Vec<_> = lock(&self.pending).drain().collect();
        for (id, pending) in drained {
            tracing::debug!(%id, "cancelling mutation of signed-out session");
            pending.cancel.cancel();
        }
        true
    }

    /// Registers a new in-flight mutation of `id`, cancelling the previous one.
    ///
    /// Returns the snapshot to roll back to. A superseding mutation inherits
    /// the baseline of the one it replaces, since that one never confirmed.
    fn begin_pending(
        &self,
        id: &MemberId,
        snapshot: OptimisticSnapshot,
    ) -> (u64, CancellationToken, OptimisticSnapshot) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let cancel = self.shutdown.child_token();

        let mut pending = lock(&self.pending);
        let baseline = match pending.remove(id) {
            Some(previous) => {
                tracing::debug!(%id, "superseding pending mutation");
                previous.cancel.cancel();
                previous.baseline
            }
            None => snapshot,
        };
        pending.insert(
            id.clone(),
            PendingMutation {
                generation,
                cancel: cancel.clone(),
                baseline: baseline.clone(),
            },
        );
        (generation, cancel, baseline)
    }

    /// Cancels the in-flight mutation of `id`, if any.
    fn cancel_pending(&self, id: &MemberId) {
        if let Some(previous) = lock(&self.pending).remove(id) {
            tracing::debug!(%id, "superseding pending mutation");
            previous.cancel.cancel();
        }
    }

    /// Clears the pending entry if `generation` still owns it.
    fn finish_pending(&self, id: &MemberId, generation: u64) -> bool {
        let mut pending = lock(&self.pending);
        match pending.get(id) {
            Some(p) if p.generation == generation => {
                pending.remove(id);
                true
            }
            _ => false,
        }
    }

    fn rollback(
        &self,
        id: &MemberId,
        desired: bool,
        snapshot: &OptimisticSnapshot,
        err: &RemoteError,
    ) -> bool {
        tracing::warn!(%id, desired, err = %err, "mutation failed, rolling back");
        let restored = {
            let mut state = lock(&self.state);
            snapshot.restore(&mut state.members, id);
            state.members.contains(id)
        };

        self.emit(SyncEvent::MutationFailed {
            id: id.clone(),
            desired,
            reason: err.to_string(),
        });

        if matches!(err, RemoteError::Unauthorized) && self.demote(None) {
            tracing::info!("session expired, switching to local favorites");
            self.emit(SyncEvent::ModeChanged {
                mode: Mode::Anonymous,
            });
        }
        restored
    }

    /// Replaces the members with another tab's write, if anonymous.
    pub(crate) fn apply_cross_tab(&self, origin: TabId, value: Option<&str>) {
        let members: MemberSet = value
            .map(parse_member_list)
            .unwrap_or_default()
            .into_iter()
            .collect();
        {
            let mut state = lock(&self.state);
            if state.phase != Phase::Ready(Mode::Anonymous) {
                tracing::debug!(origin, phase = ?state.phase, "ignoring cross-tab change");
                return;
            }
            if state.members == members {
                return;
            }
            state.members = members;
        }
        tracing::debug!(origin, "applied cross-tab change");
        self.emit(SyncEvent::MembersReplaced {
            source: ReplaceSource::CrossTab,
        });
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
