// SPDX-FileCopyrightText: 2025 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Optimistic favorites synchronization for anonymous and signed-in users.

mod config;
mod engine;
mod local;
mod member_set;
mod notifier;
mod storage;
mod types;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use crate::config::{APP_NAME, Config};
pub use crate::engine::Favorites;
pub use crate::local::{DEFAULT_STORAGE_KEY, LocalStore, parse_member_list};
pub use crate::member_set::MemberSet;
pub use crate::storage::{
    FileStorage, MemoryStorage, StorageChange, StorageError, StorageMedium, StorageSubscription,
    TabId, TabStorage,
};
pub use crate::types::{Mode, Phase, ReplaceSource, SyncEvent};
pub use favsync_remote::{MemberId, RemoteCollection, RemoteCollectionClient, RemoteError};

/// Locks `mutex`, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
