// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashSet;
use std::sync::Arc;

use favsync_remote::MemberId;
use serde_json::Value;

use crate::storage::{StorageMedium, StorageSubscription};

/// Default key of the anonymous favorites list.
pub const DEFAULT_STORAGE_KEY: &str = "favorites:v1";

/// Best-effort persistence of the anonymous favorites list.
///
/// Never fails: unreadable data loads as an empty list and failed writes
/// are logged and dropped.
#[derive(Debug, Clone)]
pub struct LocalStore {
    medium: Arc<dyn StorageMedium>,
    key: String,
}

impl LocalStore {
    /// Creates a store over `medium`, persisting under `key`.
    pub fn new(medium: Arc<dyn StorageMedium>, key: impl Into<String>) -> Self {
        Self {
            medium,
            key: key.into(),
        }
    }

    /// The storage key this store reads and writes.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Loads the stored ids, or an empty list on missing or corrupt data.
    #[must_use]
    pub fn load(&self) -> Vec<MemberId> {
        match self.medium.get_item(&self.key) {
            Ok(Some(raw)) => parse_member_list(&raw),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(key = %self.key, err = %e, "failed to read local favorites");
                Vec::new()
            }
        }
    }

    /// Persists `ids` as a JSON array, dropping duplicates.
    pub fn save(&self, ids: &[MemberId]) {
        let ids = dedupe(ids.iter().cloned());
        let raw = match serde_json::to_string(&ids) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(err = %e, "failed to serialize local favorites");
                return;
            }
        };

        if let Err(e) = self.medium.set_item(&self.key, &raw) {
            tracing::warn!(key = %self.key, err = %e, "failed to persist local favorites");
        }
    }

    /// Writes an empty list.
    pub fn clear(&self) {
        self.save(&[]);
    }

    /// Subscribes to writes of other tabs on the underlying medium.
    #[must_use]
    pub fn subscribe(&self) -> Option<StorageSubscription> {
        self.medium.subscribe()
    }
}

/// Parses a serialized favorites list.
///
/// Anything that is not a JSON array yields an empty list. String elements
/// are kept, numbers are converted to their string form, and everything
/// else is skipped.
#[must_use]
pub fn parse_member_list(raw: &str) -> Vec<MemberId> {
    let items = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items,
        Ok(_) => {
            tracing::warn!("local favorites are not a JSON array, ignoring");
            return Vec::new();
        }
        Err(e) => {
            tracing::warn!(err = %e, "local favorites are not valid JSON, ignoring");
            return Vec::new();
        }
    };

    dedupe(items.into_iter().filter_map(|item| match item {
        Value::String(s) if !s.is_empty() => Some(MemberId::new(s)),
        Value::Number(n) => Some(MemberId::new(n.to_string())),
        _ => None,
    }))
}

fn dedupe(ids: impl IntoIterator<Item = MemberId>) -> Vec<MemberId> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}
