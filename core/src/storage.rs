// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Key/value storage media with `localStorage` semantics.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use crate::lock;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Identifier of the tab (or window) that performed a write.
pub type TabId = u64;

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Reading or writing the medium failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),

    /// The write would exceed the medium's quota.
    #[error("storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded {
        /// Bytes the medium would hold after the write.
        needed: usize,
        /// Bytes the medium may hold.
        quota: usize,
    },
}

/// A change notification emitted when some tab writes a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    /// Key that changed.
    pub key: String,
    /// New serialized value, `None` if the key was removed.
    pub new_value: Option<String>,
    /// Tab that performed the write.
    pub origin: TabId,
}

/// Stream of changes made by other tabs.
#[derive(Debug)]
pub struct StorageSubscription {
    rx: broadcast::Receiver<StorageChange>,
    tab: TabId,
}

impl StorageSubscription {
    /// Waits for the next change made by another tab.
    ///
    /// Returns `None` once the medium is gone.
    pub async fn next(&mut self) -> Option<StorageChange> {
        loop {
            match self.rx.recv().await {
                Ok(change) if change.origin == self.tab => {}
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "storage subscription lagged, dropping changes");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// A synchronous key/value medium, modelled after browser `localStorage`.
pub trait StorageMedium: Send + Sync + fmt::Debug {
    /// Reads the value of `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Writes `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be written or is full.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be written.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// Subscribes to writes performed by other tabs, if the medium has any.
    fn subscribe(&self) -> Option<StorageSubscription> {
        None
    }
}

#[derive(Debug)]
struct MemoryInner {
    items: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
    changes: broadcast::Sender<StorageChange>,
    next_tab: AtomicU64,
}

/// In-process medium shared by several tabs of the same origin.
///
/// Writes through one [`TabStorage`] are observed by all the others.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    inner: Arc<MemoryInner>,
}

impl MemoryStorage {
    /// Creates an empty, unbounded medium.
    #[must_use]
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Creates an empty medium that holds at most `quota` bytes.
    #[must_use]
    pub fn with_quota(quota: usize) -> Self {
        Self::build(Some(quota))
    }

    fn build(quota: Option<usize>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(MemoryInner {
                items: Mutex::new(HashMap::new()),
                quota,
                changes,
                next_tab: AtomicU64::new(1),
            }),
        }
    }

    /// Opens a new tab on this medium.
    #[must_use]
    pub fn tab(&self) -> TabStorage {
        TabStorage {
            medium: self.clone(),
            id: self.inner.next_tab.fetch_add(1, Ordering::Relaxed),
        }
    }

    fn write(&self, origin: TabId, key: &str, value: Option<&str>) -> Result<(), StorageError> {
        {
            let mut items = lock(&self.inner.items);
            if let (Some(quota), Some(value)) = (self.inner.quota, value) {
                let needed = items
                    .iter()
                    .filter(|(k, _)| k.as_str() != key)
                    .map(|(k, v)| k.len() + v.len())
                    .sum::<usize>()
                    + key.len()
                    + value.len();
                if needed > quota {
                    return Err(StorageError::QuotaExceeded { needed, quota });
                }
            }

            match value {
                Some(value) => items.insert(key.to_string(), value.to_string()),
                None => items.remove(key),
            };
        }

        // no receivers is fine: nobody is listening yet
        let _ = self.inner.changes.send(StorageChange {
            key: key.to_string(),
            new_value: value.map(ToString::to_string),
            origin,
        });
        Ok(())
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

/// One tab's handle on a [`MemoryStorage`].
#[derive(Debug, Clone)]
pub struct TabStorage {
    medium: MemoryStorage,
    id: TabId,
}

impl TabStorage {
    /// Identifier of this tab.
    #[must_use]
    pub const fn id(&self) -> TabId {
        self.id
    }
}

impl StorageMedium for TabStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.medium.inner.items).get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.medium.write(self.id, key, Some(value))
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.medium.write(self.id, key, None)
    }

    fn subscribe(&self) -> Option<StorageSubscription> {
        Some(StorageSubscription {
            rx: self.medium.inner.changes.subscribe(),
            tab: self.id,
        })
    }
}

/// Directory-backed medium; each key is a JSON file.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Opens (and creates if missing) a storage directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        tracing::debug!(dir = %dir.display(), "opened file storage");
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", urlencoding::encode(key)))
    }
}

impl StorageMedium for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
