// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Folds other tabs' writes of the anonymous list into the engine.

use std::sync::Weak;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::engine::Shared;
use crate::storage::StorageSubscription;

/// Background listener owning a storage subscription.
///
/// The task stops when the engine is torn down, the engine is dropped, or
/// this handle is dropped.
#[derive(Debug)]
pub(crate) struct CrossTabNotifier {
    handle: JoinHandle<()>,
}

impl CrossTabNotifier {
    pub fn spawn(
        mut subscription: StorageSubscription,
        key: String,
        engine: Weak<Shared>,
        shutdown: CancellationToken,
    ) -> Self {
        let handle = tokio::spawn(async move {
            loop {
                let change = tokio::select! {
                    biased;
                    () = shutdown.cancelled() => break,
                    change = subscription.next() => change,
                };

                let Some(change) = change else {
                    tracing::debug!("storage medium closed, stopping cross-tab listener");
                    break;
                };
                if change.key != key {
                    continue;
                }

                let Some(engine) = engine.upgrade() else {
                    break;
                };
                engine.apply_cross_tab(change.origin, change.new_value.as_deref());
            }
        });
        Self { handle }
    }
}

impl Drop for CrossTabNotifier {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
