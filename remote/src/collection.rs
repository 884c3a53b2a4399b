// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::RemoteError;
use crate::types::MemberId;

/// Remote source of truth for an authenticated user's favorites.
///
/// Implementations must resolve promptly once `cancel` fires, returning
/// [`RemoteError::Cancelled`].
#[async_trait]
pub trait RemoteCollection: Send + Sync + fmt::Debug {
    /// Fetches the whole collection as a duplicate-free id list.
    async fn fetch_all(&self, cancel: &CancellationToken) -> Result<Vec<MemberId>, RemoteError>;

    /// Adds (`present = true`) or removes an id on the server.
    async fn mutate(
        &self,
        id: &MemberId,
        present: bool,
        cancel: &CancellationToken,
    ) -> Result<(), RemoteError>;
}
