// SPDX-FileCopyrightText: 2025 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use favsync_remote::MemberId;

/// Which backing store is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Local storage only; other tabs are observed.
    Anonymous,

    /// The remote collection is authoritative.
    Authenticated,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Anonymous => write!(f, "anonymous"),
            Mode::Authenticated => write!(f, "authenticated"),
        }
    }
}

/// Lifecycle phase of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Constructed, not yet activated.
    Idle,

    /// Activation is fetching the remote collection.
    Loading,

    /// Serving queries and mutations in the given mode.
    Ready(Mode),

    /// Torn down before activation completed.
    Failed,

    /// Torn down after activation.
    Disposed,
}

impl Phase {
    /// The mode, if ready.
    pub fn mode(self) -> Option<Mode> {
        match self {
            Phase::Ready(mode) => Some(mode),
            _ => None,
        }
    }
}

/// Why the member set was replaced wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceSource {
    /// Another tab wrote the anonymous list.
    CrossTab,

    /// An authoritative refresh from the server.
    Refresh,
}

/// Side-channel notifications for the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// The operating mode changed.
    ModeChanged {
        /// The new mode.
        mode: Mode,
    },

    /// An optimistic mutation was rolled back.
    MutationFailed {
        /// The id whose mutation failed.
        id: MemberId,

        /// The membership the user asked for.
        desired: bool,

        /// Human-readable cause.
        reason: String,
    },

    /// The member set was replaced wholesale.
    MembersReplaced {
        /// Where the new members came from.
        source: ReplaceSource,
    },
}
