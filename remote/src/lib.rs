// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Client for the remote favorites collection of the marketplace API.

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    clippy::dbg_macro,
    clippy::indexing_slicing,
    clippy::pedantic
)]
// Allow certain clippy lints that are too restrictive for this crate
#![allow(clippy::module_name_repetitions, clippy::single_match_else)]

mod client;
mod collection;
mod config;
mod error;
mod http;
mod response;
mod retry;
mod types;

pub use crate::client::RemoteCollectionClient;
pub use crate::collection::RemoteCollection;
pub use crate::config::{AuthMethod, RemoteConfig};
pub use crate::error::{RemoteError, RetryClass};
pub use crate::response::{CollectionItem, MutationEnvelope, normalize_collection};
pub use crate::retry::{RetryPolicy, backoff_delay, retry, with_timeout};
pub use crate::types::MemberId;

/// Re-exported so callers can build tokens without naming `tokio-util` directly.
pub use tokio_util::sync::CancellationToken;
