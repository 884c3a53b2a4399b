// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use crate::retry::RetryPolicy;

/// Authentication method for the favorites API.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(tag = "type")]
pub enum AuthMethod {
    /// No authentication; the server will usually answer `401`.
    #[serde(rename = "none")]
    #[default]
    None,
    /// Bearer token authentication.
    #[serde(rename = "bearer")]
    Bearer {
        /// Bearer token.
        token: String,
    },
    /// Session cookie, as a browser would send it.
    #[serde(rename = "cookie")]
    Cookie {
        /// Raw `Cookie` header value, e.g. `session=abc123`.
        value: String,
    },
}

/// Remote favorites collection configuration.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the marketplace API.
    pub base_url: String,
    /// Path of the favorites collection (e.g., `/api/favorites`).
    #[serde(default = "default_collection_path")]
    pub collection_path: String,
    /// Authentication method.
    #[serde(default)]
    pub auth: AuthMethod,
    /// Hard ceiling for a single request, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Retry policy for mutations.
    #[serde(default)]
    pub retry: RetryPolicy,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl RemoteConfig {
    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_collection_path() -> String {
    "/api/favorites".to_string()
}

const fn default_timeout_ms() -> u64 {
    12_000
}

fn default_user_agent() -> String {
    concat!("favsync-remote/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            collection_path: default_collection_path(),
            auth: AuthMethod::default(),
            timeout_ms: default_timeout_ms(),
            retry: RetryPolicy::default(),
            user_agent: default_user_agent(),
        }
    }
}
