// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// Retry policy class for remote failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Worth another attempt after a backoff delay.
    Retryable,
    /// Will fail the same way again.
    Permanent,
    /// The session is gone; the caller should fall back to anonymous mode.
    ReauthRequired,
    /// The caller gave up on the request; never retried, never reported.
    Cancelled,
}

/// Remote collection client errors.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// Transport-level error (connect, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status other than unauthorized.
    #[error("Server responded {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Server-provided error message or a body preview.
        message: String,
    },

    /// The server refused the credentials (401/403).
    #[error("Unauthorized")]
    Unauthorized,

    /// A single attempt exceeded the configured ceiling.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Superseded by a newer request or torn down by the owner.
    #[error("Request cancelled")]
    Cancelled,

    /// The server accepted the request but reported an error envelope.
    #[error("Rejected by server: {0}")]
    Rejected(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RemoteError {
    /// Http status if the server answered at all.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Unauthorized => Some(401),
            _ => None,
        }
    }

    /// Classify error for retry policy.
    #[must_use]
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Http(e) if is_transient_transport_error(e) => RetryClass::Retryable,
            Self::Http(_) => RetryClass::Permanent,
            Self::Timeout(_) => RetryClass::Retryable,
            Self::Status { status, .. } => match *status {
                408 | 429 | 500..=599 => RetryClass::Retryable,
                _ => RetryClass::Permanent,
            },
            Self::Unauthorized => RetryClass::ReauthRequired,
            Self::Cancelled => RetryClass::Cancelled,
            Self::Rejected(_) | Self::Config(_) => RetryClass::Permanent,
        }
    }

    /// Shorthand for `retry_class() == RetryClass::Retryable`.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.retry_class() == RetryClass::Retryable
    }

    /// Shorthand for a cancelled request.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Builder, redirect and decode failures will not go away on their own.
fn is_transient_transport_error(err: &reqwest::Error) -> bool {
    !err.is_builder() && (err.is_timeout() || err.is_connect() || err.is_request() || err.is_body())
}
