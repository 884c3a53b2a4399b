// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP client wrapper with authentication and status mapping.

use reqwest::{Client, RequestBuilder, Response, StatusCode};

use crate::config::{AuthMethod, RemoteConfig};
use crate::error::RemoteError;
use crate::response::MutationEnvelope;

const MAX_ERROR_PREVIEW_CHARS: usize = 256;

/// HTTP client for the favorites API.
#[derive(Debug)]
pub struct HttpClient {
    client: Client,
    auth: AuthMethod,
}

impl HttpClient {
    /// Creates a new HTTP client.
    ///
    /// The per-request ceiling is enforced by the caller, so no client-wide
    /// timeout is configured here.
    ///
    /// # Errors
    ///
    /// Returns an error if HTTP client creation fails.
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| RemoteError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            auth: config.auth.clone(),
        })
    }

    /// Builds a request with authentication headers.
    pub fn build_request(&self, method: reqwest::Method, url: &str) -> RequestBuilder {
        let req = self
            .client
            .request(method, url)
            .header("Accept", "application/json");

        match &self.auth {
            AuthMethod::Bearer { token } => req.bearer_auth(token),
            AuthMethod::Cookie { value } => req.header("Cookie", value),
            AuthMethod::None => req,
        }
    }

    /// Executes a request and maps error statuses.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Unauthorized`] for 401/403 and
    /// [`RemoteError::Status`] for any other non-success status.
    pub async fn execute(&self, req: RequestBuilder) -> Result<Response, RemoteError> {
        let resp = req.send().await?;

        match resp.status() {
            status if status.is_success() => Ok(resp),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(RemoteError::Unauthorized),
            status => {
                let text = resp
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read response".to_string());
                Err(RemoteError::Status {
                    status: status.as_u16(),
                    message: error_message(&text),
                })
            }
        }
    }
}

/// Prefers the `error` field of an envelope, falling back to a body preview.
fn error_message(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<MutationEnvelope>(body) {
        if let Some(error) = envelope.error {
            return error;
        }
    }

    let mut preview = body.chars().take(MAX_ERROR_PREVIEW_CHARS).collect::<String>();
    if body.chars().count() > MAX_ERROR_PREVIEW_CHARS {
        preview.push_str("...");
    }
    preview
}
