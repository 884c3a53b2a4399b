// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Remote favorites collection client.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::collection::RemoteCollection;
use crate::config::RemoteConfig;
use crate::error::RemoteError;
use crate::http::HttpClient;
use crate::response::{MutationEnvelope, normalize_collection};
use crate::retry::{retry, with_timeout};
use crate::types::MemberId;

/// Client for the favorites collection of the marketplace API.
///
/// # Example
///
/// ```ignore
/// use favsync_remote::{AuthMethod, CancellationToken, RemoteCollection, RemoteCollectionClient, RemoteConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = RemoteConfig {
///     base_url: "https://shop.example.com".to_string(),
///     auth: AuthMethod::Bearer {
///         token: "secret".to_string(),
///     },
///     ..Default::default()
/// };
///
/// let client = RemoteCollectionClient::new(config)?;
/// let ids = client.fetch_all(&CancellationToken::new()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RemoteCollectionClient {
    http: Arc<HttpClient>,
    config: RemoteConfig,
}

impl RemoteCollectionClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is empty or HTTP client
    /// initialization fails.
    pub fn new(config: RemoteConfig) -> Result<Self, RemoteError> {
        if config.base_url.trim().is_empty() {
            return Err(RemoteError::Config("base_url must not be empty".to_string()));
        }

        let http = HttpClient::new(&config)?;
        Ok(Self {
            http: Arc::new(http),
            config,
        })
    }

    /// Returns the configuration of this client.
    #[must_use]
    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    fn collection_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let path = self.config.collection_path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    async fn fetch_once(&self) -> Result<Vec<MemberId>, RemoteError> {
        let url = self.collection_url();
        let resp = self
            .http
            .execute(self.http.build_request(Method::GET, &url))
            .await?;

        let body = resp.text().await?;
        match serde_json::from_str::<Value>(&body) {
            Ok(doc) => Ok(normalize_collection(&doc)),
            Err(e) => {
                tracing::warn!(err = %e, "collection response is not JSON, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    async fn mutate_once(&self, id: &MemberId, present: bool) -> Result<(), RemoteError> {
        let url = self.collection_url();
        let method = if present { Method::POST } else { Method::DELETE };
        let resp = self
            .http
            .execute(
                self.http
                    .build_request(method, &url)
                    .json(&serde_json::json!({ "memberId": id })),
            )
            .await?;

        let body = resp.text().await?;
        if body.trim().is_empty() {
            return Ok(());
        }

        match serde_json::from_str::<MutationEnvelope>(&body) {
            Ok(envelope) => match envelope.failure() {
                Some(error) => Err(RemoteError::Rejected(error)),
                None => Ok(()),
            },
            Err(_) => {
                tracing::debug!(%id, "mutation response has no envelope, accepting status");
                Ok(())
            }
        }
    }
}

#[async_trait]
impl RemoteCollection for RemoteCollectionClient {
    #[tracing::instrument(skip(self, cancel))]
    async fn fetch_all(&self, cancel: &CancellationToken) -> Result<Vec<MemberId>, RemoteError> {
        let ids = with_timeout(self.config.timeout(), cancel, self.fetch_once()).await?;
        tracing::debug!(count = ids.len(), "fetched favorites collection");
        Ok(ids)
    }

    #[tracing::instrument(skip(self, id, cancel), fields(id = %id))]
    async fn mutate(
        &self,
        id: &MemberId,
        present: bool,
        cancel: &CancellationToken,
    ) -> Result<(), RemoteError> {
        retry(&self.config.retry, self.config.timeout(), cancel, |_| {
            self.mutate_once(id, present)
        })
        .await
    }
}
