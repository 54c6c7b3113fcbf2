//! HTTP fetcher backed by reqwest.

use std::time::Duration;

use async_trait::async_trait;
use mnemo_core::{FetchError, MnemoResult};
use reqwest::Client;

use super::Fetcher;

/// Fetches targets over HTTP(S) with GET.
///
/// Non-2xx responses are failures: the fetch cache must never store an
/// error page as if it were the payload.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build with a default client.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Build with a per-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::ClientBuild {
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }

    /// Build from a preconfigured client (proxies, TLS settings, ...).
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, target: &str) -> MnemoResult<String> {
        let response = self
            .client
            .get(target)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                target: target.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::RequestFailed {
                target: target.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        response.text().await.map_err(|e| {
            FetchError::Transport {
                target: target.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher").finish_non_exhaustive()
    }
}
