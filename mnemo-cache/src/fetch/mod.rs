//! Expiring cache for fetched content.
//!
//! Caches the payload of slow or expensive fetches (canonically web
//! pages) under a TTL, and tracks how often each target is requested.
//! The access counter is a request counter, not a miss counter: it
//! advances on cache hits too.
//!
//! Expiry is store-enforced. This module never polls for expiry; an
//! expired payload simply reads as absent, which is the same condition
//! as never-cached, and either one triggers a fresh fetch.

pub mod http;

pub use http::HttpFetcher;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mnemo_core::{decode_int, decode_text, MnemoResult};
use mnemo_store::KeyValueStore;

/// Fetches the payload for a target (network I/O, may block or fail).
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, target: &str) -> MnemoResult<String>;
}

/// Configuration for the fetch cache.
#[derive(Debug, Clone)]
pub struct FetchCacheConfig {
    /// How long a cached payload stays live.
    pub ttl: Duration,
    /// Key prefix for cached payloads.
    pub payload_prefix: String,
    /// Key prefix for per-target access counters.
    pub count_prefix: String,
}

impl Default for FetchCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(10),
            payload_prefix: "page:".to_string(),
            count_prefix: "count:".to_string(),
        }
    }
}

impl FetchCacheConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the payload TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// TTL-bound cache in front of a [`Fetcher`].
///
/// Per-target state machine: uncached, cached-until-deadline, expired
/// (indistinguishable from uncached). A failed fetch writes nothing, so
/// the target stays uncached and the next request retries upstream.
pub struct FetchCache<F> {
    store: Arc<dyn KeyValueStore>,
    fetcher: F,
    config: FetchCacheConfig,
}

impl<F: Fetcher> FetchCache<F> {
    /// Build with the default configuration (10 second TTL).
    pub fn new(store: Arc<dyn KeyValueStore>, fetcher: F) -> Self {
        Self::with_config(store, fetcher, FetchCacheConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn KeyValueStore>,
        fetcher: F,
        config: FetchCacheConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            config,
        }
    }

    pub fn config(&self) -> &FetchCacheConfig {
        &self.config
    }

    fn payload_key(&self, target: &str) -> String {
        format!("{}{}", self.config.payload_prefix, target)
    }

    fn count_key(&self, target: &str) -> String {
        format!("{}{}", self.config.count_prefix, target)
    }

    /// Return the cached payload for `target`, fetching on miss.
    ///
    /// Every request counts against the target's access counter, hit or
    /// miss. On a miss the fetched payload is stored with the configured
    /// TTL; fetch failures propagate and leave the cache untouched.
    pub async fn get_or_fetch(&self, target: &str) -> MnemoResult<String> {
        self.store.incr(&self.count_key(target)).await?;

        if let Some(bytes) = self.store.get(&self.payload_key(target)).await? {
            tracing::debug!(url = target, "fetch cache hit");
            return Ok(decode_text(&bytes)?);
        }

        tracing::debug!(url = target, "fetch cache miss");
        let payload = self.fetcher.fetch(target).await?;
        self.store
            .set_with_ttl(&self.payload_key(target), payload.as_bytes(), self.config.ttl)
            .await?;
        Ok(payload)
    }

    /// How many times `target` has been requested; zero when never seen.
    pub async fn access_count(&self, target: &str) -> MnemoResult<u64> {
        match self.store.get(&self.count_key(target)).await? {
            None => Ok(0),
            Some(bytes) => Ok(decode_int(&bytes)?.max(0) as u64),
        }
    }
}
