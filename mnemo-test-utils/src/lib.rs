//! mnemo Test Utilities
//!
//! Centralized test infrastructure for the mnemo workspace:
//! - Scripted fetcher for driving the fetch cache without a network
//! - Tracing initialization for test output
//! - Re-exports of the in-memory store and core types for convenience

// Re-export the in-memory backend from its source crate
pub use mnemo_store::MemoryStore;

// Re-export core types for convenience
pub use mnemo_core::{
    decode_int, decode_text, CacheValue, CoercionError, FetchError, HistoryError, MnemoError,
    MnemoResult, StoreError, ValidationError,
};

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mnemo_cache::Fetcher;
use once_cell::sync::Lazy;

static TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
});

/// Install a test tracing subscriber once per process.
pub fn init_tracing() {
    Lazy::force(&TRACING);
}

#[derive(Default)]
struct ScriptedInner {
    script: Mutex<VecDeque<Result<String, FetchError>>>,
    calls: AtomicUsize,
}

/// Fetcher that replays a queued script of payloads and failures.
///
/// Clones share the same script and call counter, so a test can hand
/// one clone to the cache under test and keep another for assertions.
/// An exhausted script fails with a transport error.
#[derive(Clone, Default)]
pub struct ScriptedFetcher {
    inner: Arc<ScriptedInner>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful fetch returning `payload`.
    pub fn respond_with(self, payload: impl Into<String>) -> Self {
        self.inner
            .script
            .lock()
            .expect("scripted fetcher lock")
            .push_back(Ok(payload.into()));
        self
    }

    /// Queue a failed fetch.
    pub fn fail_with(self, err: FetchError) -> Self {
        self.inner
            .script
            .lock()
            .expect("scripted fetcher lock")
            .push_back(Err(err));
        self
    }

    /// How many times `fetch` has been invoked.
    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, target: &str) -> MnemoResult<String> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        match self
            .inner
            .script
            .lock()
            .expect("scripted fetcher lock")
            .pop_front()
        {
            Some(result) => result.map_err(Into::into),
            None => Err(FetchError::Transport {
                target: target.to_string(),
                reason: "scripted fetcher exhausted".to_string(),
            }
            .into()),
        }
    }
}

impl std::fmt::Debug for ScriptedFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedFetcher")
            .field("calls", &self.calls())
            .finish_non_exhaustive()
    }
}
