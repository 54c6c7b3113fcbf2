//! End-to-end flow over a shared in-memory store: instrumented stores,
//! replay, and the fetch cache all reading and writing one backend.

use std::sync::Arc;
use std::time::Duration;

use mnemo_cache::{
    FetchCache, FetchCacheConfig, InstrumentedCache, Replay, STORE_OPERATION,
};
use mnemo_core::MnemoError;
use mnemo_store::{KeyValueStore, MemoryStore};
use mnemo_test_utils::{init_tracing, ScriptedFetcher};

#[tokio::test]
async fn store_retrieve_and_coerce() {
    init_tracing();
    let cache = InstrumentedCache::new(Arc::new(MemoryStore::new()));

    let k1 = cache.store("foo").await.unwrap();
    assert_eq!(cache.retrieve_text(&k1).await.unwrap(), Some("foo".into()));
    assert!(matches!(
        cache.retrieve_int(&k1).await.unwrap_err(),
        MnemoError::Coercion(_)
    ));

    let k2 = cache.store(42).await.unwrap();
    assert_eq!(cache.retrieve_int(&k2).await.unwrap(), Some(42));

    assert_eq!(cache.retrieve("unknown").await.unwrap(), None);
}

#[tokio::test]
async fn replay_reflects_instrumented_calls() {
    init_tracing();
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let cache = InstrumentedCache::new(Arc::clone(&store));
    let replay = Replay::new(cache.journal().clone());

    let before = replay.report(STORE_OPERATION).await.unwrap();
    assert_eq!(before.count(), 0);
    assert!(before.lines().is_empty());

    let keys = [
        cache.store("alpha").await.unwrap(),
        cache.store("beta").await.unwrap(),
        cache.store(7).await.unwrap(),
    ];

    assert_eq!(cache.store_count().await.unwrap(), 3);

    let trace = replay.report(STORE_OPERATION).await.unwrap();
    assert_eq!(trace.count() as u64, cache.store_count().await.unwrap());
    assert_eq!(trace.lines().len(), 3);
    for (line, key) in trace.lines().iter().zip(&keys) {
        assert!(line.starts_with("store(*["));
        assert!(line.ends_with(&format!("-> \"{key}\"")));
    }
}

#[tokio::test]
async fn flush_resets_counters_and_history() {
    init_tracing();
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let cache = InstrumentedCache::new(Arc::clone(&store));

    cache.store("ephemeral").await.unwrap();
    assert_eq!(cache.store_count().await.unwrap(), 1);

    store.flush_all().await.unwrap();

    assert_eq!(cache.store_count().await.unwrap(), 0);
    let trace = Replay::new(cache.journal().clone())
        .report(STORE_OPERATION)
        .await
        .unwrap();
    assert_eq!(trace.count(), 0);
}

#[tokio::test]
async fn fetch_cache_full_lifecycle() {
    init_tracing();
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let fetcher = ScriptedFetcher::new()
        .respond_with("<html>one</html>")
        .respond_with("<html>two</html>");
    let cache = FetchCache::new(Arc::clone(&store), fetcher.clone());

    let url = "http://slowwly.example/page";

    // Miss, fetch, hit.
    assert_eq!(cache.get_or_fetch(url).await.unwrap(), "<html>one</html>");
    assert_eq!(cache.get_or_fetch(url).await.unwrap(), "<html>one</html>");
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(cache.access_count(url).await.unwrap(), 2);
}

#[tokio::test]
async fn fetch_cache_expiry_goes_upstream_again() {
    init_tracing();
    let fetcher = ScriptedFetcher::new()
        .respond_with("first")
        .respond_with("second");
    let cache = FetchCache::with_config(
        Arc::new(MemoryStore::new()),
        fetcher.clone(),
        FetchCacheConfig::new().with_ttl(Duration::ZERO),
    );

    let url = "http://slowwly.example/page";
    assert_eq!(cache.get_or_fetch(url).await.unwrap(), "first");
    assert_eq!(cache.get_or_fetch(url).await.unwrap(), "second");
    assert_eq!(fetcher.calls(), 2);
    assert_eq!(cache.access_count(url).await.unwrap(), 2);
}

#[tokio::test]
async fn instrumentation_and_fetch_cache_share_one_namespace() {
    init_tracing();
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let cache = InstrumentedCache::new(Arc::clone(&store));
    let fetch_cache = FetchCache::new(
        Arc::clone(&store),
        ScriptedFetcher::new().respond_with("page body"),
    );

    cache.store("value").await.unwrap();
    fetch_cache.get_or_fetch("http://example.com").await.unwrap();

    // Counters, history lists, and payloads coexist under one flat
    // namespace, distinguished by naming convention alone.
    assert!(store.get("store").await.unwrap().is_some());
    assert_eq!(store.lrange("store:inputs", 0, -1).await.unwrap().len(), 1);
    assert!(store.get("count:http://example.com").await.unwrap().is_some());
    assert!(store.get("page:http://example.com").await.unwrap().is_some());
}
