//! Opaque-key scalar storage over a key-value store.

use std::sync::Arc;

use async_trait::async_trait;
use mnemo_core::{
    decode_int, decode_text, CacheValue, CoercionError, MnemoResult, ValidationError,
};
use mnemo_store::KeyValueStore;
use uuid::Uuid;

use crate::instrument::{CacheOperation, CallArgs, CallJournal, Instrumented};

/// Operation name under which [`InstrumentedCache::store`] is journaled.
pub const STORE_OPERATION: &str = "store";

/// Stores scalar values under generated opaque keys.
///
/// Keys are random 128-bit identifiers, so every `store` call yields a
/// key never handed out before; values are written with no TTL and live
/// until an explicit flush.
#[derive(Clone)]
pub struct ValueCache {
    store: Arc<dyn KeyValueStore>,
}

impl ValueCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Handle to the underlying store, for composing other components
    /// against the same backend.
    pub fn store_handle(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.store)
    }

    /// Store a value under a freshly generated key and return the key.
    pub async fn store(&self, value: impl Into<CacheValue>) -> MnemoResult<String> {
        let value = value.into();
        let key = Uuid::new_v4().to_string();
        self.store.set(&key, &value.encode()).await?;
        Ok(key)
    }

    /// Retrieve the raw bytes under `key`.
    ///
    /// Missing and expired keys read as `Ok(None)`, never as an error.
    pub async fn retrieve(&self, key: &str) -> MnemoResult<Option<Vec<u8>>> {
        self.store.get(key).await
    }

    /// Retrieve and coerce the value under `key`.
    ///
    /// Absence stays `Ok(None)`; a present value that fails coercion
    /// surfaces the coercion error.
    pub async fn retrieve_with<T>(
        &self,
        key: &str,
        coerce: impl FnOnce(&[u8]) -> Result<T, CoercionError> + Send,
    ) -> MnemoResult<Option<T>> {
        match self.store.get(key).await? {
            None => Ok(None),
            Some(bytes) => Ok(Some(coerce(&bytes)?)),
        }
    }

    /// Retrieve the value under `key` as UTF-8 text.
    pub async fn retrieve_text(&self, key: &str) -> MnemoResult<Option<String>> {
        self.retrieve_with(key, decode_text).await
    }

    /// Retrieve the value under `key` as an integer.
    pub async fn retrieve_int(&self, key: &str) -> MnemoResult<Option<i64>> {
        self.retrieve_with(key, decode_int).await
    }
}

/// The `store` operation as an instrumentable strategy object.
struct StoreOp {
    cache: ValueCache,
}

#[async_trait]
impl CacheOperation for StoreOp {
    fn name(&self) -> &'static str {
        STORE_OPERATION
    }

    async fn invoke(&self, args: CallArgs) -> MnemoResult<CacheValue> {
        let mut values = args.into_values();
        if values.len() != 1 {
            return Err(ValidationError::InvalidArguments {
                operation: STORE_OPERATION.to_string(),
                expected: 1,
                got: values.len(),
            }
            .into());
        }
        let key = self.cache.store(values.remove(0)).await?;
        Ok(CacheValue::Text(key))
    }
}

/// A [`ValueCache`] whose `store` operation is instrumented.
///
/// This is the canonical composition: every `store` call is counted and
/// recorded in the journal shared with [`crate::replay::Replay`].
/// Retrieval is a pure read and passes through uninstrumented.
pub struct InstrumentedCache {
    cache: ValueCache,
    journal: CallJournal,
    store_op: Instrumented<StoreOp>,
}

impl InstrumentedCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let cache = ValueCache::new(Arc::clone(&store));
        let journal = CallJournal::new(store);
        let store_op = Instrumented::new(
            StoreOp {
                cache: cache.clone(),
            },
            journal.clone(),
        );
        Self {
            cache,
            journal,
            store_op,
        }
    }

    /// The journal counting and recording this cache's operations.
    pub fn journal(&self) -> &CallJournal {
        &self.journal
    }

    /// Store a value under a fresh key, counting and recording the call.
    pub async fn store(&self, value: impl Into<CacheValue>) -> MnemoResult<String> {
        let result = self.store_op.invoke(CallArgs::one(value)).await?;
        result.into_text().ok_or_else(|| {
            ValidationError::InvalidValue {
                field: "store result".to_string(),
                reason: "expected a generated key".to_string(),
            }
            .into()
        })
    }

    /// Number of `store` attempts so far.
    pub async fn store_count(&self) -> MnemoResult<u64> {
        self.journal.call_count(STORE_OPERATION).await
    }

    pub async fn retrieve(&self, key: &str) -> MnemoResult<Option<Vec<u8>>> {
        self.cache.retrieve(key).await
    }

    pub async fn retrieve_text(&self, key: &str) -> MnemoResult<Option<String>> {
        self.cache.retrieve_text(key).await
    }

    pub async fn retrieve_int(&self, key: &str) -> MnemoResult<Option<i64>> {
        self.cache.retrieve_int(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_core::MnemoError;
    use mnemo_store::MemoryStore;
    use std::collections::HashSet;

    fn cache() -> ValueCache {
        ValueCache::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_store_retrieve_round_trip() {
        let cache = cache();
        let key = cache.store("foo").await.unwrap();
        assert_eq!(
            cache.retrieve(&key).await.unwrap(),
            Some(b"foo".to_vec())
        );
    }

    #[tokio::test]
    async fn test_store_generates_unique_keys() {
        let cache = cache();
        let mut keys = HashSet::new();
        for _ in 0..100 {
            let key = cache.store("same value").await.unwrap();
            assert!(keys.insert(key), "key was handed out twice");
        }
    }

    #[tokio::test]
    async fn test_retrieve_missing_is_none_never_an_error() {
        let cache = cache();
        assert_eq!(cache.retrieve("no-such-key").await.unwrap(), None);
        assert_eq!(cache.retrieve_text("no-such-key").await.unwrap(), None);
        assert_eq!(cache.retrieve_int("no-such-key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_text_and_integer_coercions() {
        let cache = cache();

        let k1 = cache.store("foo").await.unwrap();
        assert_eq!(
            cache.retrieve_text(&k1).await.unwrap(),
            Some("foo".to_string())
        );
        let err = cache.retrieve_int(&k1).await.unwrap_err();
        assert!(matches!(err, MnemoError::Coercion(_)));

        let k2 = cache.store(42).await.unwrap();
        assert_eq!(cache.retrieve_int(&k2).await.unwrap(), Some(42));
        // Numbers stored as decimal text read back as text too.
        assert_eq!(
            cache.retrieve_text(&k2).await.unwrap(),
            Some("42".to_string())
        );
    }

    #[tokio::test]
    async fn test_instrumented_store_counts_and_records() {
        let cache = InstrumentedCache::new(Arc::new(MemoryStore::new()));

        let k1 = cache.store("foo").await.unwrap();
        let k2 = cache.store(42).await.unwrap();
        assert_ne!(k1, k2);

        assert_eq!(cache.store_count().await.unwrap(), 2);
        let (inputs, outputs) = cache.journal().history(STORE_OPERATION).await.unwrap();
        assert_eq!(inputs, vec!["[\"foo\"]", "[42]"]);
        assert_eq!(outputs, vec![format!("\"{k1}\""), format!("\"{k2}\"")]);
    }

    #[tokio::test]
    async fn test_instrumented_retrieval_passthrough() {
        let cache = InstrumentedCache::new(Arc::new(MemoryStore::new()));
        let key = cache.store("payload").await.unwrap();
        assert_eq!(
            cache.retrieve_text(&key).await.unwrap(),
            Some("payload".to_string())
        );
        // Retrieval is uninstrumented; only the store call counted.
        assert_eq!(cache.store_count().await.unwrap(), 1);
    }
}
