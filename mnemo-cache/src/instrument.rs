//! Call instrumentation around cache operations.
//!
//! Counting and history recording are composed explicitly here rather
//! than by decorator stacking: [`Instrumented::invoke`] fixes the order
//! once. The counter observes every invocation attempt, including calls
//! whose inner operation fails; history commits only after the wrapped
//! operation succeeds, so a failed call bumps the counter and leaves
//! both history lists untouched.
//!
//! # Key Layout
//!
//! For an operation named `op`, the journal owns three keys in the
//! store's flat namespace:
//!
//! - `"op"` - attempt counter (decimal text, atomic increment)
//! - `"op:inputs"` - append-only list of serialized argument tuples
//! - `"op:outputs"` - append-only list of serialized results
//!
//! The two lists are correlated positionally: the Nth input belongs to
//! the Nth output.

use std::sync::Arc;

use async_trait::async_trait;
use mnemo_core::{decode_int, CacheValue, MnemoResult};
use mnemo_store::KeyValueStore;

/// Ordered positional arguments of one cache operation call.
///
/// Rendered for history as a single JSON array, e.g. `["foo"]`.
#[derive(Debug, Clone, Default)]
pub struct CallArgs(Vec<CacheValue>);

impl CallArgs {
    /// Build from a list of values.
    pub fn new(args: Vec<CacheValue>) -> Self {
        Self(args)
    }

    /// Build a single-argument call.
    pub fn one(arg: impl Into<CacheValue>) -> Self {
        Self(vec![arg.into()])
    }

    /// The argument values in call order.
    pub fn values(&self) -> &[CacheValue] {
        &self.0
    }

    /// Consume into the argument values.
    pub fn into_values(self) -> Vec<CacheValue> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render the whole argument tuple as one JSON array string.
    pub fn render(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string())
    }
}

/// A named cache operation that can be instrumented.
///
/// Operations are strategy objects, not method pointers: wrapping one in
/// [`Instrumented`] yields something with the same call signature, which
/// keeps the composition explicit and testable.
#[async_trait]
pub trait CacheOperation: Send + Sync {
    /// Stable name used for the counter and history keys.
    fn name(&self) -> &'static str;

    /// Run the operation.
    async fn invoke(&self, args: CallArgs) -> MnemoResult<CacheValue>;
}

/// Writer/reader for per-operation counters and history lists.
///
/// Holds no state of its own; everything lives in the store, so counts
/// and history survive as long as the store does.
#[derive(Clone)]
pub struct CallJournal {
    store: Arc<dyn KeyValueStore>,
}

impl CallJournal {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Counter key for an operation: the bare operation name.
    pub fn counter_key(operation: &str) -> String {
        operation.to_string()
    }

    /// Inputs history key for an operation.
    pub fn inputs_key(operation: &str) -> String {
        format!("{operation}:inputs")
    }

    /// Outputs history key for an operation.
    pub fn outputs_key(operation: &str) -> String {
        format!("{operation}:outputs")
    }

    /// Count one invocation attempt. Returns the new total.
    pub async fn record_attempt(&self, operation: &str) -> MnemoResult<u64> {
        self.store.incr(&Self::counter_key(operation)).await
    }

    /// Append one completed call to the history lists, input first.
    pub async fn record_success(
        &self,
        operation: &str,
        args: &CallArgs,
        result: &CacheValue,
    ) -> MnemoResult<()> {
        self.store
            .rpush(&Self::inputs_key(operation), args.render().as_bytes())
            .await?;
        self.store
            .rpush(
                &Self::outputs_key(operation),
                result.render_json().as_bytes(),
            )
            .await
    }

    /// Read the attempt counter; absent counters read as zero.
    pub async fn call_count(&self, operation: &str) -> MnemoResult<u64> {
        match self.store.get(&Self::counter_key(operation)).await? {
            None => Ok(0),
            Some(bytes) => Ok(decode_int(&bytes)?.max(0) as u64),
        }
    }

    /// Read both history lists in full, oldest first.
    ///
    /// Entries are decoded leniently; history reads are best-effort by
    /// design and must not fail on a single mangled record.
    pub async fn history(&self, operation: &str) -> MnemoResult<(Vec<String>, Vec<String>)> {
        let inputs = self
            .store
            .lrange(&Self::inputs_key(operation), 0, -1)
            .await?
            .iter()
            .map(|e| String::from_utf8_lossy(e).into_owned())
            .collect();
        let outputs = self
            .store
            .lrange(&Self::outputs_key(operation), 0, -1)
            .await?
            .iter()
            .map(|e| String::from_utf8_lossy(e).into_owned())
            .collect();
        Ok((inputs, outputs))
    }
}

impl std::fmt::Debug for CallJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallJournal").finish_non_exhaustive()
    }
}

/// An operation wrapped with counting and (optionally) history recording.
pub struct Instrumented<O> {
    inner: O,
    journal: CallJournal,
    record_history: bool,
}

impl<O: CacheOperation> Instrumented<O> {
    /// Wrap an operation with counting and history recording.
    pub fn new(inner: O, journal: CallJournal) -> Self {
        Self {
            inner,
            journal,
            record_history: true,
        }
    }

    /// Enable or disable history recording; counting is always on.
    pub fn with_history(mut self, enabled: bool) -> Self {
        self.record_history = enabled;
        self
    }

    /// Name of the wrapped operation.
    pub fn name(&self) -> &'static str {
        self.inner.name()
    }

    /// Invoke the wrapped operation.
    ///
    /// The attempt counter is bumped before delegating; history is
    /// appended only when the inner operation returns `Ok` (strict
    /// policy: a failed call leaves no partial records).
    pub async fn invoke(&self, args: CallArgs) -> MnemoResult<CacheValue> {
        self.journal.record_attempt(self.inner.name()).await?;
        let result = self.inner.invoke(args.clone()).await?;
        if self.record_history {
            self.journal
                .record_success(self.inner.name(), &args, &result)
                .await?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_core::{MnemoError, StoreError};
    use mnemo_store::MemoryStore;

    struct EchoOp;

    #[async_trait]
    impl CacheOperation for EchoOp {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn invoke(&self, args: CallArgs) -> MnemoResult<CacheValue> {
            Ok(args
                .into_values()
                .into_iter()
                .next()
                .unwrap_or(CacheValue::Text(String::new())))
        }
    }

    struct FailingOp;

    #[async_trait]
    impl CacheOperation for FailingOp {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn invoke(&self, _args: CallArgs) -> MnemoResult<CacheValue> {
            Err(MnemoError::Store(StoreError::Unavailable {
                reason: "down".to_string(),
            }))
        }
    }

    fn journal() -> CallJournal {
        CallJournal::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_call_args_render() {
        assert_eq!(CallArgs::one("foo").render(), "[\"foo\"]");
        assert_eq!(CallArgs::one(42).render(), "[42]");
        assert_eq!(CallArgs::default().render(), "[]");
    }

    #[test]
    fn test_key_layout() {
        assert_eq!(CallJournal::counter_key("store"), "store");
        assert_eq!(CallJournal::inputs_key("store"), "store:inputs");
        assert_eq!(CallJournal::outputs_key("store"), "store:outputs");
    }

    #[tokio::test]
    async fn test_counter_and_history_advance_together_on_success() {
        let journal = journal();
        let op = Instrumented::new(EchoOp, journal.clone());

        for n in 1..=3u64 {
            op.invoke(CallArgs::one("x")).await.unwrap();
            assert_eq!(journal.call_count("echo").await.unwrap(), n);
            let (inputs, outputs) = journal.history("echo").await.unwrap();
            assert_eq!(inputs.len() as u64, n);
            assert_eq!(outputs.len() as u64, n);
        }
    }

    #[tokio::test]
    async fn test_history_positionally_correlated() {
        let journal = journal();
        let op = Instrumented::new(EchoOp, journal.clone());

        op.invoke(CallArgs::one("first")).await.unwrap();
        op.invoke(CallArgs::one("second")).await.unwrap();

        let (inputs, outputs) = journal.history("echo").await.unwrap();
        assert_eq!(inputs, vec!["[\"first\"]", "[\"second\"]"]);
        assert_eq!(outputs, vec!["\"first\"", "\"second\""]);
    }

    #[tokio::test]
    async fn test_failed_call_counts_but_leaves_no_history() {
        let journal = journal();
        let op = Instrumented::new(FailingOp, journal.clone());

        assert!(op.invoke(CallArgs::one("x")).await.is_err());

        assert_eq!(journal.call_count("failing").await.unwrap(), 1);
        let (inputs, outputs) = journal.history("failing").await.unwrap();
        assert!(inputs.is_empty());
        assert!(outputs.is_empty());
    }

    #[tokio::test]
    async fn test_counting_only_when_history_disabled() {
        let journal = journal();
        let op = Instrumented::new(EchoOp, journal.clone()).with_history(false);

        op.invoke(CallArgs::one("x")).await.unwrap();

        assert_eq!(journal.call_count("echo").await.unwrap(), 1);
        let (inputs, outputs) = journal.history("echo").await.unwrap();
        assert!(inputs.is_empty());
        assert!(outputs.is_empty());
    }

    #[tokio::test]
    async fn test_call_count_reads_zero_before_any_call() {
        assert_eq!(journal().call_count("never").await.unwrap(), 0);
    }
}
