//! mnemo store - key-value backend abstraction
//!
//! Defines the [`KeyValueStore`] trait every cache component is built
//! against, plus two backends: [`MemoryStore`] for tests and ephemeral
//! use, and [`LmdbStore`] for state that must survive process restart.
//!
//! # Namespace
//!
//! Scalars, counters, and history lists share one flat string-key
//! namespace; they are distinguished by naming convention only
//! (`"<op>"` for a counter, `"<op>:inputs"` / `"<op>:outputs"` for
//! history lists). Counters are ordinary scalars holding decimal text,
//! which is what makes `incr` composable with `get`.
//!
//! # Expiry
//!
//! TTL is enforced passively: an expired entry simply reads as absent.
//! Backends evict expired entries when they encounter them on read;
//! nothing polls for expiry.

pub mod lmdb;
pub mod memory;

pub use lmdb::{LmdbStore, LmdbStoreError};
pub use memory::MemoryStore;

use std::time::Duration;

use async_trait::async_trait;
use mnemo_core::MnemoResult;

/// Backend trait for pluggable key-value stores.
///
/// Implementations must be thread-safe and provide per-key atomicity:
/// `incr` is an atomic read-modify-write, `rpush` an atomic append, and
/// `set_with_ttl` an atomic set-with-expiry. No caller ever needs
/// cross-operation locking on top of this trait.
///
/// Missing keys are modeled as `Ok(None)` (or an empty list), never as
/// an error; errors mean the operation itself failed.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get the raw bytes stored under `key`.
    ///
    /// Returns `None` for missing and expired keys alike.
    async fn get(&self, key: &str) -> MnemoResult<Option<Vec<u8>>>;

    /// Store raw bytes under `key` with no expiry, overwriting any
    /// previous value.
    async fn set(&self, key: &str, value: &[u8]) -> MnemoResult<()>;

    /// Store raw bytes under `key`, expiring after `ttl`.
    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> MnemoResult<()>;

    /// Atomically increment the counter under `key`, creating it at zero
    /// first if absent or expired. Returns the new count.
    async fn incr(&self, key: &str) -> MnemoResult<u64>;

    /// Append a value to the tail of the list under `key`, creating the
    /// list if absent.
    async fn rpush(&self, key: &str, value: &[u8]) -> MnemoResult<()>;

    /// Read a range of the list under `key`.
    ///
    /// Indices are inclusive on both ends; negative indices count from
    /// the tail, so `lrange(key, 0, -1)` reads the whole list. Missing
    /// lists read as empty.
    async fn lrange(&self, key: &str, start: i64, stop: i64) -> MnemoResult<Vec<Vec<u8>>>;

    /// Delete every key, list, and counter in the store.
    async fn flush_all(&self) -> MnemoResult<()>;
}

/// Resolve inclusive, possibly-negative range indices against a list of
/// `len` elements. Returns `None` when the resolved range is empty.
pub(crate) fn resolve_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }
    let len = len as i64;
    let mut start = if start < 0 { len + start } else { start };
    let mut stop = if stop < 0 { len + stop } else { stop };
    if start < 0 {
        start = 0;
    }
    if stop >= len {
        stop = len - 1;
    }
    if start > stop || start >= len || stop < 0 {
        return None;
    }
    Some((start as usize, stop as usize))
}
