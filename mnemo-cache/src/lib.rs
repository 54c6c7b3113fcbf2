//! mnemo cache - instrumented caching components
//!
//! Everything here is built against the [`mnemo_store::KeyValueStore`]
//! trait and holds no state of its own: counters, history lists, and
//! cached payloads all live in the store and share its lifetime.
//!
//! # Components
//!
//! - [`ValueCache`] / [`InstrumentedCache`] - scalar storage under
//!   generated opaque keys, with the `store` operation counted and
//!   recorded.
//! - [`Instrumented`] - explicit wrapper composing call counting and
//!   history recording around any [`CacheOperation`].
//! - [`Replay`] - renders recorded history as an ordered call trace.
//! - [`FetchCache`] - TTL-bound cache for fetched content with
//!   per-target access counters; [`HttpFetcher`] fetches over HTTP.

pub mod fetch;
pub mod instrument;
pub mod replay;
pub mod value_cache;

pub use fetch::{FetchCache, FetchCacheConfig, Fetcher, HttpFetcher};
pub use instrument::{CacheOperation, CallArgs, CallJournal, Instrumented};
pub use replay::{CallTrace, Replay};
pub use value_cache::{InstrumentedCache, ValueCache, STORE_OPERATION};
