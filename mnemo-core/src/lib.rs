//! mnemo core - value model and error taxonomy
//!
//! Shared foundation for the mnemo workspace: the scalar value model
//! accepted by the cache, the coercions applied on retrieval, and the
//! error types every crate in the workspace speaks.

pub mod error;
pub mod value;

pub use error::{
    CoercionError, FetchError, HistoryError, MnemoError, MnemoResult, StoreError, ValidationError,
};
pub use value::{decode_int, decode_text, CacheValue};
