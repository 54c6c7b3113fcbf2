//! Error types for mnemo operations

use thiserror::Error;

/// Key-value store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Wrong value kind under {key}: expected {expected}")]
    WrongType { key: String, expected: &'static str },

    #[error("Corrupt entry under {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Type coercion errors on retrieval.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoercionError {
    #[error("Value is not valid UTF-8: {reason}")]
    InvalidUtf8 { reason: String },

    #[error("Value is not an integer: {value:?}")]
    NotAnInteger { value: String },
}

/// Upstream fetch errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Transport failure fetching {target}: {reason}")]
    Transport { target: String, reason: String },

    #[error("Request for {target} failed with status {status}")]
    RequestFailed { target: String, status: u16 },

    #[error("Failed to build fetch client: {reason}")]
    ClientBuild { reason: String },
}

/// Call history errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HistoryError {
    #[error("History for {operation} out of sync: {inputs} inputs vs {outputs} outputs")]
    OutOfSync {
        operation: String,
        inputs: usize,
        outputs: usize,
    },
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Operation {operation} expects {expected} argument(s), got {got}")]
    InvalidArguments {
        operation: String,
        expected: usize,
        got: usize,
    },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Master error type for all mnemo errors.
#[derive(Debug, Clone, Error)]
pub enum MnemoError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Coercion error: {0}")]
    Coercion(#[from] CoercionError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Result type alias for mnemo operations.
pub type MnemoResult<T> = Result<T, MnemoError>;

// =============================================================================
// TESTS
// =============================================================================
