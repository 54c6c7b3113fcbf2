//! Scalar value model for cache storage.
//!
//! Values travel to the store as raw bytes and come back as raw bytes;
//! interpreting those bytes is a coercion the caller opts into. Text uses
//! UTF-8 and nothing else, integers use their canonical decimal rendering,
//! so a stored `Int(42)` reads back as the bytes `b"42"` and coerces back
//! to `42` without loss.

use serde::Serialize;

use crate::error::CoercionError;

/// A scalar value accepted by the cache.
///
/// Mirrors the kinds the underlying store natively holds: text, raw
/// bytes, and numbers (which the store keeps as decimal text, the same
/// convention its atomic increment relies on).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CacheValue {
    Text(String),
    Bytes(Vec<u8>),
    Int(i64),
    Float(f64),
}

impl CacheValue {
    /// Encode this value to the byte representation handed to the store.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            CacheValue::Text(s) => s.as_bytes().to_vec(),
            CacheValue::Bytes(b) => b.clone(),
            CacheValue::Int(n) => n.to_string().into_bytes(),
            CacheValue::Float(f) => f.to_string().into_bytes(),
        }
    }

    /// Render this value as a single JSON token for history records.
    pub fn render_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "null".to_string())
    }

    /// Extract the inner text, if this is a `Text` value.
    pub fn into_text(self) -> Option<String> {
        match self {
            CacheValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for CacheValue {
    fn from(s: &str) -> Self {
        CacheValue::Text(s.to_string())
    }
}

impl From<String> for CacheValue {
    fn from(s: String) -> Self {
        CacheValue::Text(s)
    }
}

impl From<Vec<u8>> for CacheValue {
    fn from(b: Vec<u8>) -> Self {
        CacheValue::Bytes(b)
    }
}

impl From<&[u8]> for CacheValue {
    fn from(b: &[u8]) -> Self {
        CacheValue::Bytes(b.to_vec())
    }
}

impl From<i32> for CacheValue {
    fn from(n: i32) -> Self {
        CacheValue::Int(n as i64)
    }
}

impl From<i64> for CacheValue {
    fn from(n: i64) -> Self {
        CacheValue::Int(n)
    }
}

impl From<f64> for CacheValue {
    fn from(f: f64) -> Self {
        CacheValue::Float(f)
    }
}

/// Decode stored bytes as UTF-8 text.
///
/// Fails loudly on invalid UTF-8 rather than substituting replacement
/// characters.
pub fn decode_text(bytes: &[u8]) -> Result<String, CoercionError> {
    String::from_utf8(bytes.to_vec()).map_err(|e| CoercionError::InvalidUtf8 {
        reason: e.to_string(),
    })
}

/// Decode stored bytes as a decimal integer.
///
/// The full byte sequence must be a valid UTF-8 decimal integer; anything
/// else fails rather than truncating.
pub fn decode_int(bytes: &[u8]) -> Result<i64, CoercionError> {
    let text = std::str::from_utf8(bytes).map_err(|_| CoercionError::NotAnInteger {
        value: String::from_utf8_lossy(bytes).into_owned(),
    })?;
    text.parse::<i64>().map_err(|_| CoercionError::NotAnInteger {
        value: text.to_string(),
    })
}
