//! In-memory key-value store.
//!
//! A single `RwLock` over a map of slots. Suitable for tests and for
//! callers that don't need state to outlive the process; the semantics
//! (flat namespace, passive expiry, atomic incr/append) match the
//! persistent backend exactly.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mnemo_core::{MnemoResult, StoreError};

use crate::{resolve_range, KeyValueStore};

/// One keyed entry: either a scalar (with optional expiry) or a list.
#[derive(Debug, Clone)]
enum Slot {
    Scalar {
        bytes: Vec<u8>,
        expires_at: Option<DateTime<Utc>>,
    },
    List(Vec<Vec<u8>>),
}

impl Slot {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(
            self,
            Slot::Scalar {
                expires_at: Some(deadline),
                ..
            } if *deadline <= now
        )
    }
}

/// In-memory store backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: RwLock<HashMap<String, Slot>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn deadline(ttl: Duration) -> DateTime<Utc> {
        Utc::now() + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> MnemoResult<Option<Vec<u8>>> {
        {
            let slots = self.slots.read().map_err(|_| StoreError::LockPoisoned)?;
            match slots.get(key) {
                None => return Ok(None),
                Some(Slot::List(_)) => {
                    return Err(StoreError::WrongType {
                        key: key.to_string(),
                        expected: "scalar",
                    }
                    .into())
                }
                Some(Slot::Scalar { bytes, expires_at }) => {
                    let expired = matches!(expires_at, Some(deadline) if *deadline <= Utc::now());
                    if !expired {
                        return Ok(Some(bytes.clone()));
                    }
                }
            }
        }

        // Entry exists but has expired: evict it before reporting absence.
        let mut slots = self.slots.write().map_err(|_| StoreError::LockPoisoned)?;
        if slots
            .get(key)
            .is_some_and(|slot| slot.is_expired(Utc::now()))
        {
            slots.remove(key);
            tracing::debug!(%key, "evicted expired entry");
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &[u8]) -> MnemoResult<()> {
        let mut slots = self.slots.write().map_err(|_| StoreError::LockPoisoned)?;
        slots.insert(
            key.to_string(),
            Slot::Scalar {
                bytes: value.to_vec(),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> MnemoResult<()> {
        let mut slots = self.slots.write().map_err(|_| StoreError::LockPoisoned)?;
        slots.insert(
            key.to_string(),
            Slot::Scalar {
                bytes: value.to_vec(),
                expires_at: Some(Self::deadline(ttl)),
            },
        );
        Ok(())
    }

    async fn incr(&self, key: &str) -> MnemoResult<u64> {
        let mut slots = self.slots.write().map_err(|_| StoreError::LockPoisoned)?;
        let current = match slots.get(key) {
            None => 0,
            Some(slot) if slot.is_expired(Utc::now()) => 0,
            Some(Slot::List(_)) => {
                return Err(StoreError::WrongType {
                    key: key.to_string(),
                    expected: "integer counter",
                }
                .into())
            }
            Some(Slot::Scalar { bytes, .. }) => std::str::from_utf8(bytes)
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .ok_or_else(|| StoreError::WrongType {
                    key: key.to_string(),
                    expected: "integer counter",
                })?,
        };
        let next = current + 1;
        slots.insert(
            key.to_string(),
            Slot::Scalar {
                bytes: next.to_string().into_bytes(),
                expires_at: None,
            },
        );
        Ok(next)
    }

    async fn rpush(&self, key: &str, value: &[u8]) -> MnemoResult<()> {
        let mut slots = self.slots.write().map_err(|_| StoreError::LockPoisoned)?;
        match slots
            .entry(key.to_string())
            .or_insert_with(|| Slot::List(Vec::new()))
        {
            Slot::List(entries) => {
                entries.push(value.to_vec());
                Ok(())
            }
            Slot::Scalar { .. } => Err(StoreError::WrongType {
                key: key.to_string(),
                expected: "list",
            }
            .into()),
        }
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> MnemoResult<Vec<Vec<u8>>> {
        let slots = self.slots.read().map_err(|_| StoreError::LockPoisoned)?;
        match slots.get(key) {
            None => Ok(Vec::new()),
            Some(Slot::Scalar { .. }) => Err(StoreError::WrongType {
                key: key.to_string(),
                expected: "list",
            }
            .into()),
            Some(Slot::List(entries)) => Ok(match resolve_range(entries.len(), start, stop) {
                None => Vec::new(),
                Some((lo, hi)) => entries[lo..=hi].to_vec(),
            }),
        }
    }

    async fn flush_all(&self) -> MnemoResult<()> {
        let mut slots = self.slots.write().map_err(|_| StoreError::LockPoisoned)?;
        let flushed = slots.len();
        slots.clear();
        tracing::debug!(flushed, "flushed all keys");
        Ok(())
    }
}
