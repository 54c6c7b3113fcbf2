//! LMDB-backed key-value store.
//!
//! Uses the heed crate (Rust bindings for LMDB) so counters, history
//! lists, and cached entries survive process restart. One unnamed
//! database holds the whole flat namespace.
//!
//! # Value Format
//!
//! Every stored value starts with a one-byte kind tag:
//!
//! - Scalar: `[0x00][expiry millis: 8 bytes BE][payload]`, where an
//!   expiry of 0 means "never expires". Expiry is checked on read;
//!   expired entries are deleted lazily and reported as absent.
//! - List: `[0x01]` followed by repeated `[len: 4 bytes BE][entry]`
//!   frames in append order.
//!
//! # Thread Safety
//!
//! LMDB serializes write transactions, which is what makes `incr` and
//! `rpush` atomic read-modify-write operations without any locking in
//! this module.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvOpenOptions};
use mnemo_core::{MnemoResult, StoreError};

use crate::{resolve_range, KeyValueStore};

const SCALAR_TAG: u8 = 0x00;
const LIST_TAG: u8 = 0x01;

/// Error type for LMDB store operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStoreError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbStoreError> for mnemo_core::MnemoError {
    fn from(e: LmdbStoreError) -> Self {
        mnemo_core::MnemoError::Store(StoreError::Unavailable {
            reason: e.to_string(),
        })
    }
}

/// Persistent store backend over LMDB.
pub struct LmdbStore {
    env: Env,
    db: Database<Str, Bytes>,
}

impl LmdbStore {
    /// Open (or create) an LMDB store.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbStoreError> {
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbStoreError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let db: Database<Str, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        tracing::debug!(path = %path.as_ref().display(), "opened LMDB store");

        Ok(Self { env, db })
    }

    fn now_millis() -> u64 {
        Utc::now().timestamp_millis().max(0) as u64
    }

    fn deadline_millis(ttl: Duration) -> u64 {
        Self::now_millis().saturating_add(u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX))
    }

    fn encode_scalar(payload: &[u8], expires_at_ms: u64) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1 + 8 + payload.len());
        buf.push(SCALAR_TAG);
        buf.extend_from_slice(&expires_at_ms.to_be_bytes());
        buf.extend_from_slice(payload);
        buf
    }

    /// Split a scalar frame into `(expiry millis, payload)`.
    fn decode_scalar<'a>(key: &str, buf: &'a [u8]) -> Result<(u64, &'a [u8]), StoreError> {
        if buf.first() == Some(&LIST_TAG) {
            return Err(StoreError::WrongType {
                key: key.to_string(),
                expected: "scalar",
            });
        }
        if buf.len() < 9 || buf[0] != SCALAR_TAG {
            return Err(StoreError::Corrupt {
                key: key.to_string(),
                reason: "scalar frame too short or mistagged".to_string(),
            });
        }
        let mut expiry = [0u8; 8];
        expiry.copy_from_slice(&buf[1..9]);
        Ok((u64::from_be_bytes(expiry), &buf[9..]))
    }

    fn encode_list(entries: &[Vec<u8>]) -> Vec<u8> {
        let payload_len: usize = entries.iter().map(|e| 4 + e.len()).sum();
        let mut buf = Vec::with_capacity(1 + payload_len);
        buf.push(LIST_TAG);
        for entry in entries {
            buf.extend_from_slice(&(entry.len() as u32).to_be_bytes());
            buf.extend_from_slice(entry);
        }
        buf
    }

    fn decode_list(key: &str, buf: &[u8]) -> Result<Vec<Vec<u8>>, StoreError> {
        if buf.first() == Some(&SCALAR_TAG) {
            return Err(StoreError::WrongType {
                key: key.to_string(),
                expected: "list",
            });
        }
        if buf.first() != Some(&LIST_TAG) {
            return Err(StoreError::Corrupt {
                key: key.to_string(),
                reason: "unknown kind tag".to_string(),
            });
        }
        let mut entries = Vec::new();
        let mut offset = 1usize;
        while offset < buf.len() {
            if offset + 4 > buf.len() {
                return Err(StoreError::Corrupt {
                    key: key.to_string(),
                    reason: "truncated list frame header".to_string(),
                });
            }
            let mut len = [0u8; 4];
            len.copy_from_slice(&buf[offset..offset + 4]);
            let len = u32::from_be_bytes(len) as usize;
            offset += 4;
            if offset + len > buf.len() {
                return Err(StoreError::Corrupt {
                    key: key.to_string(),
                    reason: "truncated list entry".to_string(),
                });
            }
            entries.push(buf[offset..offset + len].to_vec());
            offset += len;
        }
        Ok(entries)
    }

    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, LmdbStoreError> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        let value = self
            .db
            .get(&rtxn, key)
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?
            .map(<[u8]>::to_vec);
        Ok(value)
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<(), LmdbStoreError> {
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        self.db
            .put(&mut wtxn, key, value)
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))
    }

    fn delete(&self, key: &str) -> Result<(), LmdbStoreError> {
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        self.db
            .delete(&mut wtxn, key)
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))
    }
}

#[async_trait]
impl KeyValueStore for LmdbStore {
    async fn get(&self, key: &str) -> MnemoResult<Option<Vec<u8>>> {
        let Some(buf) = self.read(key)? else {
            return Ok(None);
        };
        let (expires_at_ms, payload) = Self::decode_scalar(key, &buf)?;
        if expires_at_ms != 0 && expires_at_ms <= Self::now_millis() {
            self.delete(key)?;
            tracing::debug!(%key, "evicted expired entry");
            return Ok(None);
        }
        Ok(Some(payload.to_vec()))
    }

    async fn set(&self, key: &str, value: &[u8]) -> MnemoResult<()> {
        self.write(key, &Self::encode_scalar(value, 0))?;
        Ok(())
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> MnemoResult<()> {
        self.write(key, &Self::encode_scalar(value, Self::deadline_millis(ttl)))?;
        Ok(())
    }

    async fn incr(&self, key: &str) -> MnemoResult<u64> {
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let current = match self
            .db
            .get(&wtxn, key)
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?
        {
            None => 0,
            Some(buf) => {
                let (expires_at_ms, payload) = Self::decode_scalar(key, buf)?;
                if expires_at_ms != 0 && expires_at_ms <= Self::now_millis() {
                    0
                } else {
                    std::str::from_utf8(payload)
                        .ok()
                        .and_then(|s| s.parse::<u64>().ok())
                        .ok_or_else(|| StoreError::WrongType {
                            key: key.to_string(),
                            expected: "integer counter",
                        })?
                }
            }
        };

        let next = current + 1;
        self.db
            .put(
                &mut wtxn,
                key,
                &Self::encode_scalar(next.to_string().as_bytes(), 0),
            )
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        Ok(next)
    }

    async fn rpush(&self, key: &str, value: &[u8]) -> MnemoResult<()> {
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let mut entries = match self
            .db
            .get(&wtxn, key)
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?
        {
            None => Vec::new(),
            Some(buf) => Self::decode_list(key, buf)?,
        };
        entries.push(value.to_vec());

        self.db
            .put(&mut wtxn, key, &Self::encode_list(&entries))
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        Ok(())
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> MnemoResult<Vec<Vec<u8>>> {
        let Some(buf) = self.read(key)? else {
            return Ok(Vec::new());
        };
        let entries = Self::decode_list(key, &buf)?;
        Ok(match resolve_range(entries.len(), start, stop) {
            None => Vec::new(),
            Some((lo, hi)) => entries[lo..=hi].to_vec(),
        })
    }

    async fn flush_all(&self) -> MnemoResult<()> {
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        self.db
            .clear(&mut wtxn)
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        Ok(())
    }
}

impl std::fmt::Debug for LmdbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LmdbStore").finish_non_exhaustive()
    }
}
