//! Content-hash skip cache, gated by the configuration signature.
//!
//! The cache maps each file path to the content hash recorded after its
//! last processing. A file whose current content hash matches the recorded
//! one is skipped entirely on the next run — but only while the persisted
//! [`ConfigSignature`] equals the active one; a signature mismatch discards
//! the whole record.

pub mod signature;

pub use signature::{ConfigSignature, RuleSignature};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::tokens::code_hash;

/// Persisted cache record: the signature that produced the hashes plus the
/// per-file content hashes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub signature: ConfigSignature,
    pub hashes: BTreeMap<String, String>,
}

impl CacheRecord {
    pub fn new(signature: ConfigSignature) -> Self {
        Self { signature, hashes: BTreeMap::new() }
    }

    pub fn get_file_hash(&self, path: &str) -> Option<&str> {
        self.hashes.get(path).map(String::as_str)
    }

    pub fn set_file_hash(&mut self, path: impl Into<String>, hash: impl Into<String>) {
        self.hashes.insert(path.into(), hash.into());
    }
}

/// Storage collaborator for the cache record. Persistence format and
/// location are the caller's concern; the engine only needs read and write.
pub trait CacheStorage: Send {
    fn read(&self) -> Result<Option<CacheRecord>>;
    fn write(&self, record: &CacheRecord) -> Result<()>;
}

/// JSON-file-backed cache storage.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CacheStorage for FileStorage {
    fn read(&self) -> Result<Option<CacheRecord>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return Ok(None),
        };
        // An unreadable or corrupt cache is treated as absent, never as an
        // error: the run just starts cold.
        Ok(serde_json::from_str(&raw).ok())
    }

    fn write(&self, record: &CacheRecord) -> Result<()> {
        let encoded = serde_json::to_string(record)?;
        std::fs::write(&self.path, encoded)
            .with_context(|| format!("failed to write cache file {}", self.path.display()))
    }
}

/// Decides whether files still need fixing based on cached content hashes.
pub trait CacheManager: Send {
    /// Whether `content` for `path` differs from what the last run
    /// recorded.
    fn needs_fixing(&mut self, path: &str, content: &str) -> bool;

    /// Record the final content hash for `path`.
    fn set_file_hash(&mut self, path: &str, hash: &str);
}

/// Cache manager that never skips and never persists.
#[derive(Debug, Default, Clone)]
pub struct NullCacheManager;

impl CacheManager for NullCacheManager {
    fn needs_fixing(&mut self, _path: &str, _content: &str) -> bool {
        true
    }

    fn set_file_hash(&mut self, _path: &str, _hash: &str) {}
}

/// Signature-gated cache manager.
///
/// On construction the persisted record is loaded and kept only if its
/// signature equals the active one; otherwise the run starts with a fresh
/// record. The record is written back when the manager is dropped.
pub struct FileCacheManager {
    record: CacheRecord,
    storage: Box<dyn CacheStorage>,
}

impl FileCacheManager {
    pub fn new(storage: Box<dyn CacheStorage>, signature: ConfigSignature) -> Self {
        let record = match storage.read() {
            Ok(Some(record)) if record.signature == signature => record,
            _ => CacheRecord::new(signature),
        };
        Self { record, storage }
    }
}

impl CacheManager for FileCacheManager {
    fn needs_fixing(&mut self, path: &str, content: &str) -> bool {
        self.record.get_file_hash(path) != Some(code_hash(content).as_str())
    }

    fn set_file_hash(&mut self, path: &str, hash: &str) {
        self.record.set_file_hash(path, hash);
    }
}

impl Drop for FileCacheManager {
    fn drop(&mut self) {
        if let Err(error) = self.storage.write(&self.record) {
            tracing::warn!(%error, "failed to persist cache record");
        }
    }
}
