//! Session Storage
//!
//! A small string key/value store scoped to one user session, the durable
//! home of the conversation snapshot and the preferences object.
//!
//! # Backends
//!
//! - [`MemoryStorage`]: process memory, with an optional byte quota
//! - [`FileStorage`]: one directory per session, one file per key
//!
//! Callers treat every storage error as recoverable: reads fall back to
//! defaults and writes are best-effort.

mod file;
mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Errors from a storage backend
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying I/O failed
    #[error("Storage I/O failed for key '{key}': {source}")]
    Io {
        /// Key being read or written
        key: String,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Writing would exceed the backend's quota
    #[error("Storage quota exceeded writing '{key}' ({needed} bytes, limit {limit})")]
    QuotaExceeded {
        /// Key being written
        key: String,
        /// Bytes the store would hold after the write
        needed: usize,
        /// Configured quota
        limit: usize,
    },

    /// Key contains characters the backend cannot store
    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),
}

/// Session-scoped key/value store
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Read a value; `Ok(None)` when absent
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a value; deleting a missing key is not an error
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}
