//! Storage backend abstractions and implementations.
//!
//! The relationship graph only needs a key-value store with prefix scans and
//! atomic batches. This module defines that contract as [`StorageBackend`] and
//! ships two implementations:
//! - [`RocksDBBackend`]: persistent storage (feature `rocksdb-backend`)
//! - [`MemoryBackend`]: in-memory storage for tests and ephemeral use
//!
//! Backends take `&self` on every method. One backend is shared by lock-free
//! readers and by writers that are already serialized per pair, so each
//! implementation handles its own interior synchronization.

mod memory;
#[cfg(feature = "rocksdb-backend")]
mod rocksdb_backend;

pub use memory::MemoryBackend;
#[cfg(feature = "rocksdb-backend")]
pub use rocksdb_backend::RocksDBBackend;

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Key-value pair for storage operations.
pub type KeyValue = (Vec<u8>, Vec<u8>);

/// Trait defining the storage backend interface.
///
/// Implementations must make [`StorageBackend::write_batch`] all-or-nothing:
/// an engine operation that touches several records relies on it.
pub trait StorageBackend: Send + Sync {
    /// Store a key-value pair.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::StorageUnavailable`](crate::NetworkError::StorageUnavailable)
    /// if the write fails.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Retrieve a value by key. Returns `Ok(None)` if the key doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::StorageUnavailable`](crate::NetworkError::StorageUnavailable)
    /// if the read fails.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Delete a key-value pair. Does not error if the key doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::StorageUnavailable`](crate::NetworkError::StorageUnavailable)
    /// if the delete fails.
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Check if a key exists.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::StorageUnavailable`](crate::NetworkError::StorageUnavailable)
    /// if the check fails.
    fn exists(&self, key: &[u8]) -> Result<bool>;

    /// Collect all key-value pairs whose keys start with `prefix`, in key order.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::StorageUnavailable`](crate::NetworkError::StorageUnavailable)
    /// if iteration fails.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<KeyValue>>;

    /// Execute a batch of write operations atomically.
    ///
    /// Either all operations succeed or none do.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::StorageUnavailable`](crate::NetworkError::StorageUnavailable)
    /// if the batch cannot be applied.
    fn write_batch(&self, operations: Vec<BatchOperation>) -> Result<()>;

    /// Flush any buffered writes to durable storage.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::StorageUnavailable`](crate::NetworkError::StorageUnavailable)
    /// if flush fails.
    fn flush(&self) -> Result<()>;
}

/// Batch write operation for atomic updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchOperation {
    /// Put a key-value pair
    Put {
        /// Key to write
        key: Vec<u8>,
        /// Value to write
        value: Vec<u8>,
    },
    /// Delete a key
    Delete {
        /// Key to delete
        key: Vec<u8>,
    },
}

impl BatchOperation {
    /// The key this operation writes or deletes.
    pub fn key(&self) -> &[u8] {
        match self {
            BatchOperation::Put { key, .. } | BatchOperation::Delete { key } => key,
        }
    }
}
