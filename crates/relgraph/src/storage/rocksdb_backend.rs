//! RocksDB storage backend.
//!
//! Crash-safe persistent storage with write-ahead logging. Every engine
//! operation lands as one `WriteBatch`, so a crash never leaves half of a
//! transition on disk.

use super::{BatchOperation, KeyValue, StorageBackend};
use crate::error::{NetworkError, Result};
use log::info;
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use std::sync::Arc;

/// RocksDB-backed persistent storage.
#[derive(Clone)]
pub struct RocksDBBackend {
    db: Arc<DB>,
}

impl RocksDBBackend {
    /// Open or create a RocksDB database at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::StorageUnavailable`] if the database cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        Self::open_with_options(path, opts)
    }

    /// Open a RocksDB database with custom options.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::StorageUnavailable`] if the database cannot be opened.
    pub fn open_with_options<P: AsRef<Path>>(path: P, opts: Options) -> Result<Self> {
        info!("Opening RocksDB store at {:?}", path.as_ref());
        let db = DB::open(&opts, path.as_ref()).map_err(|e| {
            NetworkError::storage(
                format!("Failed to open RocksDB at {:?}", path.as_ref()),
                Some(e),
            )
        })?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Get the underlying RocksDB database handle.
    pub fn db(&self) -> &Arc<DB> {
        &self.db
    }
}

impl StorageBackend for RocksDBBackend {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.db
            .put(key, value)
            .map_err(|e| NetworkError::storage("Failed to put key-value pair", Some(e)))
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.db
            .get(key)
            .map_err(|e| NetworkError::storage("Failed to get value", Some(e)))
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.db
            .delete(key)
            .map_err(|e| NetworkError::storage("Failed to delete key", Some(e)))
    }

    fn exists(&self, key: &[u8]) -> Result<bool> {
        self.db
            .get_pinned(key)
            .map(|opt| opt.is_some())
            .map_err(|e| NetworkError::storage("Failed to check key existence", Some(e)))
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<KeyValue>> {
        let mut results = Vec::new();
        // No prefix extractor is configured, so seek and stop at the first foreign key.
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix, Direction::Forward));

        for item in iter {
            let (key, value) = item
                .map_err(|e| NetworkError::storage("Failed to iterate over prefix", Some(e)))?;

            if !key.starts_with(prefix) {
                break;
            }

            results.push((key.to_vec(), value.to_vec()));
        }

        Ok(results)
    }

    fn write_batch(&self, operations: Vec<BatchOperation>) -> Result<()> {
        let mut batch = WriteBatch::default();

        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    batch.put(&key, &value);
                }
                BatchOperation::Delete { key } => {
                    batch.delete(&key);
                }
            }
        }

        self.db
            .write(batch)
            .map_err(|e| NetworkError::storage("Failed to write batch", Some(e)))
    }

    fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| NetworkError::storage("Failed to flush database", Some(e)))
    }
}
