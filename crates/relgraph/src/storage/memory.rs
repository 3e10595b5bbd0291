//! In-memory storage backend.
//!
//! All data is lost when the last clone of the backend is dropped.

use super::{BatchOperation, KeyValue, StorageBackend};
use crate::error::Result;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// In-memory storage backend using a `BTreeMap`.
///
/// Clones share the same map, so a test can keep a handle for inspection
/// while the network owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    data: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl MemoryBackend {
    /// Create a new empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of key-value pairs stored.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Check if the backend is empty.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Clear all data from the backend.
    pub fn clear(&self) {
        self.data.write().clear();
    }
}

impl StorageBackend for MemoryBackend {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.data.write().remove(key);
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> Result<bool> {
        Ok(self.data.read().contains_key(key))
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<KeyValue>> {
        let data = self.data.read();
        let results: Vec<KeyValue> = data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(results)
    }

    fn write_batch(&self, operations: Vec<BatchOperation>) -> Result<()> {
        // One write guard for the whole batch, so readers never observe half of it.
        let mut data = self.data.write();
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    data.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}
