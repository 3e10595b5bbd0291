//! Keyed mutual exclusion for writers.
//!
//! Mutations on one unordered pair (or one (user, community) key) must not
//! interleave. [`KeyedLocks`] hashes each key onto a fixed array of mutexes.
//! Two unrelated keys only contend when they land on the same shard, and
//! acquisition gives up after a bounded wait instead of hanging.

use crate::error::{NetworkError, Result};
use log::{trace, warn};
use parking_lot::{Mutex, MutexGuard};
use std::collections::hash_map::DefaultHasher;
use std::fmt::Display;
use std::hash::{Hash, Hasher};
use std::time::Duration;

/// Sharded lock manager keyed by any hashable value.
#[derive(Debug)]
pub struct KeyedLocks {
    shards: Box<[Mutex<()>]>,
    timeout: Duration,
}

/// Held lock; released on drop.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct KeyGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl KeyedLocks {
    /// Create a manager with `shards` mutexes (at least one) and a wait budget.
    pub fn new(shards: usize, timeout: Duration) -> Self {
        let shards = (0..shards.max(1)).map(|_| Mutex::new(())).collect();
        Self { shards, timeout }
    }

    /// Number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Configured wait budget.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn shard_for<K: Hash>(&self, key: &K) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.shards.len() as u64) as usize
    }

    /// Lock `key`, waiting at most the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Busy`] if the shard stays held past the timeout.
    pub fn acquire<K: Hash + Display>(&self, key: &K) -> Result<KeyGuard<'_>> {
        let shard = self.shard_for(key);
        match self.shards[shard].try_lock_for(self.timeout) {
            Some(guard) => {
                trace!("Acquired lock shard {shard} for {key}");
                Ok(KeyGuard { _guard: guard })
            }
            None => {
                let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
                warn!("Lock for {key} not acquired within {timeout_ms}ms");
                Err(NetworkError::Busy {
                    key: key.to_string(),
                    timeout_ms,
                })
            }
        }
    }
}
