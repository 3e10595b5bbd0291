//! Engine configuration.
//!
//! Loaded from JSON; every field has a default so an empty object is valid.

use crate::error::{NetworkError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tunables for the engine, the lock manager and request validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How long a writer waits for a pair lock before failing with `Busy`.
    pub lock_timeout_ms: u64,
    /// Number of lock shards.
    pub lock_shards: usize,
    /// Maximum length of a connection request message, in characters.
    pub max_message_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 250,
            lock_shards: 64,
            max_message_len: 500,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Config`] on malformed JSON or invalid values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| NetworkError::config("Failed to parse engine config", Some(e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Config`] if the file cannot be read or is invalid.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            NetworkError::config(
                format!("Failed to read engine config {:?}", path.as_ref()),
                Some(e),
            )
        })?;
        Self::from_json_str(&contents)
    }

    /// Reject values the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Config`] for zero shards or a zero lock timeout.
    pub fn validate(&self) -> Result<()> {
        if self.lock_shards == 0 {
            return Err(NetworkError::config(
                "lock_shards must be at least 1",
                None::<std::io::Error>,
            ));
        }
        if self.lock_timeout_ms == 0 {
            return Err(NetworkError::config(
                "lock_timeout_ms must be positive",
                None::<std::io::Error>,
            ));
        }
        Ok(())
    }

    /// Lock wait budget as a `Duration`.
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}
