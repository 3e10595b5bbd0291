//! Error types for relationship graph operations.
//!
//! Every fallible operation returns [`Result<T>`]. Each variant is a distinct
//! error kind the API layer can map to a response; only [`NetworkError::Busy`]
//! and [`NetworkError::StorageUnavailable`] are worth retrying.

use crate::graph::RequestStatus;
use thiserror::Error;

/// Result type alias for relationship graph operations.
pub type Result<T> = std::result::Result<T, NetworkError>;

/// Error kinds surfaced by the engine, projector and ledger.
#[derive(Error, Debug)]
pub enum NetworkError {
    /// Both sides of the operation are the same user.
    #[error("A user cannot target themselves: {user}")]
    SelfRequest {
        /// The user on both sides
        user: String,
    },

    /// One side of the pair has blocked the other.
    #[error("Interaction between {a} and {b} is blocked")]
    Blocked {
        /// Acting user
        a: String,
        /// Other user
        b: String,
    },

    /// A pending request already exists for the pair.
    #[error("A connection request between {a} and {b} is already pending")]
    DuplicatePending {
        /// One side of the pair
        a: String,
        /// Other side of the pair
        b: String,
    },

    /// The pair is already connected.
    #[error("{a} and {b} are already connected")]
    AlreadyConnected {
        /// One side of the pair
        a: String,
        /// Other side of the pair
        b: String,
    },

    /// Entity missing, or not visible to the caller.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity (request, community, ...)
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// The request already left the pending state.
    #[error("Request {request_id} is already {status}")]
    AlreadyResolved {
        /// The resolved request
        request_id: String,
        /// Its current status
        status: RequestStatus,
    },

    /// The caller is not allowed to perform the operation.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Why the caller was refused
        message: String,
    },

    /// Lock contention on the key; retry later.
    #[error("Busy: could not lock {key} within {timeout_ms}ms")]
    Busy {
        /// The contended lock key
        key: String,
        /// Wait budget that was exhausted
        timeout_ms: u64,
    },

    /// Caller-supplied input was rejected.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// What was wrong
        message: String,
    },

    /// Storage backend error (RocksDB, file I/O, etc.)
    #[error("Storage unavailable: {message}")]
    StorageUnavailable {
        /// Detailed error message
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A stored record could not be encoded or decoded.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error details
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Engine configuration could not be loaded or is invalid.
    #[error("Config error: {message}")]
    Config {
        /// Error details
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl NetworkError {
    /// Create a storage error from a message and optional source.
    pub fn storage<E>(message: impl Into<String>, source: Option<E>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::StorageUnavailable {
            message: message.into(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }

    /// Create a serialization error from a message and optional source.
    pub fn serialization<E>(message: impl Into<String>, source: Option<E>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Serialization {
            message: message.into(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }

    /// Create a configuration error from a message and optional source.
    pub fn config<E>(message: impl Into<String>, source: Option<E>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Config {
            message: message.into(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }

    /// Whether a caller may retry the same input and expect a different outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy { .. } | Self::StorageUnavailable { .. })
    }
}
