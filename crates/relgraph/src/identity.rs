//! Identifiers for users, communities and requests, plus the unordered pair key.

use crate::error::{NetworkError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque user identifier.
///
/// Any non-empty string is accepted. Ordering exists only so a pair can be
/// put into canonical order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Create a user id.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::InvalidInput`] for an empty id.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(NetworkError::InvalidInput {
                message: "user id must not be empty".to_string(),
            });
        }
        Ok(Self(id))
    }

    /// The raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier of a community.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommunityId(Uuid);

impl CommunityId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for CommunityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a connection request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Unordered pair {A, B} of distinct users, stored as `(low, high)`.
///
/// This is the unit of mutual exclusion for connection state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairKey {
    low: UserId,
    high: UserId,
}

impl PairKey {
    /// Build the canonical pair for two users.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::SelfRequest`] when `a == b`.
    pub fn new(a: &UserId, b: &UserId) -> Result<Self> {
        match a.cmp(b) {
            std::cmp::Ordering::Less => Ok(Self {
                low: a.clone(),
                high: b.clone(),
            }),
            std::cmp::Ordering::Greater => Ok(Self {
                low: b.clone(),
                high: a.clone(),
            }),
            std::cmp::Ordering::Equal => Err(NetworkError::SelfRequest {
                user: a.to_string(),
            }),
        }
    }

    /// Lower user of the pair.
    pub fn low(&self) -> &UserId {
        &self.low
    }

    /// Higher user of the pair.
    pub fn high(&self) -> &UserId {
        &self.high
    }

    /// Whether `user` is one of the two sides.
    pub fn contains(&self, user: &UserId) -> bool {
        &self.low == user || &self.high == user
    }

    /// The side that is not `user`, if `user` belongs to the pair.
    pub fn other(&self, user: &UserId) -> Option<&UserId> {
        if &self.low == user {
            Some(&self.high)
        } else if &self.high == user {
            Some(&self.low)
        } else {
            None
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}, {}}}", self.low, self.high)
    }
}
