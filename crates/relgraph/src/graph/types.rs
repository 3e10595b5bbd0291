//! Stored relationship records: follow edges, connection edges, requests and blocks.

use crate::identity::{PairKey, RequestId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Directed follow edge: `follower` follows `followee`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowEdge {
    /// User doing the following
    pub follower: UserId,
    /// User being followed
    pub followee: UserId,
    /// When the edge was first created
    pub created_at: DateTime<Utc>,
}

/// Undirected connection between two users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionEdge {
    /// The connected pair
    pub pair: PairKey,
    /// When the request was accepted
    pub connected_at: DateTime<Utc>,
    /// The accepted request that created this edge
    pub request_id: RequestId,
}

impl ConnectionEdge {
    /// The connected user seen from `user`'s side.
    pub fn peer_of(&self, user: &UserId) -> Option<&UserId> {
        self.pair.other(user)
    }
}

/// Lifecycle state of a connection request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Awaiting a response from the recipient
    Pending,
    /// Recipient accepted; the pair is connected
    Accepted,
    /// Recipient declined
    Rejected,
    /// Withdrawn by the requester, or voided by a block
    Cancelled,
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestStatus::Pending => write!(f, "pending"),
            RequestStatus::Accepted => write!(f, "accepted"),
            RequestStatus::Rejected => write!(f, "rejected"),
            RequestStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A recipient's answer to a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Connect the pair
    Accept,
    /// Decline without connecting
    Reject,
}

/// A connection request from `requester` to `recipient`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRequest {
    /// Unique identifier
    pub id: RequestId,
    /// Sender
    pub requester: UserId,
    /// Addressee; the only user allowed to respond
    pub recipient: UserId,
    /// Optional note attached by the sender
    pub message: Option<String>,
    /// Current lifecycle state
    pub status: RequestStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Time of the last status change
    pub updated_at: DateTime<Utc>,
}

impl ConnectionRequest {
    /// Create a new pending request.
    pub fn new(requester: UserId, recipient: UserId, message: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: RequestId::generate(),
            requester,
            recipient,
            message,
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the request still awaits a response.
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}

/// An active block on a pair. Only `blocker` may lift it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    /// User who initiated the block
    pub blocker: UserId,
    /// User who was blocked
    pub blocked: UserId,
    /// When the block was created
    pub created_at: DateTime<Utc>,
}
