//! Read-only projections over the edge store.
//!
//! Nothing here is cached or counted incrementally: every value is computed
//! from the records present at read time. If the store cannot be read the
//! projector returns the error instead of a stale or zeroed answer.

use crate::error::Result;
use crate::graph::{BlockRecord, ConnectionRequest, EdgeStore, FollowEdge};
use crate::identity::{PairKey, RequestId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Aggregate counts shown for a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkStats {
    /// Connected peers
    pub connections_count: usize,
    /// Users following this user
    pub followers_count: usize,
    /// Users this user follows
    pub following_count: usize,
    /// Pending requests addressed to this user
    pub pending_requests_count: usize,
    /// Pending requests sent by this user
    pub outgoing_requests_count: usize,
}

/// Follow relationship between a viewer and a target, from the viewer's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowStatus {
    /// Both directions exist
    Mutual,
    /// Only viewer → target
    Following,
    /// Only target → viewer
    FollowedBy,
    /// Neither direction
    NotFollowing,
}

impl FollowStatus {
    fn from_directions(viewer_follows: bool, target_follows: bool) -> Self {
        match (viewer_follows, target_follows) {
            (true, true) => FollowStatus::Mutual,
            (true, false) => FollowStatus::Following,
            (false, true) => FollowStatus::FollowedBy,
            (false, false) => FollowStatus::NotFollowing,
        }
    }
}

/// Connection dimension of a pair, from the viewer's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "request_id", rename_all = "snake_case")]
pub enum ConnectionState {
    /// No relationship
    None,
    /// Viewer sent a request that is still pending
    PendingOutgoing(RequestId),
    /// Target sent the viewer a request that is still pending
    PendingIncoming(RequestId),
    /// The pair is connected
    Connected,
    /// Viewer blocked the target
    BlockedByViewer,
    /// Target blocked the viewer
    BlockedByTarget,
}

/// Everything the UI needs to render the relationship with one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationshipView {
    /// Follow dimension
    pub follow: FollowStatus,
    /// Connection dimension
    pub connection: ConnectionState,
}

/// Stateless projector over an [`EdgeStore`].
#[derive(Clone)]
pub struct StatsProjector {
    store: EdgeStore,
}

impl StatsProjector {
    /// Build a projector reading from `store`.
    pub fn new(store: EdgeStore) -> Self {
        Self { store }
    }

    /// Current counts for `user`.
    pub fn network_stats(&self, user: &UserId) -> Result<NetworkStats> {
        let edges = self.store.edges_for(user)?;
        Ok(NetworkStats {
            connections_count: edges.connections.len(),
            followers_count: edges.followers.len(),
            following_count: edges.following.len(),
            pending_requests_count: edges.incoming.len(),
            outgoing_requests_count: edges.outgoing.len(),
        })
    }

    /// Follow status of `target` as seen by `viewer`.
    pub fn follow_status(&self, viewer: &UserId, target: &UserId) -> Result<FollowStatus> {
        if viewer == target {
            return Ok(FollowStatus::NotFollowing);
        }
        Ok(FollowStatus::from_directions(
            self.store.follow_exists(viewer, target)?,
            self.store.follow_exists(target, viewer)?,
        ))
    }

    /// Full relationship of `target` as seen by `viewer`.
    ///
    /// A user viewing themselves gets no relationship.
    pub fn relationship(&self, viewer: &UserId, target: &UserId) -> Result<RelationshipView> {
        let Ok(pair) = PairKey::new(viewer, target) else {
            return Ok(RelationshipView {
                follow: FollowStatus::NotFollowing,
                connection: ConnectionState::None,
            });
        };

        let connection = if let Some(block) = self.store.block(&pair)? {
            if &block.blocker == viewer {
                ConnectionState::BlockedByViewer
            } else {
                ConnectionState::BlockedByTarget
            }
        } else if self.store.connection(&pair)?.is_some() {
            ConnectionState::Connected
        } else if let Some(request) = self.store.pending_request_for(&pair)? {
            if &request.requester == viewer {
                ConnectionState::PendingOutgoing(request.id)
            } else {
                ConnectionState::PendingIncoming(request.id)
            }
        } else {
            ConnectionState::None
        };

        Ok(RelationshipView {
            follow: self.follow_status(viewer, target)?,
            connection,
        })
    }

    /// A request by id, visible only to its requester and recipient.
    pub fn request(&self, id: &RequestId, viewer: &UserId) -> Result<Option<ConnectionRequest>> {
        Ok(self
            .store
            .request(id)?
            .filter(|r| &r.requester == viewer || &r.recipient == viewer))
    }

    /// Users following `user`, oldest edge first.
    pub fn followers(&self, user: &UserId) -> Result<Vec<UserId>> {
        let mut edges = self.store.followers_of(user)?;
        edges.sort_by_key(|e| e.created_at);
        Ok(edges.into_iter().map(|e: FollowEdge| e.follower).collect())
    }

    /// Users `user` follows, oldest edge first.
    pub fn following(&self, user: &UserId) -> Result<Vec<UserId>> {
        let mut edges = self.store.following_of(user)?;
        edges.sort_by_key(|e| e.created_at);
        Ok(edges.into_iter().map(|e| e.followee).collect())
    }

    /// Users connected to `user`, oldest connection first.
    pub fn connections(&self, user: &UserId) -> Result<Vec<UserId>> {
        let mut edges = self.store.connections_of(user)?;
        edges.sort_by_key(|e| e.connected_at);
        Ok(edges
            .iter()
            .filter_map(|e| e.peer_of(user).cloned())
            .collect())
    }

    /// Pending requests addressed to `user`, newest first.
    pub fn incoming_requests(&self, user: &UserId) -> Result<Vec<ConnectionRequest>> {
        let mut requests = self.store.incoming_pending(user)?;
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    /// Pending requests sent by `user`, newest first.
    pub fn outgoing_requests(&self, user: &UserId) -> Result<Vec<ConnectionRequest>> {
        let mut requests = self.store.outgoing_pending(user)?;
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    /// Users connected to both `a` and `b`, sorted by id.
    pub fn mutual_connections(&self, a: &UserId, b: &UserId) -> Result<Vec<UserId>> {
        let of_a: HashSet<UserId> = self.connections(a)?.into_iter().collect();
        let mut shared: Vec<UserId> = self
            .connections(b)?
            .into_iter()
            .filter(|u| of_a.contains(u) && u != a && u != b)
            .collect();
        shared.sort();
        Ok(shared)
    }

    /// Blocks created by `user`.
    pub fn blocked_users(&self, user: &UserId) -> Result<Vec<BlockRecord>> {
        self.store.blocked_by(user)
    }
}
