//! Edge store: authoritative records on top of a [`StorageBackend`].
//!
//! Reads go straight to the backend and are never cached. Writes are collected
//! in an [`EdgeBatch`] and applied with a single atomic `write_batch`, so an
//! engine operation either lands completely or not at all.
//!
//! The store enforces exactly one rule itself: a pair can hold at most one
//! pending request. Everything else (blocks, authorization, self checks) is
//! the engine's job.

use super::keys;
use super::types::{BlockRecord, ConnectionEdge, ConnectionRequest, FollowEdge, RequestStatus};
use crate::community::{Community, Membership};
use crate::error::{NetworkError, Result};
use crate::identity::{CommunityId, PairKey, RequestId, UserId};
use crate::storage::{BatchOperation, StorageBackend};
use chrono::Utc;
use log::trace;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

fn encode<T: Serialize>(what: &str, value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| NetworkError::serialization(format!("Failed to serialize {what}"), Some(e)))
}

fn decode<T: DeserializeOwned>(what: &str, bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| NetworkError::serialization(format!("Failed to deserialize {what}"), Some(e)))
}

/// Every record incident to one user, read in one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncidentEdges {
    /// Edges where the user is the follower
    pub following: Vec<FollowEdge>,
    /// Edges where the user is the followee
    pub followers: Vec<FollowEdge>,
    /// Connections the user is part of
    pub connections: Vec<ConnectionEdge>,
    /// Pending requests addressed to the user
    pub incoming: Vec<ConnectionRequest>,
    /// Pending requests sent by the user
    pub outgoing: Vec<ConnectionRequest>,
}

/// Authoritative storage for relationship and membership records.
#[derive(Clone)]
pub struct EdgeStore {
    backend: Arc<dyn StorageBackend>,
}

impl EdgeStore {
    /// Wrap a backend.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Start collecting an atomic set of writes.
    pub fn batch(&self) -> EdgeBatch<'_> {
        EdgeBatch {
            store: self,
            operations: Vec::new(),
            claimed_pending: HashSet::new(),
            released_pending: HashSet::new(),
        }
    }

    /// Flush the backend.
    pub fn flush(&self) -> Result<()> {
        self.backend.flush()
    }

    fn read<T: DeserializeOwned>(&self, what: &str, key: &[u8]) -> Result<Option<T>> {
        self.backend
            .get(key)?
            .map(|bytes| decode(what, &bytes))
            .transpose()
    }

    fn scan<T: DeserializeOwned>(&self, what: &str, prefix: &[u8]) -> Result<Vec<T>> {
        self.backend
            .scan_prefix(prefix)?
            .iter()
            .map(|(_, value)| decode(what, value))
            .collect()
    }

    // ===== Point reads =====

    /// Whether `follower` currently follows `followee`.
    pub fn follow_exists(&self, follower: &UserId, followee: &UserId) -> Result<bool> {
        self.backend.exists(&keys::follow_out(follower, followee))
    }

    /// The follow edge `follower → followee`, if present.
    pub fn follow(&self, follower: &UserId, followee: &UserId) -> Result<Option<FollowEdge>> {
        self.read("follow edge", &keys::follow_out(follower, followee))
    }

    /// The connection edge of a pair, if connected.
    pub fn connection(&self, pair: &PairKey) -> Result<Option<ConnectionEdge>> {
        self.read("connection edge", &keys::connection(pair.low(), pair.high()))
    }

    /// The active block on a pair, if any.
    pub fn block(&self, pair: &PairKey) -> Result<Option<BlockRecord>> {
        self.read("block record", &keys::block(pair))
    }

    /// A request by id, in any status.
    pub fn request(&self, id: &RequestId) -> Result<Option<ConnectionRequest>> {
        self.read("connection request", &keys::request(id))
    }

    /// The pending request of a pair, if any.
    pub fn pending_request_for(&self, pair: &PairKey) -> Result<Option<ConnectionRequest>> {
        let Some(id) = self.read::<RequestId>("pending slot", &keys::pending(pair))? else {
            return Ok(None);
        };
        self.indexed_request(&id).map(Some)
    }

    fn indexed_request(&self, id: &RequestId) -> Result<ConnectionRequest> {
        self.request(id)?.ok_or_else(|| {
            NetworkError::storage(
                format!("Pending index references missing request {id}"),
                None::<std::io::Error>,
            )
        })
    }

    // ===== Scans =====

    /// Users `user` follows, as edges.
    pub fn following_of(&self, user: &UserId) -> Result<Vec<FollowEdge>> {
        self.scan("follow edge", &keys::follow_out_prefix(user))
    }

    /// Users following `user`, as edges.
    pub fn followers_of(&self, user: &UserId) -> Result<Vec<FollowEdge>> {
        self.scan("follow edge", &keys::follow_in_prefix(user))
    }

    /// Connections of `user`.
    pub fn connections_of(&self, user: &UserId) -> Result<Vec<ConnectionEdge>> {
        self.scan("connection edge", &keys::connection_prefix(user))
    }

    /// Pending requests addressed to `user`.
    pub fn incoming_pending(&self, user: &UserId) -> Result<Vec<ConnectionRequest>> {
        self.pending_from_index(&keys::inbox_prefix(user))
    }

    /// Pending requests sent by `user`.
    pub fn outgoing_pending(&self, user: &UserId) -> Result<Vec<ConnectionRequest>> {
        self.pending_from_index(&keys::outbox_prefix(user))
    }

    fn pending_from_index(&self, prefix: &[u8]) -> Result<Vec<ConnectionRequest>> {
        let ids: Vec<RequestId> = self.scan("request index", prefix)?;
        let mut requests = Vec::with_capacity(ids.len());
        for id in ids {
            let request = self.indexed_request(&id)?;
            if request.is_pending() {
                requests.push(request);
            }
        }
        Ok(requests)
    }

    /// Blocks initiated by `blocker`.
    pub fn blocked_by(&self, blocker: &UserId) -> Result<Vec<BlockRecord>> {
        self.scan("block record", &keys::blocked_by_prefix(blocker))
    }

    /// Every edge and pending request incident to `user`.
    pub fn edges_for(&self, user: &UserId) -> Result<IncidentEdges> {
        Ok(IncidentEdges {
            following: self.following_of(user)?,
            followers: self.followers_of(user)?,
            connections: self.connections_of(user)?,
            incoming: self.incoming_pending(user)?,
            outgoing: self.outgoing_pending(user)?,
        })
    }

    // ===== Community records =====

    /// A community by id.
    pub fn community(&self, id: &CommunityId) -> Result<Option<Community>> {
        self.read("community", &keys::community(id))
    }

    /// A single membership record.
    pub fn membership(&self, community: &CommunityId, user: &UserId) -> Result<Option<Membership>> {
        self.read("membership", &keys::membership(community, user))
    }

    /// Every membership record of a community, pending ones included.
    pub fn memberships_of_community(&self, community: &CommunityId) -> Result<Vec<Membership>> {
        self.scan("membership", &keys::membership_prefix(community))
    }

    /// Every membership record held by a user.
    pub fn memberships_of_user(&self, user: &UserId) -> Result<Vec<Membership>> {
        self.scan("membership", &keys::membership_of_prefix(user))
    }
}

/// Pending writes against an [`EdgeStore`], applied by [`EdgeBatch::commit`].
///
/// Nothing reaches the backend before `commit`; dropping the batch discards it.
pub struct EdgeBatch<'a> {
    store: &'a EdgeStore,
    operations: Vec<BatchOperation>,
    claimed_pending: HashSet<Vec<u8>>,
    released_pending: HashSet<Vec<u8>>,
}

impl EdgeBatch<'_> {
    fn put<T: Serialize>(&mut self, what: &str, key: Vec<u8>, value: &T) -> Result<()> {
        let value = encode(what, value)?;
        self.operations.push(BatchOperation::Put { key, value });
        Ok(())
    }

    fn delete(&mut self, key: Vec<u8>) {
        self.operations.push(BatchOperation::Delete { key });
    }

    /// Create or overwrite a follow edge.
    pub fn upsert_follow(&mut self, edge: &FollowEdge) -> Result<()> {
        self.put(
            "follow edge",
            keys::follow_out(&edge.follower, &edge.followee),
            edge,
        )?;
        self.put(
            "follow edge",
            keys::follow_in(&edge.followee, &edge.follower),
            edge,
        )
    }

    /// Delete a follow edge; a missing edge is a no-op.
    pub fn delete_follow(&mut self, follower: &UserId, followee: &UserId) {
        self.delete(keys::follow_out(follower, followee));
        self.delete(keys::follow_in(followee, follower));
    }

    /// Create or overwrite the connection edge of its pair.
    pub fn upsert_connection(&mut self, edge: &ConnectionEdge) -> Result<()> {
        let (low, high) = (edge.pair.low(), edge.pair.high());
        self.put("connection edge", keys::connection(low, high), edge)?;
        self.put("connection edge", keys::connection(high, low), edge)
    }

    /// Delete the connection edge of a pair; a missing edge is a no-op.
    pub fn delete_connection(&mut self, pair: &PairKey) {
        self.delete(keys::connection(pair.low(), pair.high()));
        self.delete(keys::connection(pair.high(), pair.low()));
    }

    /// Insert a new pending request.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::DuplicatePending`] if the pair already has a
    /// pending request, stored or claimed earlier in this batch.
    pub fn insert_request(&mut self, request: &ConnectionRequest) -> Result<()> {
        let pair = PairKey::new(&request.requester, &request.recipient)?;
        let slot = keys::pending(&pair);

        let stored = self.store.backend.exists(&slot)? && !self.released_pending.contains(&slot);
        if stored || self.claimed_pending.contains(&slot) {
            return Err(NetworkError::DuplicatePending {
                a: request.requester.to_string(),
                b: request.recipient.to_string(),
            });
        }

        self.put("connection request", keys::request(&request.id), request)?;
        self.put("pending slot", slot.clone(), &request.id)?;
        self.put(
            "request index",
            keys::inbox(&request.recipient, &request.id),
            &request.id,
        )?;
        self.put(
            "request index",
            keys::outbox(&request.requester, &request.id),
            &request.id,
        )?;
        self.released_pending.remove(&slot);
        self.claimed_pending.insert(slot);
        Ok(())
    }

    /// Move a request to `status`, returning the updated record.
    ///
    /// Leaving `Pending` frees the pair's pending slot and drops the request
    /// from both pending indexes.
    pub fn update_request_status(
        &mut self,
        request: &ConnectionRequest,
        status: RequestStatus,
    ) -> Result<ConnectionRequest> {
        let mut updated = request.clone();
        updated.status = status;
        updated.updated_at = Utc::now();
        self.put("connection request", keys::request(&updated.id), &updated)?;

        if request.is_pending() && status != RequestStatus::Pending {
            let pair = PairKey::new(&request.requester, &request.recipient)?;
            let slot = keys::pending(&pair);
            self.delete(slot.clone());
            self.delete(keys::inbox(&request.recipient, &request.id));
            self.delete(keys::outbox(&request.requester, &request.id));
            self.claimed_pending.remove(&slot);
            self.released_pending.insert(slot);
        }
        Ok(updated)
    }

    /// Record a block on a pair.
    pub fn put_block(&mut self, pair: &PairKey, record: &BlockRecord) -> Result<()> {
        self.put("block record", keys::block(pair), record)?;
        self.put(
            "block record",
            keys::blocked_by(&record.blocker, &record.blocked),
            record,
        )
    }

    /// Lift a block.
    pub fn delete_block(&mut self, pair: &PairKey, record: &BlockRecord) {
        self.delete(keys::block(pair));
        self.delete(keys::blocked_by(&record.blocker, &record.blocked));
    }

    /// Create or overwrite a community record.
    pub fn put_community(&mut self, community: &Community) -> Result<()> {
        self.put("community", keys::community(&community.id), community)
    }

    /// Create or overwrite a membership record.
    pub fn put_membership(&mut self, membership: &Membership) -> Result<()> {
        self.put(
            "membership",
            keys::membership(&membership.community, &membership.user),
            membership,
        )?;
        self.put(
            "membership",
            keys::membership_of(&membership.user, &membership.community),
            membership,
        )
    }

    /// Delete a membership record; a missing record is a no-op.
    pub fn delete_membership(&mut self, community: &CommunityId, user: &UserId) {
        self.delete(keys::membership(community, user));
        self.delete(keys::membership_of(user, community));
    }

    /// Number of collected backend operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether nothing has been collected.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Apply every collected write atomically.
    pub fn commit(self) -> Result<()> {
        if self.operations.is_empty() {
            return Ok(());
        }
        let count = self.operations.len();
        self.store.backend.write_batch(self.operations)?;
        trace!("Committed batch of {count} operations");
        Ok(())
    }
}
