//! The relationship state machine.
//!
//! Per unordered pair {A, B} the connection dimension moves through
//!
//! ```text
//! none --send(A→B)--> pending(A→B)
//! pending(A→B) --accept(B)--> connected
//! pending(A→B) --reject(B)--> none
//! pending(A→B) --cancel(A)--> none
//! connected --remove(either)--> none
//! any --block(either)--> blocked      (follow edges cleared, pending cancelled)
//! blocked --unblock(blocker)--> none
//! ```
//!
//! The follow dimension is independent and has no approval step, but a block
//! forbids it as well.
//!
//! Every mutating operation takes the pair lock, validates against the stored
//! state, collects its writes into one batch, commits, and only then publishes
//! events. A failed check returns before anything is written.

use super::store::EdgeStore;
use super::types::{
    BlockRecord, ConnectionEdge, ConnectionRequest, Decision, FollowEdge, RequestStatus,
};
use crate::config::EngineConfig;
use crate::error::{NetworkError, Result};
use crate::events::{EventBus, NetworkEvent};
use crate::identity::{PairKey, RequestId, UserId};
use crate::locks::{KeyGuard, KeyedLocks};
use chrono::Utc;
use log::debug;
use std::sync::Arc;

/// Applies relationship transitions to an [`EdgeStore`].
#[derive(Clone)]
pub struct RelationshipEngine {
    store: EdgeStore,
    locks: Arc<KeyedLocks>,
    events: Arc<EventBus>,
    max_message_len: usize,
}

impl RelationshipEngine {
    /// Build an engine over shared components.
    pub fn new(
        store: EdgeStore,
        locks: Arc<KeyedLocks>,
        events: Arc<EventBus>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            store,
            locks,
            events,
            max_message_len: config.max_message_len,
        }
    }

    fn lock(&self, pair: &PairKey) -> Result<KeyGuard<'_>> {
        self.locks.acquire(pair)
    }

    fn ensure_not_blocked(&self, pair: &PairKey, actor: &UserId) -> Result<()> {
        if self.store.block(pair)?.is_some() {
            debug!("Refusing interaction on blocked pair {pair}");
            let other = pair.other(actor).unwrap_or(actor);
            return Err(NetworkError::Blocked {
                a: actor.to_string(),
                b: other.to_string(),
            });
        }
        Ok(())
    }

    fn normalize_message(&self, message: Option<&str>) -> Result<Option<String>> {
        let Some(message) = message.map(str::trim).filter(|m| !m.is_empty()) else {
            return Ok(None);
        };
        let len = message.chars().count();
        if len > self.max_message_len {
            return Err(NetworkError::InvalidInput {
                message: format!(
                    "request message is {len} characters, limit is {}",
                    self.max_message_len
                ),
            });
        }
        Ok(Some(message.to_string()))
    }

    // ===== Connection dimension =====

    /// Send a connection request from `from` to `to`.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::SelfRequest`] if `from == to`
    /// - [`NetworkError::InvalidInput`] if the message is too long
    /// - [`NetworkError::Blocked`] if either side has blocked the other
    /// - [`NetworkError::AlreadyConnected`] if the pair is connected
    /// - [`NetworkError::DuplicatePending`] if the pair already has a pending request
    pub fn send_connection_request(
        &self,
        from: &UserId,
        to: &UserId,
        message: Option<&str>,
    ) -> Result<RequestId> {
        debug!("Connection request: from={from}, to={to}");
        let pair = PairKey::new(from, to)?;
        let message = self.normalize_message(message)?;

        let guard = self.lock(&pair)?;
        self.ensure_not_blocked(&pair, from)?;
        if self.store.connection(&pair)?.is_some() {
            return Err(NetworkError::AlreadyConnected {
                a: from.to_string(),
                b: to.to_string(),
            });
        }

        let request = ConnectionRequest::new(from.clone(), to.clone(), message);
        let mut batch = self.store.batch();
        batch.insert_request(&request)?;
        batch.commit()?;
        drop(guard);

        self.events.publish(NetworkEvent::RequestSent {
            request_id: request.id,
            from: request.requester,
            to: request.recipient,
        });
        Ok(request.id)
    }

    /// Load a request and check it is visible to `actor` through `is_party`.
    fn request_for(
        &self,
        id: &RequestId,
        actor: &UserId,
        is_party: impl Fn(&ConnectionRequest) -> bool,
    ) -> Result<ConnectionRequest> {
        match self.store.request(id)? {
            Some(request) if is_party(&request) => Ok(request),
            _ => Err(NetworkError::NotFound {
                entity: "request",
                id: format!("{id} for {actor}"),
            }),
        }
    }

    /// Lock the request's pair and re-read it, so the status check below
    /// sees every transition that committed before the lock was granted.
    fn lock_request(
        &self,
        id: &RequestId,
        actor: &UserId,
        is_party: impl Fn(&ConnectionRequest) -> bool + Copy,
    ) -> Result<(KeyGuard<'_>, PairKey, ConnectionRequest)> {
        let request = self.request_for(id, actor, is_party)?;
        let pair = PairKey::new(&request.requester, &request.recipient)?;
        let guard = self.lock(&pair)?;
        let request = self.request_for(id, actor, is_party)?;
        if !request.is_pending() {
            return Err(NetworkError::AlreadyResolved {
                request_id: id.to_string(),
                status: request.status,
            });
        }
        Ok((guard, pair, request))
    }

    /// Accept or reject a pending request addressed to `responder`.
    ///
    /// Accepting always connects the pair.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::NotFound`] if the request is unknown or not addressed to `responder`
    /// - [`NetworkError::AlreadyResolved`] if it is no longer pending
    pub fn respond_to_request(
        &self,
        id: &RequestId,
        decision: Decision,
        responder: &UserId,
    ) -> Result<ConnectionRequest> {
        debug!("Responding to request: id={id}, decision={decision:?}, responder={responder}");
        let (guard, pair, request) =
            self.lock_request(id, responder, |r| &r.recipient == responder)?;

        let mut batch = self.store.batch();
        let updated = match decision {
            Decision::Accept => {
                self.ensure_not_blocked(&pair, responder)?;
                let updated = batch.update_request_status(&request, RequestStatus::Accepted)?;
                batch.upsert_connection(&ConnectionEdge {
                    pair,
                    connected_at: updated.updated_at,
                    request_id: updated.id,
                })?;
                updated
            }
            Decision::Reject => batch.update_request_status(&request, RequestStatus::Rejected)?,
        };
        batch.commit()?;
        drop(guard);

        let (request_id, requester, recipient) =
            (updated.id, updated.requester.clone(), updated.recipient.clone());
        self.events.publish(match decision {
            Decision::Accept => NetworkEvent::RequestAccepted {
                request_id,
                requester,
                recipient,
            },
            Decision::Reject => NetworkEvent::RequestRejected {
                request_id,
                requester,
                recipient,
            },
        });
        Ok(updated)
    }

    /// Withdraw a pending request sent by `requester`.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::NotFound`] if the request is unknown or not sent by `requester`
    /// - [`NetworkError::AlreadyResolved`] if it is no longer pending
    pub fn cancel_connection_request(
        &self,
        id: &RequestId,
        requester: &UserId,
    ) -> Result<ConnectionRequest> {
        debug!("Cancelling request: id={id}, requester={requester}");
        let (guard, _pair, request) =
            self.lock_request(id, requester, |r| &r.requester == requester)?;

        let mut batch = self.store.batch();
        let updated = batch.update_request_status(&request, RequestStatus::Cancelled)?;
        batch.commit()?;
        drop(guard);

        self.events.publish(NetworkEvent::RequestCancelled {
            request_id: updated.id,
            requester: updated.requester.clone(),
            recipient: updated.recipient.clone(),
        });
        Ok(updated)
    }

    /// Remove the connection between `a` and `b`. Idempotent; follow edges stay.
    ///
    /// # Errors
    ///
    /// [`NetworkError::SelfRequest`] if `a == b`, plus lock and storage failures.
    pub fn remove_connection(&self, a: &UserId, b: &UserId) -> Result<()> {
        debug!("Removing connection: {a} - {b}");
        let pair = PairKey::new(a, b)?;
        let guard = self.lock(&pair)?;
        if self.store.connection(&pair)?.is_none() {
            return Ok(());
        }

        let mut batch = self.store.batch();
        batch.delete_connection(&pair);
        batch.commit()?;
        drop(guard);

        self.events.publish(NetworkEvent::ConnectionRemoved {
            by: a.clone(),
            peer: b.clone(),
        });
        Ok(())
    }

    // ===== Follow dimension =====

    /// Make `follower` follow `followee`. Idempotent.
    ///
    /// # Errors
    ///
    /// [`NetworkError::SelfRequest`] for a self-follow, [`NetworkError::Blocked`]
    /// if either side has blocked the other.
    pub fn follow(&self, follower: &UserId, followee: &UserId) -> Result<()> {
        debug!("Follow: {follower} -> {followee}");
        let pair = PairKey::new(follower, followee)?;
        let guard = self.lock(&pair)?;
        self.ensure_not_blocked(&pair, follower)?;
        if self.store.follow_exists(follower, followee)? {
            return Ok(());
        }

        let mut batch = self.store.batch();
        batch.upsert_follow(&FollowEdge {
            follower: follower.clone(),
            followee: followee.clone(),
            created_at: Utc::now(),
        })?;
        batch.commit()?;
        drop(guard);

        self.events.publish(NetworkEvent::UserFollowed {
            follower: follower.clone(),
            followee: followee.clone(),
        });
        Ok(())
    }

    /// Remove the follow edge `follower → followee`. Idempotent.
    ///
    /// # Errors
    ///
    /// [`NetworkError::SelfRequest`] if both ids are equal, plus lock and storage failures.
    pub fn unfollow(&self, follower: &UserId, followee: &UserId) -> Result<()> {
        debug!("Unfollow: {follower} -> {followee}");
        let pair = PairKey::new(follower, followee)?;
        let guard = self.lock(&pair)?;
        if !self.store.follow_exists(follower, followee)? {
            return Ok(());
        }

        let mut batch = self.store.batch();
        batch.delete_follow(follower, followee);
        batch.commit()?;
        drop(guard);

        self.events.publish(NetworkEvent::UserUnfollowed {
            follower: follower.clone(),
            followee: followee.clone(),
        });
        Ok(())
    }

    // ===== Blocking =====

    /// Block `target` on behalf of `blocker`.
    ///
    /// Clears the connection and both follow edges and cancels a pending
    /// request in the same batch as the block record. Repeating a block is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// [`NetworkError::SelfRequest`] for a self-block, [`NetworkError::Blocked`]
    /// if `target` has already blocked `blocker`.
    pub fn block_user(&self, blocker: &UserId, target: &UserId) -> Result<()> {
        debug!("Block: {blocker} blocks {target}");
        let pair = PairKey::new(blocker, target)?;
        let guard = self.lock(&pair)?;
        match self.store.block(&pair)? {
            Some(existing) if &existing.blocker == blocker => return Ok(()),
            Some(_) => {
                return Err(NetworkError::Blocked {
                    a: blocker.to_string(),
                    b: target.to_string(),
                })
            }
            None => {}
        }

        let mut batch = self.store.batch();
        batch.delete_connection(&pair);
        batch.delete_follow(blocker, target);
        batch.delete_follow(target, blocker);
        if let Some(pending) = self.store.pending_request_for(&pair)? {
            batch.update_request_status(&pending, RequestStatus::Cancelled)?;
        }
        batch.put_block(
            &pair,
            &BlockRecord {
                blocker: blocker.clone(),
                blocked: target.clone(),
                created_at: Utc::now(),
            },
        )?;
        batch.commit()?;
        drop(guard);

        self.events.publish(NetworkEvent::UserBlocked {
            blocker: blocker.clone(),
            blocked: target.clone(),
        });
        Ok(())
    }

    /// Lift a block. Only the user who created it may do so; no block is a no-op.
    ///
    /// # Errors
    ///
    /// [`NetworkError::Unauthorized`] if the block was created by `target`.
    pub fn unblock_user(&self, blocker: &UserId, target: &UserId) -> Result<()> {
        debug!("Unblock: {blocker} unblocks {target}");
        let pair = PairKey::new(blocker, target)?;
        let guard = self.lock(&pair)?;
        let Some(record) = self.store.block(&pair)? else {
            return Ok(());
        };
        if &record.blocker != blocker {
            return Err(NetworkError::Unauthorized {
                message: format!("{blocker} did not create the block on {pair}"),
            });
        }

        let mut batch = self.store.batch();
        batch.delete_block(&pair, &record);
        batch.commit()?;
        drop(guard);

        self.events.publish(NetworkEvent::UserUnblocked {
            blocker: blocker.clone(),
            blocked: target.clone(),
        });
        Ok(())
    }
}
