//! Domain events published after committed state changes.
//!
//! The engine and the ledger publish through an [`EventBus`]; a notification
//! subsystem subscribes an [`EventSink`]. Events go out only after the batch
//! has been written, and idempotent no-ops publish nothing.

use crate::community::MembershipRole;
use crate::identity::{CommunityId, RequestId, UserId};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

/// Something that happened in the relationship graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NetworkEvent {
    /// A connection request was created.
    RequestSent {
        /// The new request
        request_id: RequestId,
        /// Sender
        from: UserId,
        /// Recipient
        to: UserId,
    },
    /// A request was accepted and the pair connected.
    RequestAccepted {
        /// The accepted request
        request_id: RequestId,
        /// Original sender
        requester: UserId,
        /// User who accepted
        recipient: UserId,
    },
    /// A request was declined.
    RequestRejected {
        /// The declined request
        request_id: RequestId,
        /// Original sender
        requester: UserId,
        /// User who declined
        recipient: UserId,
    },
    /// A request was withdrawn, or voided by a block.
    RequestCancelled {
        /// The cancelled request
        request_id: RequestId,
        /// Original sender
        requester: UserId,
        /// Original recipient
        recipient: UserId,
    },
    /// A connection was removed.
    ConnectionRemoved {
        /// User who removed it
        by: UserId,
        /// The former connection
        peer: UserId,
    },
    /// A user blocked another.
    UserBlocked {
        /// Initiator
        blocker: UserId,
        /// Target
        blocked: UserId,
    },
    /// A block was lifted.
    UserUnblocked {
        /// Initiator of the original block
        blocker: UserId,
        /// Former target
        blocked: UserId,
    },
    /// A follow edge was created.
    UserFollowed {
        /// Follower
        follower: UserId,
        /// Followee
        followee: UserId,
    },
    /// A follow edge was removed.
    UserUnfollowed {
        /// Former follower
        follower: UserId,
        /// Former followee
        followee: UserId,
    },
    /// A user became a member of a public community.
    CommunityJoined {
        /// The community
        community: CommunityId,
        /// The new member
        user: UserId,
    },
    /// A user asked to join a private community.
    CommunityJoinRequested {
        /// The community
        community: CommunityId,
        /// The applicant
        user: UserId,
    },
    /// A membership (or pending application) was removed.
    CommunityLeft {
        /// The community
        community: CommunityId,
        /// The former member
        user: UserId,
        /// Role held before leaving
        previous_role: MembershipRole,
    },
}

/// Subscriber for [`NetworkEvent`]s.
///
/// Called synchronously on the writer's thread after commit, with no pair
/// lock held. Implementations should be quick and must not panic.
pub trait EventSink: Send + Sync {
    /// Receive one event.
    fn publish(&self, event: &NetworkEvent);
}

/// Fan-out to every subscribed sink.
#[derive(Default)]
pub struct EventBus {
    sinks: RwLock<Vec<Arc<dyn EventSink>>>,
}

impl EventBus {
    /// Create a bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber.
    pub fn subscribe(&self, sink: Arc<dyn EventSink>) {
        self.sinks.write().push(sink);
    }

    /// Number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sinks.read().len()
    }

    /// Deliver `event` to every subscriber.
    pub fn publish(&self, event: NetworkEvent) {
        for sink in self.sinks.read().iter() {
            sink.publish(&event);
        }
    }
}

/// Sink that records every event in memory.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<NetworkEvent>>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn events(&self) -> Vec<NetworkEvent> {
        self.events.lock().clone()
    }

    /// Take and clear the recorded events.
    pub fn drain(&self) -> Vec<NetworkEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for EventLog {
    fn publish(&self, event: &NetworkEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Sink that forwards events into an `mpsc` channel.
///
/// A dropped receiver is ignored: delivery is best effort.
pub struct ChannelSink {
    sender: Mutex<Sender<NetworkEvent>>,
}

impl ChannelSink {
    /// Create a sink and the receiving end of its channel.
    pub fn channel() -> (Self, Receiver<NetworkEvent>) {
        let (sender, receiver) = mpsc::channel();
        (
            Self {
                sender: Mutex::new(sender),
            },
            receiver,
        )
    }
}

impl EventSink for ChannelSink {
    fn publish(&self, event: &NetworkEvent) {
        let _ = self.sender.lock().send(event.clone());
    }
}
