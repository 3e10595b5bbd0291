//! # relgraph
//!
//! A relationship graph engine for social networks: directional follows,
//! connection requests, blocking, derived network statistics and community
//! membership.
//!
//! ## Core Principles
//!
//! - **Derived, never counted**: every statistic is computed from stored edges
//! - **All or nothing**: each operation commits as one atomic storage batch
//! - **Per-pair exclusion**: writers on the same pair serialize; unrelated pairs don't
//! - **Typed failures**: every refusal is a distinct [`NetworkError`] kind
//! - **Bring your own store**: any [`StorageBackend`] with prefix scans works
//!
//! ## Architecture
//!
//! ```text
//! API / transport layer
//!     ↓
//! Network (engine, projector, ledger, event bus)
//!     ↓
//! RelationshipEngine / CommunityLedger   StatsProjector (read-only)
//!     ↓                                       ↓
//! EdgeStore (records + atomic batches)
//!     ↓
//! Storage Backend (RocksDB, memory)
//! ```
//!
//! ## Example
//!
//! ```
//! use relgraph::{Decision, Network, UserId};
//!
//! # fn example() -> relgraph::Result<()> {
//! let network = Network::in_memory()?;
//! let alice = UserId::new("alice")?;
//! let bob = UserId::new("bob")?;
//!
//! let request = network
//!     .engine()
//!     .send_connection_request(&alice, &bob, Some("hi"))?;
//! network
//!     .engine()
//!     .respond_to_request(&request, Decision::Accept, &bob)?;
//!
//! assert_eq!(network.stats().network_stats(&alice)?.connections_count, 1);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod community;
pub mod config;
pub mod error;
pub mod events;
pub mod graph;
pub mod identity;
pub mod locks;
pub mod network;
pub mod stats;
pub mod storage;

// Re-export main types
pub use community::{
    Community, CommunityLedger, JoinOutcome, Membership, MembershipRole, Visibility,
};
pub use config::EngineConfig;
pub use error::{NetworkError, Result};
pub use events::{ChannelSink, EventBus, EventLog, EventSink, NetworkEvent};
pub use graph::{
    BlockRecord, ConnectionEdge, ConnectionRequest, Decision, EdgeStore, FollowEdge,
    RelationshipEngine, RequestStatus,
};
pub use identity::{CommunityId, PairKey, RequestId, UserId};
pub use network::Network;
pub use stats::{ConnectionState, FollowStatus, NetworkStats, RelationshipView, StatsProjector};
pub use storage::{BatchOperation, MemoryBackend, StorageBackend};
#[cfg(feature = "rocksdb-backend")]
pub use storage::RocksDBBackend;
