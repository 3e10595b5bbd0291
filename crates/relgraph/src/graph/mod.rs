//! Relationship records, their storage, and the state machine over them.
//!
//! - [`EdgeStore`]: authoritative records with atomic batches
//! - [`RelationshipEngine`]: connection, follow and block transitions
//! - [`keys`]: the key layout inside the backend

mod engine;
pub mod keys;
mod store;
mod types;

pub use engine::RelationshipEngine;
pub use store::{EdgeBatch, EdgeStore, IncidentEdges};
pub use types::{
    BlockRecord, ConnectionEdge, ConnectionRequest, Decision, FollowEdge, RequestStatus,
};
