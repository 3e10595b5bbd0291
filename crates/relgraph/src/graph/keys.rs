//! Key layout of the relationship graph in the key-value backend.
//!
//! ```text
//! f/o/{follower}/{followee}     FollowEdge        outgoing follow
//! f/i/{followee}/{follower}     FollowEdge        incoming mirror
//! c/{user}/{peer}               ConnectionEdge    written for both sides
//! blk/{low}/{high}              BlockRecord       one per pair
//! blkby/{blocker}/{target}      BlockRecord       listing index
//! req/{request_id}              ConnectionRequest
//! pend/{low}/{high}             RequestId         at most one per pair
//! inbox/{recipient}/{request}   RequestId         pending incoming
//! outbox/{requester}/{request}  RequestId         pending outgoing
//! com/{community}               Community
//! mem/{community}/{user}        Membership
//! memof/{user}/{community}      Membership        listing index
//! ```
//!
//! User ids are arbitrary strings, so they are hex-encoded into key segments.
//! That keeps `/` unambiguous and stops `ab` from matching a scan for `a`.

use crate::identity::{CommunityId, PairKey, RequestId, UserId};
use std::fmt::Write;

fn segment(user: &UserId) -> String {
    let mut out = String::with_capacity(user.as_str().len() * 2);
    for byte in user.as_str().as_bytes() {
        // Writing into a String cannot fail.
        let _ = write!(out, "{byte:02x}");
    }
    out
}

fn pair_segments(pair: &PairKey) -> String {
    format!("{}/{}", segment(pair.low()), segment(pair.high()))
}

/// Outgoing follow edge key.
pub fn follow_out(follower: &UserId, followee: &UserId) -> Vec<u8> {
    format!("f/o/{}/{}", segment(follower), segment(followee)).into_bytes()
}

/// Prefix of every user `follower` follows.
pub fn follow_out_prefix(follower: &UserId) -> Vec<u8> {
    format!("f/o/{}/", segment(follower)).into_bytes()
}

/// Incoming follow edge key (mirror of [`follow_out`]).
pub fn follow_in(followee: &UserId, follower: &UserId) -> Vec<u8> {
    format!("f/i/{}/{}", segment(followee), segment(follower)).into_bytes()
}

/// Prefix of every follower of `followee`.
pub fn follow_in_prefix(followee: &UserId) -> Vec<u8> {
    format!("f/i/{}/", segment(followee)).into_bytes()
}

/// Connection edge key as seen from `user`.
pub fn connection(user: &UserId, peer: &UserId) -> Vec<u8> {
    format!("c/{}/{}", segment(user), segment(peer)).into_bytes()
}

/// Prefix of every connection of `user`.
pub fn connection_prefix(user: &UserId) -> Vec<u8> {
    format!("c/{}/", segment(user)).into_bytes()
}

/// Block record key for a pair.
pub fn block(pair: &PairKey) -> Vec<u8> {
    format!("blk/{}", pair_segments(pair)).into_bytes()
}

/// Block listing index key.
pub fn blocked_by(blocker: &UserId, target: &UserId) -> Vec<u8> {
    format!("blkby/{}/{}", segment(blocker), segment(target)).into_bytes()
}

/// Prefix of every user `blocker` has blocked.
pub fn blocked_by_prefix(blocker: &UserId) -> Vec<u8> {
    format!("blkby/{}/", segment(blocker)).into_bytes()
}

/// Request record key.
pub fn request(id: &RequestId) -> Vec<u8> {
    format!("req/{id}").into_bytes()
}

/// Pending-request slot of a pair.
pub fn pending(pair: &PairKey) -> Vec<u8> {
    format!("pend/{}", pair_segments(pair)).into_bytes()
}

/// Pending incoming index key.
pub fn inbox(recipient: &UserId, id: &RequestId) -> Vec<u8> {
    format!("inbox/{}/{id}", segment(recipient)).into_bytes()
}

/// Prefix of every pending request addressed to `recipient`.
pub fn inbox_prefix(recipient: &UserId) -> Vec<u8> {
    format!("inbox/{}/", segment(recipient)).into_bytes()
}

/// Pending outgoing index key.
pub fn outbox(requester: &UserId, id: &RequestId) -> Vec<u8> {
    format!("outbox/{}/{id}", segment(requester)).into_bytes()
}

/// Prefix of every pending request sent by `requester`.
pub fn outbox_prefix(requester: &UserId) -> Vec<u8> {
    format!("outbox/{}/", segment(requester)).into_bytes()
}

/// Community record key.
pub fn community(id: &CommunityId) -> Vec<u8> {
    format!("com/{id}").into_bytes()
}

/// Membership record key.
pub fn membership(community: &CommunityId, user: &UserId) -> Vec<u8> {
    format!("mem/{community}/{}", segment(user)).into_bytes()
}

/// Prefix of every membership record of a community.
pub fn membership_prefix(community: &CommunityId) -> Vec<u8> {
    format!("mem/{community}/").into_bytes()
}

/// Membership listing index key, keyed by user.
pub fn membership_of(user: &UserId, community: &CommunityId) -> Vec<u8> {
    format!("memof/{}/{community}", segment(user)).into_bytes()
}

/// Prefix of every membership held by `user`.
pub fn membership_of_prefix(user: &UserId) -> Vec<u8> {
    format!("memof/{}/", segment(user)).into_bytes()
}
