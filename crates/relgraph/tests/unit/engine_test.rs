//! Relationship engine transitions: requests, follows, removal and blocking.

use relgraph::{
    ConnectionState, Decision, FollowStatus, Network, NetworkError, PairKey, RequestStatus,
    UserId,
};

fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

fn setup() -> (Network, UserId, UserId) {
    (Network::in_memory().unwrap(), user("alice"), user("bob"))
}

fn connected(network: &Network, a: &UserId, b: &UserId) -> bool {
    let pair = PairKey::new(a, b).unwrap();
    network.store().connection(&pair).unwrap().is_some()
}

// ===== Request lifecycle =====

#[test]
fn test_send_then_accept_connects() {
    let (network, alice, bob) = setup();
    let id = network
        .engine()
        .send_connection_request(&alice, &bob, Some("hi"))
        .unwrap();

    let request = network.stats().request(&id, &bob).unwrap().unwrap();
    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(request.message.as_deref(), Some("hi"));

    let accepted = network
        .engine()
        .respond_to_request(&id, Decision::Accept, &bob)
        .unwrap();
    assert_eq!(accepted.status, RequestStatus::Accepted);
    assert!(connected(&network, &alice, &bob));

    let view = network.stats().relationship(&bob, &alice).unwrap();
    assert_eq!(view.connection, ConnectionState::Connected);
}

#[test]
fn test_accept_without_reciprocal_request_still_connects() {
    let (network, alice, bob) = setup();
    let id = network
        .engine()
        .send_connection_request(&bob, &alice, None)
        .unwrap();
    network
        .engine()
        .respond_to_request(&id, Decision::Accept, &alice)
        .unwrap();
    assert!(connected(&network, &alice, &bob));
}

#[test]
fn test_second_request_while_pending_is_duplicate() {
    let (network, alice, bob) = setup();
    network
        .engine()
        .send_connection_request(&alice, &bob, Some("hi"))
        .unwrap();

    let err = network
        .engine()
        .send_connection_request(&alice, &bob, None)
        .unwrap_err();
    assert!(matches!(err, NetworkError::DuplicatePending { .. }));

    let err = network
        .engine()
        .send_connection_request(&bob, &alice, None)
        .unwrap_err();
    assert!(matches!(err, NetworkError::DuplicatePending { .. }));
}

#[test]
fn test_reject_leaves_pair_unconnected() {
    let (network, alice, bob) = setup();
    let id = network
        .engine()
        .send_connection_request(&alice, &bob, Some("hi"))
        .unwrap();
    let rejected = network
        .engine()
        .respond_to_request(&id, Decision::Reject, &bob)
        .unwrap();

    assert_eq!(rejected.status, RequestStatus::Rejected);
    assert!(!connected(&network, &alice, &bob));
    assert_eq!(
        network.stats().relationship(&alice, &bob).unwrap().connection,
        ConnectionState::None
    );

    // The pair is free for a new request after rejection.
    network
        .engine()
        .send_connection_request(&alice, &bob, None)
        .unwrap();
}

#[test]
fn test_responding_twice_is_already_resolved() {
    let (network, alice, bob) = setup();
    let id = network
        .engine()
        .send_connection_request(&alice, &bob, None)
        .unwrap();
    network
        .engine()
        .respond_to_request(&id, Decision::Reject, &bob)
        .unwrap();

    let err = network
        .engine()
        .respond_to_request(&id, Decision::Accept, &bob)
        .unwrap_err();
    assert!(matches!(
        err,
        NetworkError::AlreadyResolved {
            status: RequestStatus::Rejected,
            ..
        }
    ));
    assert!(!connected(&network, &alice, &bob));
}

#[test]
fn test_only_recipient_may_respond() {
    let (network, alice, bob) = setup();
    let carol = user("carol");
    let id = network
        .engine()
        .send_connection_request(&alice, &bob, None)
        .unwrap();

    for outsider in [&alice, &carol] {
        let err = network
            .engine()
            .respond_to_request(&id, Decision::Accept, outsider)
            .unwrap_err();
        assert!(matches!(err, NetworkError::NotFound { entity: "request", .. }));
    }
    assert!(network.stats().request(&id, &carol).unwrap().is_none());
}

#[test]
fn test_unknown_request_is_not_found() {
    let (network, _alice, bob) = setup();
    let err = network
        .engine()
        .respond_to_request(&relgraph::RequestId::generate(), Decision::Accept, &bob)
        .unwrap_err();
    assert!(matches!(err, NetworkError::NotFound { .. }));
}

#[test]
fn test_cancel_by_requester() {
    let (network, alice, bob) = setup();
    let id = network
        .engine()
        .send_connection_request(&alice, &bob, None)
        .unwrap();

    let err = network
        .engine()
        .cancel_connection_request(&id, &bob)
        .unwrap_err();
    assert!(matches!(err, NetworkError::NotFound { .. }));

    let cancelled = network
        .engine()
        .cancel_connection_request(&id, &alice)
        .unwrap();
    assert_eq!(cancelled.status, RequestStatus::Cancelled);
    assert_eq!(network.stats().network_stats(&bob).unwrap().pending_requests_count, 0);

    let err = network
        .engine()
        .cancel_connection_request(&id, &alice)
        .unwrap_err();
    assert!(matches!(err, NetworkError::AlreadyResolved { .. }));
}

#[test]
fn test_request_to_connected_user_is_refused() {
    let (network, alice, bob) = setup();
    let id = network
        .engine()
        .send_connection_request(&alice, &bob, None)
        .unwrap();
    network
        .engine()
        .respond_to_request(&id, Decision::Accept, &bob)
        .unwrap();

    let err = network
        .engine()
        .send_connection_request(&bob, &alice, None)
        .unwrap_err();
    assert!(matches!(err, NetworkError::AlreadyConnected { .. }));
}

#[test]
fn test_self_targeting_is_refused() {
    let (network, alice, _bob) = setup();
    let engine = network.engine();

    assert!(matches!(
        engine.send_connection_request(&alice, &alice, None),
        Err(NetworkError::SelfRequest { .. })
    ));
    assert!(matches!(
        engine.follow(&alice, &alice),
        Err(NetworkError::SelfRequest { .. })
    ));
    assert!(matches!(
        engine.block_user(&alice, &alice),
        Err(NetworkError::SelfRequest { .. })
    ));
}

#[test]
fn test_oversized_message_is_invalid() {
    let (network, alice, bob) = setup();
    let long = "x".repeat(network.config().max_message_len + 1);
    let err = network
        .engine()
        .send_connection_request(&alice, &bob, Some(&long))
        .unwrap_err();
    assert!(matches!(err, NetworkError::InvalidInput { .. }));
    assert!(network.stats().outgoing_requests(&alice).unwrap().is_empty());
}

// ===== Remove connection =====

#[test]
fn test_remove_connection_is_idempotent_and_keeps_follows() {
    let (network, alice, bob) = setup();
    let engine = network.engine();
    let id = engine.send_connection_request(&alice, &bob, None).unwrap();
    engine.respond_to_request(&id, Decision::Accept, &bob).unwrap();
    engine.follow(&alice, &bob).unwrap();

    engine.remove_connection(&bob, &alice).unwrap();
    let after_once = network.stats().network_stats(&alice).unwrap();
    engine.remove_connection(&bob, &alice).unwrap();
    let after_twice = network.stats().network_stats(&alice).unwrap();

    assert_eq!(after_once, after_twice);
    assert_eq!(after_twice.connections_count, 0);
    assert_eq!(after_twice.following_count, 1);
    assert!(!connected(&network, &alice, &bob));
}

#[test]
fn test_remove_then_reconnect() {
    let (network, alice, bob) = setup();
    let engine = network.engine();
    let first = engine.send_connection_request(&alice, &bob, None).unwrap();
    engine.respond_to_request(&first, Decision::Accept, &bob).unwrap();
    engine.remove_connection(&alice, &bob).unwrap();

    let second = engine.send_connection_request(&bob, &alice, None).unwrap();
    engine.respond_to_request(&second, Decision::Accept, &alice).unwrap();
    let edge = network
        .store()
        .connection(&PairKey::new(&alice, &bob).unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(edge.request_id, second);
}

// ===== Follow dimension =====

#[test]
fn test_follow_unfollow_idempotent() {
    let (network, alice, bob) = setup();
    let engine = network.engine();
    engine.follow(&alice, &bob).unwrap();
    engine.follow(&alice, &bob).unwrap();
    assert_eq!(network.stats().network_stats(&bob).unwrap().followers_count, 1);

    engine.unfollow(&alice, &bob).unwrap();
    let once = network.stats().network_stats(&bob).unwrap();
    engine.unfollow(&alice, &bob).unwrap();
    let twice = network.stats().network_stats(&bob).unwrap();
    assert_eq!(once, twice);
    assert_eq!(twice.followers_count, 0);
}

#[test]
fn test_mutual_follow_is_symmetric() {
    let (network, alice, bob) = setup();
    network.engine().follow(&alice, &bob).unwrap();
    assert_eq!(
        network.stats().follow_status(&alice, &bob).unwrap(),
        FollowStatus::Following
    );
    assert_eq!(
        network.stats().follow_status(&bob, &alice).unwrap(),
        FollowStatus::FollowedBy
    );

    network.engine().follow(&bob, &alice).unwrap();
    assert_eq!(
        network.stats().follow_status(&alice, &bob).unwrap(),
        FollowStatus::Mutual
    );
    assert_eq!(
        network.stats().follow_status(&bob, &alice).unwrap(),
        FollowStatus::Mutual
    );
}

#[test]
fn test_follow_is_independent_of_connection() {
    let (network, alice, bob) = setup();
    network.engine().follow(&alice, &bob).unwrap();
    let view = network.stats().relationship(&alice, &bob).unwrap();
    assert_eq!(view.follow, FollowStatus::Following);
    assert_eq!(view.connection, ConnectionState::None);
}

// ===== Blocking =====

#[test]
fn test_block_overrides_connection_and_follows() {
    let (network, alice, bob) = setup();
    let engine = network.engine();
    let id = engine.send_connection_request(&alice, &bob, None).unwrap();
    engine.respond_to_request(&id, Decision::Accept, &bob).unwrap();
    engine.follow(&alice, &bob).unwrap();
    engine.follow(&bob, &alice).unwrap();

    engine.block_user(&alice, &bob).unwrap();

    assert!(!connected(&network, &alice, &bob));
    assert!(!network.store().follow_exists(&alice, &bob).unwrap());
    assert!(!network.store().follow_exists(&bob, &alice).unwrap());

    let err = engine.send_connection_request(&bob, &alice, None).unwrap_err();
    assert!(matches!(err, NetworkError::Blocked { .. }));
    assert!(matches!(
        engine.follow(&bob, &alice),
        Err(NetworkError::Blocked { .. })
    ));
    assert!(matches!(
        engine.follow(&alice, &bob),
        Err(NetworkError::Blocked { .. })
    ));

    assert_eq!(
        network.stats().relationship(&alice, &bob).unwrap().connection,
        ConnectionState::BlockedByViewer
    );
    assert_eq!(
        network.stats().relationship(&bob, &alice).unwrap().connection,
        ConnectionState::BlockedByTarget
    );
}

#[test]
fn test_block_cancels_pending_request() {
    let (network, alice, bob) = setup();
    let engine = network.engine();
    let id = engine.send_connection_request(&alice, &bob, None).unwrap();

    engine.block_user(&bob, &alice).unwrap();

    let request = network.stats().request(&id, &alice).unwrap().unwrap();
    assert_eq!(request.status, RequestStatus::Cancelled);
    assert_eq!(network.stats().network_stats(&bob).unwrap().pending_requests_count, 0);
    assert!(matches!(
        engine.respond_to_request(&id, Decision::Accept, &bob),
        Err(NetworkError::AlreadyResolved { .. })
    ));
}

#[test]
fn test_repeat_block_is_noop_and_counter_block_refused() {
    let (network, alice, bob) = setup();
    let engine = network.engine();
    engine.block_user(&alice, &bob).unwrap();
    engine.block_user(&alice, &bob).unwrap();

    let err = engine.block_user(&bob, &alice).unwrap_err();
    assert!(matches!(err, NetworkError::Blocked { .. }));
    assert_eq!(network.stats().blocked_users(&alice).unwrap().len(), 1);
    assert!(network.stats().blocked_users(&bob).unwrap().is_empty());
}

#[test]
fn test_only_blocker_may_unblock() {
    let (network, alice, bob) = setup();
    let engine = network.engine();
    engine.block_user(&alice, &bob).unwrap();

    let err = engine.unblock_user(&bob, &alice).unwrap_err();
    assert!(matches!(err, NetworkError::Unauthorized { .. }));

    engine.unblock_user(&alice, &bob).unwrap();
    assert_eq!(
        network.stats().relationship(&alice, &bob).unwrap().connection,
        ConnectionState::None
    );
    assert!(network.stats().blocked_users(&alice).unwrap().is_empty());

    // Back to `none`: interaction works again, edges are not restored.
    engine.follow(&bob, &alice).unwrap();
    engine.send_connection_request(&bob, &alice, None).unwrap();
}

#[test]
fn test_unblock_without_block_is_noop() {
    let (network, alice, bob) = setup();
    network.engine().unblock_user(&alice, &bob).unwrap();
}
