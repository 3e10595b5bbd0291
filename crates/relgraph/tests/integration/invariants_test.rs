//! Model-based invariant fuzzing.
//!
//! Random operation sequences over a handful of users run against both the
//! engine and a plain reference model. After every step the stored records
//! and the derived stats must agree with the model, and no follow or
//! connection edge may cross a blocked pair.

use proptest::prelude::*;
use relgraph::{Decision, Network, NetworkError, PairKey, RequestId, UserId};
use std::collections::{HashMap, HashSet};

const USERS: usize = 4;

#[derive(Debug, Clone)]
enum Op {
    Follow(usize, usize),
    Unfollow(usize, usize),
    Send(usize, usize),
    Respond(usize, usize, bool),
    Cancel(usize, usize),
    Remove(usize, usize),
    Block(usize, usize),
    Unblock(usize, usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let ids = || (0..USERS, 0..USERS);
    prop_oneof![
        ids().prop_map(|(i, j)| Op::Follow(i, j)),
        ids().prop_map(|(i, j)| Op::Unfollow(i, j)),
        ids().prop_map(|(i, j)| Op::Send(i, j)),
        (0..USERS, 0..USERS, any::<bool>()).prop_map(|(i, j, a)| Op::Respond(i, j, a)),
        ids().prop_map(|(i, j)| Op::Cancel(i, j)),
        ids().prop_map(|(i, j)| Op::Remove(i, j)),
        ids().prop_map(|(i, j)| Op::Block(i, j)),
        ids().prop_map(|(i, j)| Op::Unblock(i, j)),
    ]
}

type Pair = (usize, usize);

fn pair(i: usize, j: usize) -> Pair {
    (i.min(j), i.max(j))
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    id: RequestId,
    from: usize,
    to: usize,
}

#[derive(Default)]
struct Model {
    follows: HashSet<(usize, usize)>,
    connected: HashSet<Pair>,
    blocks: HashMap<Pair, usize>,
    pending: HashMap<Pair, Pending>,
}

/// Outcome kind used to compare the engine against the model.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Ok,
    SelfRequest,
    Blocked,
    DuplicatePending,
    AlreadyConnected,
    NotFound,
    Unauthorized,
    Skipped,
}

fn outcome<T>(result: Result<T, NetworkError>) -> Outcome {
    match result {
        Ok(_) => Outcome::Ok,
        Err(NetworkError::SelfRequest { .. }) => Outcome::SelfRequest,
        Err(NetworkError::Blocked { .. }) => Outcome::Blocked,
        Err(NetworkError::DuplicatePending { .. }) => Outcome::DuplicatePending,
        Err(NetworkError::AlreadyConnected { .. }) => Outcome::AlreadyConnected,
        Err(NetworkError::NotFound { .. }) => Outcome::NotFound,
        Err(NetworkError::Unauthorized { .. }) => Outcome::Unauthorized,
        Err(other) => panic!("unexpected error: {other}"),
    }
}

struct Harness {
    network: Network,
    users: Vec<UserId>,
    model: Model,
}

impl Harness {
    fn new() -> Self {
        Self {
            network: Network::in_memory().unwrap(),
            users: (0..USERS)
                .map(|i| UserId::new(format!("user-{i}")).unwrap())
                .collect(),
            model: Model::default(),
        }
    }

    fn apply(&mut self, op: &Op) -> (Outcome, Outcome) {
        let engine = self.network.engine().clone();
        let u = self.users.clone();
        let m = &mut self.model;

        match *op {
            Op::Follow(i, j) => {
                let expected = if i == j {
                    Outcome::SelfRequest
                } else if m.blocks.contains_key(&pair(i, j)) {
                    Outcome::Blocked
                } else {
                    m.follows.insert((i, j));
                    Outcome::Ok
                };
                (expected, outcome(engine.follow(&u[i], &u[j])))
            }
            Op::Unfollow(i, j) => {
                let expected = if i == j {
                    Outcome::SelfRequest
                } else {
                    m.follows.remove(&(i, j));
                    Outcome::Ok
                };
                (expected, outcome(engine.unfollow(&u[i], &u[j])))
            }
            Op::Send(i, j) => {
                let p = pair(i, j);
                let expected = if i == j {
                    Outcome::SelfRequest
                } else if m.blocks.contains_key(&p) {
                    Outcome::Blocked
                } else if m.connected.contains(&p) {
                    Outcome::AlreadyConnected
                } else if m.pending.contains_key(&p) {
                    Outcome::DuplicatePending
                } else {
                    Outcome::Ok
                };
                let result = engine.send_connection_request(&u[i], &u[j], Some("hi"));
                if let Ok(id) = &result {
                    m.pending.insert(
                        p,
                        Pending {
                            id: *id,
                            from: i,
                            to: j,
                        },
                    );
                }
                (expected, outcome(result))
            }
            Op::Respond(responder, other, accept) => {
                let p = pair(responder, other);
                let Some(pending) = m.pending.get(&p).copied().filter(|_| responder != other)
                else {
                    return (Outcome::Skipped, Outcome::Skipped);
                };
                let decision = if accept {
                    Decision::Accept
                } else {
                    Decision::Reject
                };
                let expected = if pending.to != responder {
                    Outcome::NotFound
                } else {
                    m.pending.remove(&p);
                    if accept {
                        m.connected.insert(p);
                    }
                    Outcome::Ok
                };
                let actual =
                    outcome(engine.respond_to_request(&pending.id, decision, &u[responder]));
                (expected, actual)
            }
            Op::Cancel(requester, other) => {
                let p = pair(requester, other);
                let Some(pending) = m.pending.get(&p).copied().filter(|_| requester != other)
                else {
                    return (Outcome::Skipped, Outcome::Skipped);
                };
                let expected = if pending.from != requester {
                    Outcome::NotFound
                } else {
                    m.pending.remove(&p);
                    Outcome::Ok
                };
                let actual =
                    outcome(engine.cancel_connection_request(&pending.id, &u[requester]));
                (expected, actual)
            }
            Op::Remove(i, j) => {
                let expected = if i == j {
                    Outcome::SelfRequest
                } else {
                    m.connected.remove(&pair(i, j));
                    Outcome::Ok
                };
                (expected, outcome(engine.remove_connection(&u[i], &u[j])))
            }
            Op::Block(i, j) => {
                let p = pair(i, j);
                let expected = match m.blocks.get(&p) {
                    _ if i == j => Outcome::SelfRequest,
                    Some(&blocker) if blocker == i => Outcome::Ok,
                    Some(_) => Outcome::Blocked,
                    None => {
                        m.connected.remove(&p);
                        m.follows.remove(&(i, j));
                        m.follows.remove(&(j, i));
                        m.pending.remove(&p);
                        m.blocks.insert(p, i);
                        Outcome::Ok
                    }
                };
                (expected, outcome(engine.block_user(&u[i], &u[j])))
            }
            Op::Unblock(i, j) => {
                let p = pair(i, j);
                let expected = match m.blocks.get(&p) {
                    _ if i == j => Outcome::SelfRequest,
                    None => Outcome::Ok,
                    Some(&blocker) if blocker != i => Outcome::Unauthorized,
                    Some(_) => {
                        m.blocks.remove(&p);
                        Outcome::Ok
                    }
                };
                (expected, outcome(engine.unblock_user(&u[i], &u[j])))
            }
        }
    }

    fn check(&self) {
        let store = self.network.store();
        let stats = self.network.stats();
        let u = &self.users;
        let m = &self.model;

        for i in 0..USERS {
            // I1: nothing points at oneself.
            assert!(!store.follow_exists(&u[i], &u[i]).unwrap());

            for j in 0..USERS {
                if i == j {
                    continue;
                }
                assert_eq!(
                    store.follow_exists(&u[i], &u[j]).unwrap(),
                    m.follows.contains(&(i, j)),
                    "follow {i}->{j}"
                );
            }

            for j in (i + 1)..USERS {
                let p = PairKey::new(&u[i], &u[j]).unwrap();
                let connection = store.connection(&p).unwrap();
                let block = store.block(&p).unwrap();
                let pending = store.pending_request_for(&p).unwrap();

                // I3
                assert_eq!(connection.is_some(), m.connected.contains(&(i, j)));
                assert_eq!(
                    block.as_ref().map(|b| b.blocker.clone()),
                    m.blocks.get(&(i, j)).map(|&b| u[b].clone())
                );
                assert_eq!(
                    pending.as_ref().map(|r| r.id),
                    m.pending.get(&(i, j)).map(|p| p.id)
                );

                // I4
                if block.is_some() {
                    assert!(connection.is_none());
                    assert!(pending.is_none());
                    assert!(!store.follow_exists(&u[i], &u[j]).unwrap());
                    assert!(!store.follow_exists(&u[j], &u[i]).unwrap());
                }
            }

            // I2 and I5: derived counts match the model exactly.
            let s = stats.network_stats(&u[i]).unwrap();
            assert_eq!(
                s.followers_count,
                m.follows.iter().filter(|(_, to)| *to == i).count()
            );
            assert_eq!(
                s.following_count,
                m.follows.iter().filter(|(from, _)| *from == i).count()
            );
            assert_eq!(
                s.connections_count,
                m.connected.iter().filter(|(a, b)| *a == i || *b == i).count()
            );
            assert_eq!(
                s.pending_requests_count,
                m.pending.values().filter(|p| p.to == i).count()
            );
            assert_eq!(
                s.outgoing_requests_count,
                m.pending.values().filter(|p| p.from == i).count()
            );
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn invariants_hold_after_every_step(ops in proptest::collection::vec(op_strategy(), 1..48)) {
        let mut harness = Harness::new();
        for op in &ops {
            let (expected, actual) = harness.apply(op);
            prop_assert_eq!(expected, actual, "op {:?}", op);
            harness.check();
        }
    }
}

#[test]
fn test_scripted_sequence_matches_model() {
    let mut harness = Harness::new();
    let script = [
        Op::Send(0, 1),
        Op::Follow(0, 1),
        Op::Follow(1, 0),
        Op::Respond(1, 0, true),
        Op::Send(2, 0),
        Op::Block(0, 1),
        Op::Send(1, 0),
        Op::Unblock(1, 0),
        Op::Unblock(0, 1),
        Op::Respond(0, 2, false),
        Op::Send(1, 0),
        Op::Cancel(0, 1),
        Op::Cancel(1, 0),
    ];
    for op in &script {
        let (expected, actual) = harness.apply(op);
        assert_eq!(expected, actual, "op {op:?}");
        harness.check();
    }
}
