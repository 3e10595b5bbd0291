//! Basic usage example for relgraph
//!
//! This example demonstrates:
//! - Opening a persistent network
//! - Following, connecting and blocking
//! - Reading derived stats and relationship views
//! - Joining a community

use relgraph::{Decision, EventLog, Network, UserId, Visibility};
use std::path::Path;
use std::sync::Arc;

fn main() -> relgraph::Result<()> {
    // Create a persistent network (or use in_memory() for testing)
    let network = Network::open(Path::new("./example.relgraph"))?;
    let log = Arc::new(EventLog::new());
    network.subscribe(log.clone());

    let alice = UserId::new("alice")?;
    let bob = UserId::new("bob")?;
    let carol = UserId::new("carol")?;

    println!("Building a small network...\n");

    network.engine().follow(&alice, &bob)?;
    network.engine().follow(&carol, &bob)?;
    println!("✓ alice and carol follow bob");

    let request = network
        .engine()
        .send_connection_request(&alice, &bob, Some("We met at the meetup"))?;
    println!("✓ alice sent bob a connection request (ID: {request})");

    network
        .engine()
        .respond_to_request(&request, Decision::Accept, &bob)?;
    println!("✓ bob accepted");

    network
        .engine()
        .send_connection_request(&carol, &bob, None)?;
    println!("✓ carol sent bob a connection request");

    // Query the network
    println!("\n--- Network stats ---\n");

    for user in [&alice, &bob, &carol] {
        let stats = network.stats().network_stats(user)?;
        println!(
            "{user}: {} connections, {} followers, {} following, {} pending",
            stats.connections_count,
            stats.followers_count,
            stats.following_count,
            stats.pending_requests_count
        );
    }

    let view = network.stats().relationship(&bob, &carol)?;
    println!("\nbob -> carol: follow {:?}, connection {:?}", view.follow, view.connection);

    // Blocking removes every edge between the pair
    network.engine().block_user(&bob, &carol)?;
    let view = network.stats().relationship(&bob, &carol)?;
    println!("after block: follow {:?}, connection {:?}", view.follow, view.connection);

    // Communities
    println!("\n--- Communities ---\n");

    let ledger = network.communities();
    let club = ledger.create_community(&alice, "Rustaceans", Visibility::Public)?;
    let outcome = ledger.join_community(&bob, &club)?;
    println!(
        "bob joined {club} as {} (approval needed: {})",
        outcome.role, outcome.requires_approval
    );
    println!("members: {}", ledger.member_count(&club)?);

    println!("\n--- Events ---\n");
    for event in log.drain() {
        println!("  - {event:?}");
    }

    // Persist changes
    network.flush()?;
    println!("\n✓ Network persisted to disk");

    Ok(())
}
