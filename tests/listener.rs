//! Integration tests for the rendezvous listener core.

use std::sync::atomic::Ordering;

use rendezvous_listener::event::EventKind;
use rendezvous_listener::link::DataLink;
use rendezvous_listener::ListenerError;

mod common;

use common::{assert_invariants, harness, ACCEPT_ACK, CONNECT, REJECT};

#[test]
fn handshake_promotes_link_and_raises_one_notification() {
    let h = harness();
    let notifications = h.count_pending_notifications();

    h.listener.bind(&"alpha".to_string()).unwrap();
    assert_eq!(h.listener.pending_count(), 1);
    assert_eq!(h.listener.waiting_count(), 0);

    let peer = h.medium.connect("alpha").unwrap();
    peer.send(CONNECT);
    h.pump();

    assert_eq!(h.listener.pending_count(), 0);
    assert_eq!(h.listener.waiting_count(), 1);
    assert_eq!(notifications.load(Ordering::SeqCst), 1);
    assert_invariants(&h);
}

#[test]
fn mismatch_gets_one_reject_and_may_retry() {
    let h = harness();
    let notifications = h.count_pending_notifications();

    h.listener.bind(&"beta".to_string()).unwrap();
    let peer = h.medium.connect("beta").unwrap();

    peer.send(b"definitely wrong");
    h.pump();

    assert_eq!(h.listener.pending_count(), 1);
    assert_eq!(h.listener.waiting_count(), 0);
    assert_eq!(notifications.load(Ordering::SeqCst), 0);
    assert_eq!(peer.replies(), REJECT);

    // Same link retries and succeeds; no further reject is written.
    peer.send(CONNECT);
    h.pump();

    assert_eq!(h.listener.waiting_count(), 1);
    assert_eq!(notifications.load(Ordering::SeqCst), 1);
    assert!(peer.replies().is_empty());
    assert_invariants(&h);
}

#[test]
fn accept_serves_oldest_handshake_first() {
    let h = harness();
    let first = h.establish("fifo-1");
    let second = h.establish("fifo-2");

    let link_a = h.listener.accept().unwrap();
    let link_b = h.listener.accept().unwrap();
    assert_eq!(link_a.target(), first.target());
    assert_eq!(link_b.target(), second.target());
}

#[test]
fn accept_on_empty_queue_is_a_defined_error() {
    let h = harness();
    assert!(matches!(
        h.listener.accept(),
        Err(ListenerError::NoPendingConnection)
    ));

    // Still an error after a bind with no completed handshake.
    h.listener.bind(&"quiet".to_string()).unwrap();
    assert!(matches!(
        h.listener.accept(),
        Err(ListenerError::NoPendingConnection)
    ));
}

#[test]
fn accept_acknowledges_and_transfers_ownership() {
    let h = harness();
    let peer = h.establish("owned");
    peer.replies(); // discard handshake-era replies (none expected)

    let link = h.listener.accept().unwrap();
    assert_eq!(peer.replies(), ACCEPT_ACK);

    // The listener no longer tracks the link in any container.
    assert_eq!(h.listener.pending_count(), 0);
    assert_eq!(h.listener.waiting_count(), 0);
    assert!(h.listener.bound_address(link.target()).is_none());
    assert!(!h.bus.has_handler(EventKind::Disconnected, link.target()));
    assert!(!h.bus.has_handler(EventKind::InputReady, link.target()));

    // A disconnect of an accepted link is the caller's business: no respawn.
    peer.disconnect();
    h.pump();
    assert_eq!(h.listener.pending_count(), 0);
}

#[test]
fn disconnect_of_pending_link_respawns_the_slot() {
    let h = harness();
    h.listener.bind(&"phoenix".to_string()).unwrap();
    let old_id = h.listener.pending_ids()[0];

    let peer = h.medium.connect("phoenix").unwrap();
    peer.disconnect();
    h.pump();

    assert_eq!(h.listener.pending_count(), 1);
    let new_id = h.listener.pending_ids()[0];
    assert_ne!(new_id, old_id);
    assert_eq!(
        h.listener.bound_address(new_id).as_deref(),
        Some("phoenix")
    );
    assert!(h.listener.bound_address(old_id).is_none());

    // The replacement is connectable and completes a handshake.
    let retry = h.medium.connect("phoenix").expect("slot respawned");
    retry.send(CONNECT);
    h.pump();
    assert_eq!(h.listener.waiting_count(), 1);
    assert_invariants(&h);
}

#[test]
fn disconnect_of_waiting_link_respawns_the_slot() {
    let h = harness();
    let peer = h.establish("lazarus");
    assert_eq!(h.listener.waiting_count(), 1);
    let old_id = peer.target();

    peer.disconnect();
    h.pump();

    assert_eq!(h.listener.waiting_count(), 0);
    assert_eq!(h.listener.pending_count(), 1);
    let new_id = h.listener.pending_ids()[0];
    assert_ne!(new_id, old_id);
    assert_eq!(
        h.listener.bound_address(new_id).as_deref(),
        Some("lazarus")
    );
    assert_invariants(&h);
}

#[test]
fn binding_one_address_twice_arms_two_slots() {
    let h = harness();
    let addr = "doubled".to_string();
    h.listener.bind(&addr).unwrap();
    h.listener.bind(&addr).unwrap();
    assert_eq!(h.listener.pending_count(), 2);

    let peer_a = h.medium.connect("doubled").unwrap();
    let peer_b = h.medium.connect("doubled").unwrap();
    assert_ne!(peer_a.target(), peer_b.target());

    peer_a.send(CONNECT);
    peer_b.send(CONNECT);
    h.pump();
    assert_eq!(h.listener.waiting_count(), 2);
    assert_invariants(&h);
}

#[test]
fn close_destroys_every_tracked_link() {
    let h = harness();
    let _waiting_peer = h.establish("closing-1");
    h.listener.bind(&"closing-2".to_string()).unwrap();

    let waiting_id = h.listener.waiting_ids()[0];
    let pending_id = h.listener.pending_ids()[0];

    h.listener.close();

    assert_eq!(h.listener.pending_count(), 0);
    assert_eq!(h.listener.waiting_count(), 0);
    assert!(matches!(
        h.listener.accept(),
        Err(ListenerError::NoPendingConnection)
    ));
    for id in [waiting_id, pending_id] {
        assert!(!h.bus.has_handler(EventKind::InputReady, id));
        assert!(!h.bus.has_handler(EventKind::Disconnected, id));
        assert!(h.listener.bound_address(id).is_none());
    }

    // The destroyed links are gone from the medium too.
    assert!(h.medium.connect("closing-2").is_none());

    // Idempotent.
    h.listener.close();
}

#[test]
fn events_arriving_after_close_are_ignored() {
    let h = harness();
    h.listener.bind(&"late".to_string()).unwrap();
    let peer = h.medium.connect("late").unwrap();

    // Events are queued before close and dispatched after it.
    peer.send(CONNECT);
    peer.disconnect();
    h.listener.close();
    h.pump();

    assert_eq!(h.listener.pending_count(), 0);
    assert_eq!(h.listener.waiting_count(), 0);
}
