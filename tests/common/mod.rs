//! Shared harness for the integration suite.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rendezvous_listener::config::ListenerConfig;
use rendezvous_listener::event::{EventBus, EventDispatcher, EventKind};
use rendezvous_listener::link::{MemoryMedium, MemoryPeer};
use rendezvous_listener::net::handshake;
use rendezvous_listener::RendezvousListener;

/// Default connect-request bytes.
#[allow(dead_code)]
pub const CONNECT: &[u8] = handshake::DEFAULT_CONNECT_REQUEST.as_bytes();
/// Default accept-acknowledgment bytes.
#[allow(dead_code)]
pub const ACCEPT_ACK: &[u8] = handshake::DEFAULT_ACCEPT_ACK.as_bytes();
/// Default reject bytes.
#[allow(dead_code)]
pub const REJECT: &[u8] = handshake::DEFAULT_REJECT.as_bytes();

/// Bus, medium and listener wired together.
pub struct Harness {
    pub bus: Arc<EventBus>,
    pub medium: MemoryMedium,
    pub listener: RendezvousListener<MemoryMedium>,
}

pub fn harness() -> Harness {
    harness_with(ListenerConfig::default())
}

pub fn harness_with(config: ListenerConfig) -> Harness {
    let bus = EventBus::new();
    let dispatcher: Arc<dyn EventDispatcher> = bus.clone();
    let medium = MemoryMedium::new(Arc::clone(&dispatcher));
    let listener = RendezvousListener::new(medium.clone(), dispatcher, &config);
    Harness {
        bus,
        medium,
        listener,
    }
}

impl Harness {
    /// Drain the event queue deterministically on this thread.
    #[allow(dead_code)]
    pub fn pump(&self) -> usize {
        self.bus.dispatch_pending()
    }

    /// Count connection-pending notifications raised by the listener.
    #[allow(dead_code)]
    pub fn count_pending_notifications(&self) -> Arc<AtomicUsize> {
        let counter = Arc::new(AtomicUsize::new(0));
        let observer = Arc::clone(&counter);
        self.bus
            .register(
                EventKind::ConnectionPending,
                self.listener.target(),
                Box::new(move |_| {
                    observer.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .expect("one observer per harness");
        counter
    }

    /// Bind `addr`, connect a peer, complete the handshake, pump.
    #[allow(dead_code)]
    pub fn establish(&self, addr: &str) -> MemoryPeer {
        self.listener
            .bind(&addr.to_string())
            .expect("bind succeeds");
        let peer = self.medium.connect(addr).expect("address armed");
        peer.send(CONNECT);
        self.pump();
        peer
    }
}

/// The state containers must stay disjoint and fully addressed.
#[allow(dead_code)]
pub fn assert_invariants(harness: &Harness) {
    let pending = harness.listener.pending_ids();
    let waiting = harness.listener.waiting_ids();
    for id in &pending {
        assert!(
            !waiting.contains(id),
            "{id} is tracked as both pending and waiting"
        );
    }
    for id in pending.iter().chain(waiting.iter()) {
        assert!(
            harness.listener.bound_address(*id).is_some(),
            "{id} is tracked without a bind address"
        );
    }
}
