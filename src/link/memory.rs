//! In-memory medium.
//!
//! # Responsibilities
//! - Implement the link contract entirely in-process
//! - Give tests and the demo a peer-side handle (send bytes, disconnect,
//!   observe replies)
//! - Inject bind failures on demand
//!
//! # Design Decisions
//! - Binding the same address twice yields two independent endpoints;
//!   `connect` claims them oldest-first
//! - Peer handles post events through the same dispatcher the links use,
//!   so dispatch ordering matches a real medium's

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::event::{Event, EventDispatcher, EventKind, TargetId};
use crate::link::{DataLink, LinkError, LinkProvider};

/// An in-process medium addressed by strings.
#[derive(Clone)]
pub struct MemoryMedium {
    shared: Arc<MediumShared>,
}

struct MediumShared {
    dispatcher: Arc<dyn EventDispatcher>,
    state: Mutex<MediumState>,
}

#[derive(Default)]
struct MediumState {
    /// Bound, not-yet-claimed endpoints per address, oldest first.
    bound: HashMap<String, VecDeque<TargetId>>,
    /// Every live bound endpoint.
    endpoints: HashMap<TargetId, Arc<Endpoint>>,
    /// Remaining bind calls to fail.
    bind_failures: u32,
    /// Total bind calls observed.
    bind_attempts: u64,
}

/// Shared buffers of one point-to-point hop.
struct Endpoint {
    /// Peer → link bytes.
    inbound: Mutex<VecDeque<u8>>,
    /// Link → peer bytes.
    outbound: Mutex<Vec<u8>>,
    closed: AtomicBool,
}

impl Endpoint {
    fn new() -> Self {
        Self {
            inbound: Mutex::new(VecDeque::new()),
            outbound: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }
}

impl MemoryMedium {
    /// Create a medium posting link events through `dispatcher`.
    pub fn new(dispatcher: Arc<dyn EventDispatcher>) -> Self {
        Self {
            shared: Arc::new(MediumShared {
                dispatcher,
                state: Mutex::new(MediumState::default()),
            }),
        }
    }

    /// Claim the oldest unclaimed endpoint bound at `addr`.
    ///
    /// Returns `None` when nothing is listening there.
    pub fn connect(&self, addr: &str) -> Option<MemoryPeer> {
        let mut state = self.shared.state.lock().expect("medium state lock poisoned");
        let state = &mut *state;
        let queue = state.bound.get_mut(addr)?;
        while let Some(target) = queue.pop_front() {
            if let Some(endpoint) = state.endpoints.get(&target) {
                return Some(MemoryPeer {
                    target,
                    endpoint: Arc::clone(endpoint),
                    dispatcher: Arc::clone(&self.shared.dispatcher),
                });
            }
        }
        None
    }

    /// Fail the next `count` bind calls with a `LinkError::Bind`.
    pub fn fail_next_binds(&self, count: u32) {
        self.shared
            .state
            .lock()
            .expect("medium state lock poisoned")
            .bind_failures = count;
    }

    /// Total bind calls the medium has seen, failed ones included.
    pub fn bind_attempts(&self) -> u64 {
        self.shared
            .state
            .lock()
            .expect("medium state lock poisoned")
            .bind_attempts
    }

    /// Unclaimed endpoints currently bound at `addr`.
    pub fn bound_count(&self, addr: &str) -> usize {
        self.shared
            .state
            .lock()
            .expect("medium state lock poisoned")
            .bound
            .get(addr)
            .map_or(0, |queue| queue.len())
    }
}

impl LinkProvider for MemoryMedium {
    type Addr = String;
    type Link = MemoryLink;

    fn create_link(&self) -> MemoryLink {
        MemoryLink {
            target: TargetId::next(),
            endpoint: Arc::new(Endpoint::new()),
            medium: Arc::clone(&self.shared),
            bound_addr: Mutex::new(None),
        }
    }
}

/// Listener-side end of an in-memory hop.
pub struct MemoryLink {
    target: TargetId,
    endpoint: Arc<Endpoint>,
    medium: Arc<MediumShared>,
    bound_addr: Mutex<Option<String>>,
}

impl DataLink for MemoryLink {
    type Addr = String;

    fn bind(&self, addr: &String) -> Result<(), LinkError> {
        let mut state = self.medium.state.lock().expect("medium state lock poisoned");
        state.bind_attempts += 1;
        if state.bind_failures > 0 {
            state.bind_failures -= 1;
            return Err(LinkError::Bind(format!("injected failure at {addr}")));
        }

        let mut bound_addr = self.bound_addr.lock().expect("link addr lock poisoned");
        if bound_addr.is_some() {
            return Err(LinkError::Bind(format!("link already bound at {addr}")));
        }
        state.endpoints.insert(self.target, Arc::clone(&self.endpoint));
        state
            .bound
            .entry(addr.clone())
            .or_default()
            .push_back(self.target);
        *bound_addr = Some(addr.clone());

        tracing::trace!(target_id = %self.target, addr = %addr, "memory link bound");
        Ok(())
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, LinkError> {
        let mut inbound = self.endpoint.inbound.lock().expect("inbound lock poisoned");
        let count = buf.len().min(inbound.len());
        for slot in buf.iter_mut().take(count) {
            *slot = inbound.pop_front().unwrap_or_default();
        }
        Ok(count)
    }

    fn write(&self, buf: &[u8]) -> Result<usize, LinkError> {
        if self.endpoint.closed.load(Ordering::SeqCst) {
            return Err(LinkError::Closed);
        }
        self.endpoint
            .outbound
            .lock()
            .expect("outbound lock poisoned")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn available(&self) -> usize {
        self.endpoint.inbound.lock().expect("inbound lock poisoned").len()
    }

    fn target(&self) -> TargetId {
        self.target
    }
}

impl Drop for MemoryLink {
    fn drop(&mut self) {
        self.endpoint.closed.store(true, Ordering::SeqCst);
        let mut state = self.medium.state.lock().expect("medium state lock poisoned");
        state.endpoints.remove(&self.target);
        let bound_addr = self.bound_addr.lock().expect("link addr lock poisoned");
        if let Some(addr) = bound_addr.as_ref() {
            if let Some(queue) = state.bound.get_mut(addr) {
                queue.retain(|target| *target != self.target);
                if queue.is_empty() {
                    state.bound.remove(addr);
                }
            }
        }
    }
}

/// Remote-side handle onto a claimed endpoint.
pub struct MemoryPeer {
    target: TargetId,
    endpoint: Arc<Endpoint>,
    dispatcher: Arc<dyn EventDispatcher>,
}

impl MemoryPeer {
    /// The target identity of the link this peer is attached to.
    pub fn target(&self) -> TargetId {
        self.target
    }

    /// Deliver `payload` to the link and raise its input-ready event.
    pub fn send(&self, payload: &[u8]) {
        if self.endpoint.closed.load(Ordering::SeqCst) {
            tracing::trace!(target_id = %self.target, "send on closed endpoint ignored");
            return;
        }
        self.endpoint
            .inbound
            .lock()
            .expect("inbound lock poisoned")
            .extend(payload.iter().copied());
        self.dispatcher.post(Event {
            kind: EventKind::InputReady,
            source: self.target,
        });
    }

    /// Drop the hop and raise the link's disconnected event.
    pub fn disconnect(&self) {
        self.endpoint.closed.store(true, Ordering::SeqCst);
        self.dispatcher.post(Event {
            kind: EventKind::Disconnected,
            source: self.target,
        });
    }

    /// Take every byte the link has written toward this peer so far.
    pub fn replies(&self) -> Vec<u8> {
        std::mem::take(&mut *self.endpoint.outbound.lock().expect("outbound lock poisoned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventBus;

    fn medium() -> (Arc<EventBus>, MemoryMedium) {
        let bus = EventBus::new();
        let dispatcher: Arc<dyn EventDispatcher> = bus.clone();
        (bus, MemoryMedium::new(dispatcher))
    }

    #[test]
    fn bind_then_connect_moves_bytes_both_ways() {
        let (_bus, medium) = medium();
        let link = medium.create_link();
        link.bind(&"alpha".to_string()).unwrap();

        let peer = medium.connect("alpha").expect("endpoint bound");
        peer.send(b"hello");
        assert_eq!(link.available(), 5);

        let mut buf = vec![0u8; link.available()];
        assert_eq!(link.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b"hello");
        assert_eq!(link.available(), 0);

        link.write(b"ok").unwrap();
        assert_eq!(peer.replies(), b"ok");
        assert!(peer.replies().is_empty());
    }

    #[test]
    fn connect_claims_oldest_endpoint_first() {
        let (_bus, medium) = medium();
        let first = medium.create_link();
        first.bind(&"shared".to_string()).unwrap();
        let second = medium.create_link();
        second.bind(&"shared".to_string()).unwrap();
        assert_eq!(medium.bound_count("shared"), 2);

        let peer_a = medium.connect("shared").unwrap();
        let peer_b = medium.connect("shared").unwrap();
        assert_eq!(peer_a.target(), first.target());
        assert_eq!(peer_b.target(), second.target());
        assert!(medium.connect("shared").is_none());
    }

    #[test]
    fn injected_bind_failures_are_consumed() {
        let (_bus, medium) = medium();
        medium.fail_next_binds(2);

        let addr = "flaky".to_string();
        assert!(medium.create_link().bind(&addr).is_err());
        assert!(medium.create_link().bind(&addr).is_err());
        medium.create_link().bind(&addr).unwrap();
        assert_eq!(medium.bind_attempts(), 3);
    }

    #[test]
    fn dropping_a_link_unbinds_it() {
        let (_bus, medium) = medium();
        let link = medium.create_link();
        link.bind(&"gone".to_string()).unwrap();
        drop(link);
        assert_eq!(medium.bound_count("gone"), 0);
        assert!(medium.connect("gone").is_none());
    }

    #[test]
    fn write_after_disconnect_fails() {
        let (_bus, medium) = medium();
        let link = medium.create_link();
        link.bind(&"drop".to_string()).unwrap();

        let peer = medium.connect("drop").unwrap();
        peer.disconnect();
        assert!(matches!(link.write(b"x"), Err(LinkError::Closed)));
    }
}
