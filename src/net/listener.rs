//! Rendezvous listener over an addressed point-to-point medium.
//!
//! # Responsibilities
//! - Turn raw bind-at-an-address links into an accept-queue abstraction
//! - Drive the handshake on every bound link
//! - Re-arm a bind slot whenever a tracked link disconnects
//!
//! # Design Decisions
//! - The dispatcher is injected at construction; the listener registers
//!   and removes its own handlers through it
//! - Unregistration happens by raw `TargetId`, so a handler can be
//!   removed for a link that no longer exists
//! - `accept` transfers full ownership: the returned link is no longer
//!   tracked, and its future disconnects are the caller's to handle

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::config::{ListenerConfig, RespawnConfig};
use crate::event::{DispatchError, Event, EventDispatcher, EventKind, TargetId};
use crate::link::{DataLink, LinkError, LinkProvider};
use crate::net::handshake::{Handshake, HandshakeOutcome};
use crate::resilience::Backoff;

const STATE_LOCK: &str = "listener state lock poisoned";

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// `accept` was called with an empty waiting queue. Call it once per
    /// connection-pending notification.
    #[error("no pending connection to accept")]
    NoPendingConnection,

    /// Handler registration failed while arming a bind slot.
    #[error(transparent)]
    Register(#[from] DispatchError),

    /// The medium refused an operation.
    #[error(transparent)]
    Link(#[from] LinkError),
}

/// A rendezvous listener: binds links, shepherds them through the
/// handshake, queues them for `accept`, and respawns slots on disconnect.
pub struct RendezvousListener<P: LinkProvider> {
    inner: Arc<Inner<P>>,
}

struct Inner<P: LinkProvider> {
    /// Registration target for connection-pending notifications.
    target: TargetId,
    provider: P,
    dispatcher: Arc<dyn EventDispatcher>,
    handshake: Handshake,
    respawn: RespawnConfig,
    state: Mutex<State<P>>,
}

struct State<P: LinkProvider> {
    /// Bound links still mid-handshake, by target identity.
    pending: HashMap<TargetId, Arc<P::Link>>,
    /// Handshake-complete links awaiting accept, oldest first.
    waiting: VecDeque<Arc<P::Link>>,
    /// Bind address of every tracked link, pending or waiting.
    addresses: HashMap<TargetId, P::Addr>,
}

impl<P: LinkProvider> State<P> {
    fn new() -> Self {
        Self {
            pending: HashMap::new(),
            waiting: VecDeque::new(),
            addresses: HashMap::new(),
        }
    }
}

impl<P: LinkProvider> RendezvousListener<P> {
    /// Create a listener on `provider`, dispatching through `dispatcher`.
    pub fn new(provider: P, dispatcher: Arc<dyn EventDispatcher>, config: &ListenerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                target: TargetId::next(),
                provider,
                dispatcher,
                handshake: Handshake::from_config(&config.handshake),
                respawn: config.respawn.clone(),
                state: Mutex::new(State::new()),
            }),
        }
    }

    /// The registration target for this listener's connection-pending
    /// notifications.
    pub fn target(&self) -> TargetId {
        self.inner.target
    }

    /// Arm a bind slot at `addr`.
    ///
    /// Binding the same address twice creates two independent slots.
    /// On failure every completed setup step is unwound and the error is
    /// returned; no partial state survives.
    pub fn bind(&self, addr: &P::Addr) -> Result<(), ListenerError> {
        Inner::bind(&self.inner, addr)
    }

    /// Dequeue the oldest handshake-complete link.
    ///
    /// Writes the accept acknowledgment to the link and transfers its
    /// ownership to the caller. Errors with
    /// [`ListenerError::NoPendingConnection`] when nothing is waiting.
    pub fn accept(&self) -> Result<Arc<P::Link>, ListenerError> {
        let mut state = self.inner.state.lock().expect(STATE_LOCK);
        let Some(link) = state.waiting.pop_front() else {
            return Err(ListenerError::NoPendingConnection);
        };
        let target = link.target();

        // Ownership transfers to the caller, disconnect handling included.
        self.inner.dispatcher.remove(EventKind::Disconnected, target);
        state.addresses.remove(&target);

        if let Err(err) = link.write(self.inner.handshake.accept_ack()) {
            tracing::warn!(target_id = %target, error = %err, "accept acknowledgment failed, dropping link");
            return Err(err.into());
        }

        tracing::debug!(target_id = %target, "connection accepted");
        Ok(link)
    }

    /// Destroy every tracked link and clear all listener state.
    ///
    /// Idempotent. Links already handed out via `accept` are untouched.
    pub fn close(&self) {
        self.inner.close();
    }

    /// Number of links awaiting handshake.
    pub fn pending_count(&self) -> usize {
        self.inner.state.lock().expect(STATE_LOCK).pending.len()
    }

    /// Number of handshake-complete links awaiting accept.
    pub fn waiting_count(&self) -> usize {
        self.inner.state.lock().expect(STATE_LOCK).waiting.len()
    }

    /// Target identities of the links awaiting handshake.
    pub fn pending_ids(&self) -> Vec<TargetId> {
        self.inner
            .state
            .lock()
            .expect(STATE_LOCK)
            .pending
            .keys()
            .copied()
            .collect()
    }

    /// Target identities of the links awaiting accept, oldest first.
    pub fn waiting_ids(&self) -> Vec<TargetId> {
        self.inner
            .state
            .lock()
            .expect(STATE_LOCK)
            .waiting
            .iter()
            .map(|link| link.target())
            .collect()
    }

    /// The address a tracked link is bound at, if it is still tracked.
    pub fn bound_address(&self, target: TargetId) -> Option<P::Addr> {
        self.inner
            .state
            .lock()
            .expect(STATE_LOCK)
            .addresses
            .get(&target)
            .cloned()
    }
}

impl<P: LinkProvider> Drop for RendezvousListener<P> {
    fn drop(&mut self) {
        self.inner.close();
    }
}

impl<P: LinkProvider> Inner<P> {
    /// Full bind sequence under the state lock: create, register both
    /// handlers, bind, track. Rollback is the reverse of whatever
    /// completed.
    fn bind(this: &Arc<Self>, addr: &P::Addr) -> Result<(), ListenerError> {
        let mut state = this.state.lock().expect(STATE_LOCK);

        let link = Arc::new(this.provider.create_link());
        let target = link.target();

        let weak = Arc::downgrade(this);
        let handshake_link = Arc::clone(&link);
        this.dispatcher.register(
            EventKind::InputReady,
            target,
            Box::new(move |_event| {
                if let Some(inner) = weak.upgrade() {
                    inner.handle_input_ready(&handshake_link);
                }
            }),
        )?;

        let weak = Arc::downgrade(this);
        if let Err(err) = this.dispatcher.register(
            EventKind::Disconnected,
            target,
            Box::new(move |event| {
                if let Some(inner) = weak.upgrade() {
                    Inner::handle_disconnected(&inner, event.source);
                }
            }),
        ) {
            this.dispatcher.remove(EventKind::InputReady, target);
            return Err(err.into());
        }

        if let Err(err) = link.bind(addr) {
            this.dispatcher.remove(EventKind::Disconnected, target);
            this.dispatcher.remove(EventKind::InputReady, target);
            tracing::warn!(target_id = %target, addr = ?addr, error = %err, "bind failed, setup rolled back");
            return Err(err.into());
        }

        state.pending.insert(target, Arc::clone(&link));
        state.addresses.insert(target, addr.clone());

        tracing::debug!(target_id = %target, addr = ?addr, "link bound, awaiting handshake");
        Ok(())
    }

    /// Input-ready handler: read what the link has, classify, promote or
    /// reject.
    fn handle_input_ready(&self, link: &Arc<P::Link>) {
        let target = link.target();

        let mut payload = vec![0u8; link.available()];
        match link.read(&mut payload) {
            Ok(count) => payload.truncate(count),
            Err(err) => {
                tracing::warn!(target_id = %target, error = %err, "handshake read failed");
                return;
            }
        }

        match self.handshake.classify(&payload) {
            HandshakeOutcome::Connect => {
                let mut state = self.state.lock().expect(STATE_LOCK);
                let Some(link) = state.pending.remove(&target) else {
                    // Stale event: the link was closed or respawned after
                    // this notification was posted.
                    return;
                };
                // One-shot handshake: no more unsolicited reads expected
                // before accept.
                self.dispatcher.remove(EventKind::InputReady, target);
                state.waiting.push_back(link);
                self.dispatcher.post(Event {
                    kind: EventKind::ConnectionPending,
                    source: self.target,
                });
                tracing::debug!(target_id = %target, "handshake complete, link awaiting accept");
            }
            HandshakeOutcome::Mismatch => {
                let state = self.state.lock().expect(STATE_LOCK);
                if !state.pending.contains_key(&target) {
                    return;
                }
                if let Err(err) = link.write(self.handshake.reject()) {
                    tracing::warn!(target_id = %target, error = %err, "reject reply failed");
                } else {
                    tracing::debug!(target_id = %target, "handshake mismatch, reject sent");
                }
            }
        }
    }

    /// Disconnect handler: destroy the dead link and re-arm its slot.
    fn handle_disconnected(this: &Arc<Self>, target: TargetId) {
        // The link object may already be unusable; unregister by raw
        // identity only.
        this.dispatcher.remove(EventKind::Disconnected, target);

        let addr = {
            let mut state = this.state.lock().expect(STATE_LOCK);
            let removed = if let Some(link) = state.pending.remove(&target) {
                this.dispatcher.remove(EventKind::InputReady, target);
                Some(link)
            } else if let Some(index) = state
                .waiting
                .iter()
                .position(|link| link.target() == target)
            {
                state.waiting.remove(index)
            } else {
                // Accepted or closed since the event was posted; the
                // listener no longer owns this link.
                None
            };
            let Some(dead_link) = removed else {
                return;
            };
            // The dead link is destroyed before its replacement is bound.
            drop(dead_link);
            state.addresses.remove(&target)
        };

        let Some(addr) = addr else {
            tracing::warn!(target_id = %target, "disconnected link had no tracked address, slot not respawned");
            return;
        };

        tracing::info!(target_id = %target, addr = ?addr, "link disconnected, respawning bind slot");
        // The handler's own lock scope has ended; the nested bind takes a
        // fresh one.
        if let Err(err) = Inner::bind(this, &addr) {
            tracing::warn!(addr = ?addr, error = %err, "respawn bind failed, scheduling retries");
            Inner::spawn_respawn_retry(this, addr);
        }
    }

    /// Retry a failed respawn in the background with jittered backoff.
    fn spawn_respawn_retry(this: &Arc<Self>, addr: P::Addr) {
        if this.respawn.max_attempts == 0 {
            tracing::error!(addr = ?addr, "respawn retries disabled, bind slot lost");
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::error!(addr = ?addr, "no async runtime for respawn retries, bind slot lost");
            return;
        };

        let weak = Arc::downgrade(this);
        let respawn = this.respawn.clone();
        runtime.spawn(async move {
            let mut backoff = Backoff::new(respawn.base_delay_ms, respawn.max_delay_ms);
            for attempt in 1..=respawn.max_attempts {
                tokio::time::sleep(backoff.next_delay()).await;
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                match Inner::bind(&inner, &addr) {
                    Ok(()) => {
                        tracing::info!(attempt, addr = ?addr, "respawn retry re-armed bind slot");
                        return;
                    }
                    Err(err) => {
                        tracing::warn!(attempt, addr = ?addr, error = %err, "respawn retry failed");
                    }
                }
            }
            tracing::error!(
                attempts = respawn.max_attempts,
                addr = ?addr,
                "respawn retries exhausted, bind slot lost"
            );
        });
    }

    fn close(&self) {
        let mut state = self.state.lock().expect(STATE_LOCK);
        let dropped = state.pending.len() + state.waiting.len();

        for (target, _link) in state.pending.drain() {
            self.dispatcher.remove(EventKind::InputReady, target);
            self.dispatcher.remove(EventKind::Disconnected, target);
        }
        for link in state.waiting.drain(..) {
            self.dispatcher.remove(EventKind::Disconnected, link.target());
        }
        state.addresses.clear();

        if dropped > 0 {
            tracing::debug!(links = dropped, "listener closed, tracked links destroyed");
        }
    }
}
