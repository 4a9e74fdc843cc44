//! Event dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Producer (link, peer, listener)
//!     → post(Event { kind, source })
//!     → queue (FIFO)
//!     → pump (background task or explicit drain)
//!     → handler registered for (kind, source)
//!
//! Registration keys:
//!     (EventKind, TargetId) → exactly one handler
//! ```
//!
//! # Design Decisions
//! - The dispatcher is injected wherever it is consumed; there is no
//!   process-global event queue
//! - Removal takes a plain `TargetId` and only compares identity, so a
//!   handler can be unregistered for an endpoint that no longer exists
//! - Handlers run on the pump's thread; they must not block on the pump

pub mod bus;

pub use bus::EventBus;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

/// Global atomic counter for event targets.
/// Relaxed ordering is sufficient; only uniqueness is required.
static TARGET_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of an event target (a link or a listener).
///
/// Valid as a registration key even after the endpoint it named is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(u64);

impl TargetId {
    /// Allocate a fresh, process-unique target identity.
    pub fn next() -> Self {
        Self(TARGET_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target-{}", self.0)
    }
}

/// The notification kinds flowing through the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A link has inbound bytes ready to read.
    InputReady,
    /// A link's remote side went away.
    Disconnected,
    /// A listener holds a handshake-complete link awaiting `accept`.
    ConnectionPending,
}

/// A posted notification: what happened, and to whom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    /// The notification kind.
    pub kind: EventKind,
    /// The endpoint the notification originates from.
    pub source: TargetId,
}

/// Callback invoked when a matching event is dispatched.
pub type HandlerFn = dyn Fn(&Event) + Send + Sync;

/// Error type for dispatcher registration.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A handler is already registered for this (kind, target) pair.
    #[error("a handler is already registered for {kind:?} on {target}")]
    DuplicateHandler {
        /// The event kind of the rejected registration.
        kind: EventKind,
        /// The target of the rejected registration.
        target: TargetId,
    },
}

/// Maps (event kind, target) pairs to handler callbacks and invokes them
/// asynchronously when matching events are posted.
pub trait EventDispatcher: Send + Sync {
    /// Register `handler` for events of `kind` originating from `target`.
    ///
    /// At most one handler per (kind, target) pair.
    fn register(
        &self,
        kind: EventKind,
        target: TargetId,
        handler: Box<HandlerFn>,
    ) -> Result<(), DispatchError>;

    /// Remove the handler registered for (kind, target), if any.
    ///
    /// Returns whether a registration was removed. Never dereferences the
    /// target; identity comparison only.
    fn remove(&self, kind: EventKind, target: TargetId) -> bool;

    /// Enqueue an event for asynchronous dispatch.
    fn post(&self, event: Event);
}
