//! Queue-backed event bus.
//!
//! # Responsibilities
//! - Hold handler registrations keyed by (kind, target)
//! - Queue posted events in FIFO order
//! - Dispatch events either from a background pump task or on demand
//!   (`dispatch_pending`) for deterministic tests

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, Notify};

use crate::event::{DispatchError, Event, EventDispatcher, EventKind, HandlerFn, TargetId};

/// An [`EventDispatcher`] backed by an in-process FIFO queue.
///
/// Events are never dispatched inline from `post`; they are queued and
/// delivered by whichever pump drains the queue. Handlers therefore run
/// decoupled from the code that raised the event, which is what lets the
/// listener's handlers and its direct callers contend on one lock without
/// re-entrancy.
pub struct EventBus {
    /// Handler registrations. Locked briefly around lookup/mutation; the
    /// lock is never held across a handler invocation.
    handlers: Mutex<HashMap<(EventKind, TargetId), Arc<HandlerFn>>>,
    /// Posted, not-yet-dispatched events.
    queue: Mutex<VecDeque<Event>>,
    /// Wakes the pump task when the queue goes non-empty.
    wakeup: Notify,
}

impl EventBus {
    /// Create a new bus with no registrations and an empty queue.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            handlers: Mutex::new(HashMap::new()),
            queue: Mutex::new(VecDeque::new()),
            wakeup: Notify::new(),
        })
    }

    /// Drain the queue on the caller's thread, invoking handlers inline.
    ///
    /// Returns the number of events dispatched, including events posted by
    /// the handlers themselves during the drain.
    pub fn dispatch_pending(&self) -> usize {
        let mut dispatched = 0;
        while self.dispatch_one() {
            dispatched += 1;
        }
        dispatched
    }

    /// Dispatch the oldest queued event, if any.
    fn dispatch_one(&self) -> bool {
        let event = {
            let mut queue = self.queue.lock().expect("event queue lock poisoned");
            queue.pop_front()
        };
        let Some(event) = event else {
            return false;
        };

        let handler = {
            let handlers = self.handlers.lock().expect("handler table lock poisoned");
            handlers.get(&(event.kind, event.source)).cloned()
        };
        match handler {
            Some(handler) => (*handler)(&event),
            None => {
                tracing::trace!(
                    kind = ?event.kind,
                    source = %event.source,
                    "no handler registered, dropping event"
                );
            }
        }
        true
    }

    /// Pump the queue until the shutdown signal fires.
    ///
    /// Run as a background task: `tokio::spawn(bus.clone().run(shutdown))`.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        tracing::debug!("event bus pump starting");
        loop {
            tokio::select! {
                _ = self.wakeup.notified() => {
                    while self.dispatch_one() {}
                }
                _ = shutdown.recv() => {
                    tracing::debug!("event bus received shutdown signal, exiting pump");
                    break;
                }
            }
        }
    }

    /// Number of live handler registrations.
    pub fn handler_count(&self) -> usize {
        self.handlers.lock().expect("handler table lock poisoned").len()
    }

    /// Whether a handler is registered for (kind, target).
    pub fn has_handler(&self, kind: EventKind, target: TargetId) -> bool {
        self.handlers
            .lock()
            .expect("handler table lock poisoned")
            .contains_key(&(kind, target))
    }
}

impl EventDispatcher for EventBus {
    fn register(
        &self,
        kind: EventKind,
        target: TargetId,
        handler: Box<HandlerFn>,
    ) -> Result<(), DispatchError> {
        let mut handlers = self.handlers.lock().expect("handler table lock poisoned");
        if handlers.contains_key(&(kind, target)) {
            return Err(DispatchError::DuplicateHandler { kind, target });
        }
        handlers.insert((kind, target), Arc::from(handler));
        Ok(())
    }

    fn remove(&self, kind: EventKind, target: TargetId) -> bool {
        self.handlers
            .lock()
            .expect("handler table lock poisoned")
            .remove(&(kind, target))
            .is_some()
    }

    fn post(&self, event: Event) {
        self.queue
            .lock()
            .expect("event queue lock poisoned")
            .push_back(event);
        self.wakeup.notify_one();
    }
}
