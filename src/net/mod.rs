//! Rendezvous listening subsystem.
//!
//! # Data Flow
//! ```text
//! bind(addr)
//!     → provider creates a link, handlers registered, link bound
//!     → Pending (awaiting handshake)
//!     → input-ready: payload == connect request → Waiting, connection-pending raised
//!                    payload != connect request → reject written, still Pending
//!     → accept(): pop oldest Waiting, write accept ack, hand link to caller
//!
//! Disconnect (from Pending or Waiting):
//!     → dead link destroyed, fresh link bound at the same address
//!
//! Link States:
//!     Pending → Waiting → accepted (caller-owned)
//!     any tracked state → respawned Pending on disconnect
//! ```
//!
//! # Design Decisions
//! - One exclusive lock owns all three state containers
//! - Handshake is one-shot: the input-ready registration is removed the
//!   moment a link promotes to Waiting
//! - A disconnect never surfaces to the application; the slot self-heals

pub mod handshake;
pub mod listener;

pub use handshake::{Handshake, HandshakeOutcome};
pub use listener::{ListenerError, RendezvousListener};
