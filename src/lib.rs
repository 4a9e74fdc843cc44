//! Rendezvous listener library.
//!
//! Turns a raw "bind at an address" transport primitive into a
//! TCP-listener-like abstraction: a handshake protocol, a FIFO accept
//! queue, and automatic respawn of the listening endpoint after a
//! disconnect.
//!
//! # Architecture Overview
//!
//! ```text
//!   application            RendezvousListener                medium
//!   ───────────            ──────────────────                ──────
//!   bind(addr) ──────────▶ create link, register handlers ─▶ link bound
//!                          [Pending]
//!                                        ◀── input-ready ─── peer bytes
//!                          classify handshake payload
//!                          [Waiting] ── connection-pending ─▶ (event)
//!   accept()  ◀─────────── pop oldest, write accept ack
//!                                        ◀── disconnected ── peer drop
//!                          destroy link, re-bind same addr
//!                          [Pending again]
//! ```
//!
//! The event dispatcher and the transport medium are trait seams
//! ([`event::EventDispatcher`], [`link::DataLink`] /
//! [`link::LinkProvider`]); the crate ships an in-process
//! implementation of each ([`event::EventBus`], [`link::MemoryMedium`]).

// Core subsystems
pub mod event;
pub mod link;
pub mod net;

// Cross-cutting concerns
pub mod config;
pub mod observability;
pub mod resilience;

pub use config::ListenerConfig;
pub use net::listener::{ListenerError, RendezvousListener};
