//! Transport link subsystem.
//!
//! # Data Flow
//! ```text
//! LinkProvider::create_link()
//!     → DataLink (unbound)
//!     → bind(addr) — the link becomes reachable on the medium
//!     → peer writes → InputReady event posted with the link's TargetId
//!     → peer drops  → Disconnected event posted with the link's TargetId
//!
//! Byte transfer:
//!     available() reports readable bytes; read() drains them
//!     write() pushes reply bytes toward the peer
//! ```
//!
//! # Design Decisions
//! - The medium is a trait seam: production transports and the in-memory
//!   test medium implement the same contract
//! - Links carry a `TargetId` so event registrations survive the link
//!   object itself
//! - No framing: a link moves raw bytes, callers define payload shapes

pub mod memory;

pub use memory::{MemoryLink, MemoryMedium, MemoryPeer};

use std::fmt;
use std::hash::Hash;

use thiserror::Error;

use crate::event::TargetId;

/// Marker bounds for medium addresses.
///
/// Anything cloneable, hashable and printable can address an endpoint.
pub trait Address: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static> Address for T {}

/// Error type for link operations.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The medium refused to bind the link at the requested address.
    #[error("bind failed: {0}")]
    Bind(String),

    /// The link is closed; no further transfer is possible.
    #[error("link is closed")]
    Closed,

    /// A read or write failed mid-transfer.
    #[error("transfer failed: {0}")]
    Transfer(String),
}

/// One logical point-to-point connection over an addressed medium.
///
/// Implementations post `InputReady` and `Disconnected` events through
/// the dispatcher with [`DataLink::target`] as the event source.
pub trait DataLink: Send + Sync + 'static {
    /// The address type endpoints are identified by.
    type Addr: Address;

    /// Make this link reachable at `addr` on the medium.
    fn bind(&self, addr: &Self::Addr) -> Result<(), LinkError>;

    /// Drain up to `buf.len()` inbound bytes into `buf`; returns the count.
    fn read(&self, buf: &mut [u8]) -> Result<usize, LinkError>;

    /// Push `buf` toward the peer; returns the count written.
    fn write(&self, buf: &[u8]) -> Result<usize, LinkError>;

    /// Bytes currently available to read.
    fn available(&self) -> usize;

    /// The opaque event-target identity of this link.
    fn target(&self) -> TargetId;
}

/// Creates fresh, unbound links on a medium.
pub trait LinkProvider: Send + Sync + 'static {
    /// The address type of the medium.
    type Addr: Address;
    /// The link type the medium produces.
    type Link: DataLink<Addr = Self::Addr>;

    /// Create a new link. The link is not reachable until bound.
    fn create_link(&self) -> Self::Link;
}
