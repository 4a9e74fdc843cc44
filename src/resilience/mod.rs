//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Disconnect handler re-bind fails:
//!     → backoff.rs schedules the retry cadence
//!     → listener retry task sleeps, re-attempts bind
//!     → success re-arms the slot; exhaustion is logged and gives up
//! ```
//!
//! # Design Decisions
//! - Delays double per attempt up to a hard ceiling
//! - Jitter spreads simultaneous respawns of many slots apart

pub mod backoff;

pub use backoff::Backoff;
