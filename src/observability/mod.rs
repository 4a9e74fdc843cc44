//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!
//! Consumers:
//!     → stdout via tracing-subscriber fmt layer
//!     → level selection via RUST_LOG / EnvFilter
//! ```
//!
//! # Design Decisions
//! - Structured fields over formatted strings
//! - Handler-path failures log and recover; they never panic the pump

pub mod logging;
