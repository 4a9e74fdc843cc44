//! Handshake wire sentinels and classification.
//!
//! # Responsibilities
//! - Hold the three wire payloads as configured, opaque byte sequences
//! - Classify inbound payloads against the connect request
//!
//! The sentinels are an external contract with peer implementations:
//! use the configured values everywhere, never inline literals.

use crate::config::HandshakeConfig;

/// Default connect-request payload.
pub const DEFAULT_CONNECT_REQUEST: &str = "RDV_CONNECT";
/// Default accept-acknowledgment payload.
pub const DEFAULT_ACCEPT_ACK: &str = "RDV_ACCEPT";
/// Default reject payload.
pub const DEFAULT_REJECT: &str = "RDV_REJECT";

/// Result of classifying one inbound handshake payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// The payload is exactly the connect request.
    Connect,
    /// Anything else; answered with the reject sentinel.
    Mismatch,
}

/// The handshake sentinels a listener speaks, resolved from config.
#[derive(Debug, Clone)]
pub struct Handshake {
    connect_request: Vec<u8>,
    accept_ack: Vec<u8>,
    reject: Vec<u8>,
}

impl Handshake {
    /// Resolve the wire payloads from configuration.
    pub fn from_config(config: &HandshakeConfig) -> Self {
        Self {
            connect_request: config.connect_request.clone().into_bytes(),
            accept_ack: config.accept_ack.clone().into_bytes(),
            reject: config.reject.clone().into_bytes(),
        }
    }

    /// Classify one inbound payload. Exact match only; a connect request
    /// split across two reads does not promote.
    pub fn classify(&self, payload: &[u8]) -> HandshakeOutcome {
        if payload == self.connect_request.as_slice() {
            HandshakeOutcome::Connect
        } else {
            HandshakeOutcome::Mismatch
        }
    }

    /// The acknowledgment written to an accepted link.
    pub fn accept_ack(&self) -> &[u8] {
        &self.accept_ack
    }

    /// The reply written on a handshake mismatch.
    pub fn reject(&self) -> &[u8] {
        &self.reject
    }
}

impl Default for Handshake {
    fn default() -> Self {
        Self::from_config(&HandshakeConfig::default())
    }
}
