//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! listener. All types derive Serde traits for deserialization from
//! config files.

use serde::{Deserialize, Serialize};

use crate::net::handshake;

/// Root configuration for a rendezvous listener.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ListenerConfig {
    /// Handshake wire sentinels.
    pub handshake: HandshakeConfig,

    /// Respawn retry policy for bind slots lost to transient failures.
    pub respawn: RespawnConfig,
}

/// The three fixed wire payloads of the handshake exchange.
///
/// These bytes are a contract with the peer implementation; change them
/// only in lockstep with every deployed peer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HandshakeConfig {
    /// Payload a peer sends to request promotion to a connection.
    pub connect_request: String,

    /// Payload written back when the application accepts the link.
    pub accept_ack: String,

    /// Payload written back when a handshake attempt does not match.
    pub reject: String,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            connect_request: handshake::DEFAULT_CONNECT_REQUEST.to_string(),
            accept_ack: handshake::DEFAULT_ACCEPT_ACK.to_string(),
            reject: handshake::DEFAULT_REJECT.to_string(),
        }
    }
}

/// Retry policy applied when re-binding a slot fails after a disconnect.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RespawnConfig {
    /// Retry attempts after the initial failed re-bind (0 disables retries).
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,

    /// Ceiling on the backoff delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RespawnConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 50,
            max_delay_ms: 2_000,
        }
    }
}
