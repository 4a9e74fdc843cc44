//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the handshake sentinels are distinguishable on the wire
//! - Validate value ranges for the respawn policy
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: ListenerConfig → Result<(), Vec<ValidationError>>
//! - Runs before a config is accepted into the system

use std::fmt;

use crate::config::schema::ListenerConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A handshake sentinel is empty and could never match on the wire.
    EmptyHandshakePayload(&'static str),
    /// Connect request and reject are identical; every handshake would
    /// be answered with its own request.
    AmbiguousHandshake,
    /// The respawn base delay is zero while retries are enabled.
    ZeroRespawnDelay,
    /// The respawn base delay exceeds its ceiling.
    InvertedRespawnDelays,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyHandshakePayload(field) => {
                write!(f, "handshake.{} must not be empty", field)
            }
            ValidationError::AmbiguousHandshake => {
                write!(f, "handshake.connect_request and handshake.reject must differ")
            }
            ValidationError::ZeroRespawnDelay => {
                write!(f, "respawn.base_delay_ms must be nonzero when retries are enabled")
            }
            ValidationError::InvertedRespawnDelays => {
                write!(f, "respawn.base_delay_ms must not exceed respawn.max_delay_ms")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ListenerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (field, value) in [
        ("connect_request", &config.handshake.connect_request),
        ("accept_ack", &config.handshake.accept_ack),
        ("reject", &config.handshake.reject),
    ] {
        if value.is_empty() {
            errors.push(ValidationError::EmptyHandshakePayload(field));
        }
    }
    if !config.handshake.connect_request.is_empty()
        && config.handshake.connect_request == config.handshake.reject
    {
        errors.push(ValidationError::AmbiguousHandshake);
    }

    if config.respawn.max_attempts > 0 && config.respawn.base_delay_ms == 0 {
        errors.push(ValidationError::ZeroRespawnDelay);
    }
    if config.respawn.base_delay_ms > config.respawn.max_delay_ms {
        errors.push(ValidationError::InvertedRespawnDelays);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
