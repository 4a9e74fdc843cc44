//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ListenerConfig (validated, immutable)
//!     → handed to the listener at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a new listener
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{HandshakeConfig, ListenerConfig, RespawnConfig};
pub use validation::{validate_config, ValidationError};
