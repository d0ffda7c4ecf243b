//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, address parses)
//! - Reject log filters the subscriber would refuse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EngineConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::schema::EngineConfig;

/// A single semantic problem in a loaded config.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("server.bind_address {0:?} is not a socket address")]
    InvalidBindAddress(String),

    #[error("server.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("server.logging.level {level:?} is not a valid filter: {reason}")]
    InvalidLogLevel { level: String, reason: String },
}

/// Check an [`EngineConfig`], collecting every problem found.
pub fn validate_config(config: &EngineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let server = &config.server;

    if server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            server.bind_address.clone(),
        ));
    }

    if server.read_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("read_timeout_secs"));
    }
    if server.write_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("write_timeout_secs"));
    }

    if let Err(e) = EnvFilter::try_new(&server.logging.level) {
        errors.push(ValidationError::InvalidLogLevel {
            level: server.logging.level.clone(),
            reason: e.to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
