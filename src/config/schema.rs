//! Configuration schema definitions.
//!
//! This module defines the configuration structure for the routing engine.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::http::middleware::cors::HttpResponseConfig;

/// Root configuration for the routing engine.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Server settings (bind address, timeouts, logging).
    pub server: ServerConfig,

    /// Optional CORS preflight handler.
    pub cors: Option<HttpResponseConfig>,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum time to read a request body.
    pub read_timeout_secs: u64,

    /// Maximum time to produce a response.
    pub write_timeout_secs: u64,

    /// Redirect trailing-slash variants to the registered pattern.
    pub strict_slash: bool,

    /// Logging settings.
    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            read_timeout_secs: 15,
            write_timeout_secs: 15,
            strict_slash: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Bind on all interfaces at `port` with default timeouts.
    pub fn for_port(port: u16, strict_slash: bool) -> Self {
        Self {
            bind_address: format!("0.0.0.0:{port}"),
            strict_slash,
            ..Self::default()
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,

    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "routing_engine=info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, for development.
    #[default]
    Pretty,
    /// One JSON object per line, for log shippers.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert_eq!(config.server.read_timeout(), Duration::from_secs(15));
        assert_eq!(config.server.write_timeout(), Duration::from_secs(15));
        assert!(!config.server.strict_slash);
        assert_eq!(config.server.logging.format, LogFormat::Pretty);
        assert!(config.cors.is_none());
    }

    #[test]
    fn test_for_port() {
        let config = ServerConfig::for_port(9000, true);
        assert_eq!(config.bind_address, "0.0.0.0:9000");
        assert!(config.strict_slash);
        assert_eq!(config.write_timeout_secs, 15);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            [server]
            strict_slash = true

            [server.logging]
            format = "json"

            [cors]
            allow_origin = "*"
            allow_methods = ["GET", "OPTIONS"]
            "#,
        )
        .unwrap();

        assert!(config.server.strict_slash);
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert_eq!(config.server.logging.format, LogFormat::Json);
        assert_eq!(config.server.logging.level, "routing_engine=info");

        let cors = config.cors.unwrap();
        assert_eq!(cors.allow_origin, "*");
        assert_eq!(cors.allow_methods, vec!["GET", "OPTIONS"]);
        assert!(cors.allow_headers.is_empty());
    }
}
