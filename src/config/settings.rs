//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ConfigError;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Data store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.socket_addr()?;

        if self.store.timeout_secs == 0 {
            return Err(ConfigError::ValidationError {
                message: "store.timeout_secs must be greater than zero".to_string(),
            });
        }

        match self.store.backend {
            StoreBackend::Postgrest => {
                if self.store.url.as_deref().map_or(true, str::is_empty) {
                    return Err(ConfigError::ValidationError {
                        message: "store.url is required for the postgrest backend".to_string(),
                    });
                }
                if self.store.api_key.as_deref().map_or(true, str::is_empty) {
                    return Err(ConfigError::ValidationError {
                        message: "store.api_key is required for the postgrest backend"
                            .to_string(),
                    });
                }
            }
            StoreBackend::Fixture => {
                if self.store.fixture_path.is_none() {
                    return Err(ConfigError::ValidationError {
                        message: "store.fixture_path is required for the fixture backend"
                            .to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the endpoint listens on.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl ServerConfig {
    /// Parses the bind address.
    ///
    /// # Errors
    ///
    /// Returns an error if `bind` is not a valid socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|_| ConfigError::ValidationError {
                message: format!(
                    "Invalid bind address '{}'. Expected host:port, e.g. 0.0.0.0:8080",
                    self.bind
                ),
            })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

/// Which store implementation backs the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// A PostgREST endpoint over HTTP.
    #[default]
    Postgrest,
    /// A JSON snapshot loaded into memory at startup.
    Fixture,
}

/// Data store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Store implementation.
    #[serde(default)]
    pub backend: StoreBackend,

    /// Base URL of the PostgREST service (without `/rest/v1`).
    #[serde(default)]
    pub url: Option<String>,

    /// Anonymous (read-only) API key.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Path to a JSON snapshot for the fixture backend.
    #[serde(default)]
    pub fixture_path: Option<PathBuf>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: None,
            api_key: None,
            fixture_path: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

const fn default_timeout_secs() -> u64 {
    10
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
