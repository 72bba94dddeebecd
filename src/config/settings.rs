//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Upper bound for the per-call handler timeout (one hour).
pub const MAX_CALL_TIMEOUT_MS: u64 = 3_600_000;

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

    /// Path to the declarative tool catalog.
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,

    /// Dispatcher settings.
    #[serde(default)]
    pub server: ServerConfig,

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
        self.server.validate()
    }
}

/// Dispatcher configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Maximum time a single tool handler may run, in milliseconds.
    /// Default: 30000
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

impl ServerConfig {
    /// Returns the handler timeout as a [`Duration`].
    #[must_use]
    pub const fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Validates the dispatcher settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the timeout is zero or larger than one hour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.call_timeout_ms == 0 || self.call_timeout_ms > MAX_CALL_TIMEOUT_MS {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid call_timeout_ms {}. Must be between 1 and {MAX_CALL_TIMEOUT_MS}",
                    self.call_timeout_ms
                ),
            });
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: default_call_timeout_ms(),
        }
    }
}

const fn default_call_timeout_ms() -> u64 {
    30_000
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
