//! Error types for mcp-tool-server.
//!
//! Startup errors live here: configuration, catalog loading and handler
//! registration. They are all fatal; the server refuses to start when any
//! of them occur. Per-request failures are modelled separately by
//! [`crate::mcp::dispatcher::CallError`] and never stop the session.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors raised while loading the tool catalog.
#[derive(Error, Debug)]
pub enum SchemaLoadError {
    /// Catalog file could not be read.
    #[error("failed to read tool catalog: {path}")]
    Read {
        /// Path to the catalog file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Catalog document is not valid JSON or does not have the catalog shape.
    #[error("malformed tool catalog: {source}")]
    Parse {
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Catalog document parsed but violates a structural rule.
    #[error("malformed tool catalog: {message}")]
    Malformed {
        /// Description of the problem.
        message: String,
    },

    /// Two tool entries share the same name.
    #[error("duplicate tool name in catalog: {name}")]
    DuplicateTool {
        /// The repeated tool name.
        name: String,
    },

    /// A tool's input or output schema is not a well-formed contract.
    #[error("invalid {field} for tool '{tool}' at '{path}': {message}")]
    InvalidContract {
        /// Tool the schema belongs to.
        tool: String,
        /// Which schema was rejected (`inputSchema` or `outputSchema`).
        field: &'static str,
        /// Location inside the schema document.
        path: String,
        /// Description of the problem.
        message: String,
    },
}

/// Errors raised while building the handler registry.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// A handler with this name was already registered.
    #[error("handler already registered: {name}")]
    DuplicateHandler {
        /// The repeated handler name.
        name: String,
    },

    /// A handler was registered for a tool the catalog does not declare.
    #[error("handler '{name}' has no matching tool in the catalog")]
    UndeclaredHandler {
        /// The orphaned handler name.
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let error = ConfigError::NotFound {
            path: PathBuf::from("/path/to/config.json"),
        };
        let msg = error.to_string();
        assert!(msg.contains("not found"));
        assert!(msg.contains("config.json"));
    }

    #[test]
    fn validation_error_display() {
        let error = ConfigError::ValidationError {
            message: "invalid setting".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("invalid setting"));
    }

    #[test]
    fn invalid_contract_display_names_tool_and_field() {
        let error = SchemaLoadError::InvalidContract {
            tool: "echo".to_string(),
            field: "inputSchema",
            path: "properties.text".to_string(),
            message: "unsupported type 'strng'".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("inputSchema"));
        assert!(msg.contains("'echo'"));
        assert!(msg.contains("properties.text"));
    }

    #[test]
    fn duplicate_handler_display() {
        let error = RegistryError::DuplicateHandler {
            name: "echo".to_string(),
        };
        assert_eq!(error.to_string(), "handler already registered: echo");
    }
}
