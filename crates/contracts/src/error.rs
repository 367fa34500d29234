//! Layered error definitions
//!
//! Categorized by source: config / link / handshake / sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum BridgeError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Link Errors =====
    /// Transport could not be opened
    #[error("cannot open device link '{port}': {message}")]
    LinkOpen { port: String, message: String },

    /// Transport read failure
    #[error("device link read error: {message}")]
    LinkRead { message: String },

    /// Command write failure
    #[error("command write error for {command}: {message}")]
    CommandWrite { command: String, message: String },

    // ===== Handshake Errors =====
    /// No flash configuration response within the deadline
    #[error("flash config handshake timed out after {waited_ms}ms; device unreachable")]
    HandshakeTimeout { waited_ms: u64 },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    /// Sink connection error
    #[error("sink '{sink_name}' connection error: {message}")]
    SinkConnection { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl BridgeError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create link open error
    pub fn link_open(port: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LinkOpen {
            port: port.into(),
            message: message.into(),
        }
    }

    /// Create link read error
    pub fn link_read(message: impl Into<String>) -> Self {
        Self::LinkRead {
            message: message.into(),
        }
    }

    /// Create command write error
    pub fn command_write(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommandWrite {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}
