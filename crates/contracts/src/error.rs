//! Layered error definitions
//!
//! Categorized by source: config / record / session / sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
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

    // ===== Record Errors =====
    /// Raw record line could not be decoded
    #[error("record decode error: {message}")]
    RecordDecode { message: String },

    /// Transformer failed to build a structured representation
    #[error("transform error for sender '{sender}': {message}")]
    Transform { sender: String, message: String },

    // ===== Remote Session Errors =====
    /// Remote session could not be opened
    #[error("session open error: {message}")]
    SessionOpen { message: String },

    /// Push request failed before a response was decoded
    #[error("push to '{endpoint}' failed: {message}")]
    Push { endpoint: String, message: String },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
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

    /// Create record decode error
    pub fn record_decode(message: impl Into<String>) -> Self {
        Self::RecordDecode {
            message: message.into(),
        }
    }

    /// Create transform error
    pub fn transform(sender: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transform {
            sender: sender.into(),
            message: message.into(),
        }
    }

    /// Create push error
    pub fn push(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Push {
            endpoint: endpoint.into(),
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
