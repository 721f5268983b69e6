//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
///
/// Only raised while building the dispatcher; once messages flow, sink
/// failures are logged and counted, never returned.
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Two wrappers registered for the same sender
    #[error("duplicate wrapper for sender '{sender}'")]
    DuplicateWrapper { sender: String },

    /// Sink write error (from contract)
    #[error("sink error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
