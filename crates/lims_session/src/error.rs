//! LIMS session error types

use contracts::ContractError;
use thiserror::Error;

/// LIMS session specific error
#[derive(Debug, Error)]
pub enum SessionError {
    /// Base URL cannot address the API
    #[error("invalid LIMS url '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Request failed before a response arrived
    #[error("request to '{route}' failed: {source}")]
    Request {
        route: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx response
    #[error("'{route}' returned HTTP {status}: {body}")]
    Status {
        route: String,
        status: u16,
        body: String,
    },

    /// Response body was not the expected JSON
    #[error("'{route}' returned an undecodable body: {message}")]
    Decode { route: String, message: String },

    /// Remote answered but did not accept the credentials
    #[error("not authenticated: {message}")]
    Unauthenticated { message: String },
}

impl SessionError {
    /// Create decode error
    pub fn decode(route: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            route: route.into(),
            message: message.into(),
        }
    }

    /// Create unauthenticated error
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated {
            message: message.into(),
        }
    }
}

impl From<SessionError> for ContractError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidUrl { .. } | SessionError::Client(_) => {
                ContractError::SessionOpen {
                    message: err.to_string(),
                }
            }
            SessionError::Request { ref route, .. }
            | SessionError::Status { ref route, .. }
            | SessionError::Decode { ref route, .. } => {
                ContractError::push(route.clone(), err.to_string())
            }
            SessionError::Unauthenticated { .. } => ContractError::Other(err.to_string()),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, SessionError>;
