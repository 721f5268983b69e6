//! Transformer trait - sender-specific message wrappers

use serde_json::Value;

use crate::{ContractError, Message};

/// Builds a structured representation of a message
///
/// Registered per instrument sender; looked up by lowercased sender name.
pub trait Transformer: Send + Sync {
    /// Transformer name (used for logging)
    fn name(&self) -> &str;

    /// # Errors
    /// The message does not have the shape this transformer expects
    fn transform(&self, message: &Message) -> Result<Value, ContractError>;
}
