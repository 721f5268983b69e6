//! Wrapper registry - sender-specific transformers
//!
//! Keys are lowercased sender names; lookup is an exact match on the
//! lowercased sender name of a message.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use contracts::{decode_line, ContractError, Message, Transformer, WrapperConfig, WrapperKind};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::error::DispatcherError;

/// Sender name → transformer
#[derive(Default, Clone)]
pub struct WrapperRegistry {
    wrappers: HashMap<String, Arc<dyn Transformer>>,
}

impl WrapperRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `[[wrappers]]` config entries
    ///
    /// # Errors
    /// Two entries name the same sender (case-insensitive)
    #[instrument(name = "wrapper_registry_load", skip(configs), fields(count = configs.len()))]
    pub fn from_configs(configs: &[WrapperConfig]) -> Result<Self, DispatcherError> {
        let mut registry = Self::new();
        for config in configs {
            let transformer: Arc<dyn Transformer> = match config.kind {
                WrapperKind::Records => Arc::new(RecordsTransformer),
            };
            registry.register(&config.sender, transformer)?;
        }
        debug!(wrappers = registry.len(), "Wrapper registry loaded");
        Ok(registry)
    }

    /// Register `transformer` for `sender`
    ///
    /// # Errors
    /// `sender` is already registered
    pub fn register(
        &mut self,
        sender: &str,
        transformer: Arc<dyn Transformer>,
    ) -> Result<(), DispatcherError> {
        let key = sender.to_lowercase();
        if self.wrappers.contains_key(&key) {
            return Err(DispatcherError::DuplicateWrapper { sender: key });
        }
        self.wrappers.insert(key, transformer);
        Ok(())
    }

    /// Transformer for a sender name, if any
    pub fn resolve(&self, sender: &str) -> Option<Arc<dyn Transformer>> {
        self.wrappers.get(&sender.to_lowercase()).cloned()
    }

    /// Structured representation of `message`
    ///
    /// `None` when no transformer is registered for its sender or the
    /// transformer fails (logged).
    pub fn structured(&self, message: &Message) -> Option<Value> {
        let sender = message.sender_name();
        let transformer = self.resolve(&sender)?;

        match transformer.transform(message) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(
                    sender = %sender,
                    wrapper = transformer.name(),
                    error = %e,
                    "Wrapper failed, delivering raw message only"
                );
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.wrappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wrappers.is_empty()
    }

    /// Registered sender names, sorted
    pub fn senders(&self) -> Vec<&str> {
        let mut senders: Vec<&str> = self.wrappers.keys().map(String::as_str).collect();
        senders.sort_unstable();
        senders
    }
}

impl fmt::Debug for WrapperRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrapperRegistry")
            .field("senders", &self.senders())
            .finish()
    }
}

/// Renders every record of a message as JSON
///
/// Output is an array of records, each an array of fields; a field is
/// `null`, a string, an array of components, or an array of repeats.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordsTransformer;

impl Transformer for RecordsTransformer {
    fn name(&self) -> &str {
        "records"
    }

    fn transform(&self, message: &Message) -> Result<Value, ContractError> {
        let mut records = Vec::new();
        for line in message.lines() {
            let decoded = decode_line(line)
                .map_err(|e| ContractError::transform(message.sender_name(), e.to_string()))?;
            records.extend(decoded.records);
        }
        serde_json::to_value(records)
            .map_err(|e| ContractError::transform(message.sender_name(), e.to_string()))
    }
}
