//! Remote delivery contracts
//!
//! Retry policy, outcome, and the wire shape of a push.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Message;

/// Remote endpoint messages are pushed to
pub const PUSH_ENDPOINT: &str = "push";

/// Default consumer interface on the remote side
pub const DEFAULT_CONSUMER: &str = "senaite.lis2a.import";

/// Longest pause between attempts (one day)
pub const MAX_DELAY_SECS: f64 = 86_400.0;

/// Retry policy of one delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Consumer interface name sent with every payload
    pub consumer: String,

    /// Maximum number of attempts, >= 1
    pub retries: u32,

    /// Fixed pause between attempts (seconds), >= 0
    pub delay_secs: f64,
}

impl DeliveryConfig {
    /// Pause between attempts
    ///
    /// Negative and NaN values collapse to zero; anything above
    /// `MAX_DELAY_SECS` (infinity included) is capped there.
    pub fn delay(&self) -> Duration {
        if self.delay_secs.is_nan() || self.delay_secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.delay_secs.min(MAX_DELAY_SECS))
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            consumer: DEFAULT_CONSUMER.to_string(),
            retries: 3,
            delay_secs: 5.0,
        }
    }
}

/// Result of one delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    /// Whether the remote accepted the message
    pub success: bool,

    /// Attempts made, including the successful one
    pub attempts_made: u32,
}

impl DeliveryOutcome {
    pub fn succeeded(attempts_made: u32) -> Self {
        Self {
            success: true,
            attempts_made,
        }
    }

    pub fn failed(attempts_made: u32) -> Self {
        Self {
            success: false,
            attempts_made,
        }
    }
}

/// Body of a push request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushPayload {
    /// Consumer interface on the remote side
    pub consumer: String,

    /// Raw message lines
    pub messages: Vec<String>,

    /// Structured representation, `null` when no transformer matched
    pub json: Option<Value>,
}

impl PushPayload {
    pub fn new(consumer: impl Into<String>, message: &Message, json: Option<Value>) -> Self {
        Self {
            consumer: consumer.into(),
            messages: message.to_strings(),
            json,
        }
    }
}

/// Decoded push response
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PushResponse {
    /// Whether the remote accepted the payload
    #[serde(default)]
    pub success: bool,

    /// Remaining response fields, kept opaque
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PushResponse {
    pub fn accepted() -> Self {
        Self {
            success: true,
            extra: Map::new(),
        }
    }

    pub fn rejected() -> Self {
        Self::default()
    }
}
