//! BridgeConfig - Config Loader output
//!
//! Describes the whole bridge: where instruments connect, and which sinks
//! (local capture, remote LIMS) receive their messages.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;
use validator::Validate;

use crate::{DeliveryConfig, DEFAULT_CONSUMER};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete bridge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Instrument-facing endpoint
    #[serde(default)]
    pub server: ServerConfig,

    /// Local capture (None = disabled)
    #[serde(default)]
    pub output: Option<OutputConfig>,

    /// Remote LIMS delivery (None = disabled)
    #[serde(default)]
    pub lims: Option<LimsConfig>,

    /// Sender-specific transformers
    #[serde(default)]
    pub wrappers: Vec<WrapperConfig>,
}

impl BridgeConfig {
    /// Whether any sink is enabled
    pub fn has_sinks(&self) -> bool {
        self.output.is_some() || self.lims.is_some()
    }
}

/// Instrument-facing TCP endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4010
}

/// Local capture of raw messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Existing directory files are written into
    pub directory: PathBuf,

    /// File extension, including the dot
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl OutputConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            extension: default_extension(),
        }
    }
}

fn default_extension() -> String {
    ".txt".to_string()
}

/// Remote LIMS delivery
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LimsConfig {
    /// LIMS address including credentials: `http(s)://user:password@host/site`
    pub url: Url,

    /// Push consumer interface
    #[serde(default = "default_consumer")]
    #[validate(length(min = 1, message = "consumer cannot be empty"))]
    pub consumer: String,

    /// Attempts per message
    #[serde(default = "default_retries")]
    #[validate(range(min = 1, message = "retries must be >= 1"))]
    pub retries: u32,

    /// Pause between attempts (seconds)
    #[serde(default = "default_delay_secs")]
    #[validate(range(min = 0.0, message = "delay_secs must be >= 0"))]
    pub delay_secs: f64,

    /// HTTP request timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    #[validate(range(min = 1, message = "timeout_secs must be >= 1"))]
    pub timeout_secs: u64,
}

impl LimsConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            consumer: default_consumer(),
            retries: default_retries(),
            delay_secs: default_delay_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Retry policy for each delivery
    pub fn delivery(&self) -> DeliveryConfig {
        DeliveryConfig {
            consumer: self.consumer.clone(),
            retries: self.retries,
            delay_secs: self.delay_secs,
        }
    }

    /// HTTP request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_consumer() -> String {
    DEFAULT_CONSUMER.to_string()
}

fn default_retries() -> u32 {
    3
}

fn default_delay_secs() -> f64 {
    5.0
}

fn default_timeout_secs() -> u64 {
    30
}

/// One sender -> transformer registration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WrapperConfig {
    /// Instrument sender name (matched case-insensitively)
    #[validate(length(min = 1, message = "sender cannot be empty"))]
    pub sender: String,

    /// Built-in transformer to use
    #[serde(default)]
    pub kind: WrapperKind,
}

/// Built-in transformers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapperKind {
    /// Every record as a JSON array of fields
    #[default]
    Records,
}
