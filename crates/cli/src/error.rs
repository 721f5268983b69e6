//! Error types for CLI operations.

use std::path::PathBuf;

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration loading or validation error
    #[error("Invalid configuration: {0}")]
    Config(#[from] contracts::ContractError),

    /// Output directory missing or unusable
    #[error("Output directory {} is not usable: {message}", .path.display())]
    OutputDirectory { path: PathBuf, message: String },

    /// LIMS did not accept the configured credentials at startup
    #[error("Cannot authenticate against LIMS at {url}")]
    LimsUnreachable { url: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn output_directory(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::OutputDirectory {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn lims_unreachable(url: impl Into<String>) -> Self {
        Self::LimsUnreachable { url: url.into() }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
