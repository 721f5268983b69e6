//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use url::Url;

/// ASTM Bridge - forwards instrument results to disk and to a LIMS
#[derive(Parser, Debug)]
#[command(
    name = "astm-bridge",
    author,
    version,
    about = "ASTM instrument to LIMS bridge",
    long_about = "Receives ASTM transmissions from laboratory instruments over TCP.\n\n\
                  Every complete message is written to an output directory and/or \n\
                  pushed to a SENAITE LIMS, with retries on rejection."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "ASTM_BRIDGE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "ASTM_BRIDGE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the bridge until interrupted
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),
}

/// Arguments for the `run` command
///
/// Every option overrides the matching configuration file value.
#[derive(Parser, Debug, Clone, Default)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); defaults apply without one
    #[arg(short, long, env = "ASTM_BRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on for instrument connections
    #[arg(short, long, env = "ASTM_BRIDGE_LISTEN")]
    pub listen: Option<String>,

    /// Port to listen on for instrument connections
    #[arg(short, long, env = "ASTM_BRIDGE_PORT")]
    pub port: Option<u16>,

    /// Write every message into this existing directory
    #[arg(short, long, env = "ASTM_BRIDGE_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Extension of written files
    #[arg(long, env = "ASTM_BRIDGE_EXTENSION")]
    pub extension: Option<String>,

    /// SENAITE site URL with credentials, e.g. https://user:pw@lims/senaite
    #[arg(short, long, env = "ASTM_BRIDGE_URL")]
    pub url: Option<Url>,

    /// Consumer interface name on the LIMS side
    #[arg(long, env = "ASTM_BRIDGE_CONSUMER")]
    pub consumer: Option<String>,

    /// Delivery attempts per message (1 disables retrying)
    #[arg(short, long, env = "ASTM_BRIDGE_RETRIES")]
    pub retries: Option<u32>,

    /// Seconds to wait between delivery attempts
    #[arg(short, long, env = "ASTM_BRIDGE_DELAY")]
    pub delay: Option<f64>,

    /// Validate configuration and exit without starting the server
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "ASTM_BRIDGE_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "bridge.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
