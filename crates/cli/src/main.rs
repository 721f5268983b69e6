//! # ASTM Bridge CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 配置加载、命令行覆盖与验证
//! - 启动检查（输出目录、LIMS 认证）
//! - 桥接管道编排与优雅关闭

mod cli;
mod commands;
mod error;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_pipeline, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging based on CLI options
    init_logging(&cli)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "ASTM Bridge starting"
    );

    // Execute command
    let result = match &cli.command {
        Commands::Run(args) => run_pipeline(args).await,
        Commands::Validate(args) => run_validate(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging based on CLI options
fn init_logging(cli: &Cli) -> Result<()> {
    let config = ObservabilityConfig::from_verbosity(cli.log_format.into(), cli.verbose, cli.quiet);
    observability::init_with_config(&config)
}
