//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::BridgeConfig;
use serde::Serialize;
use tracing::info;

use super::redact_url;
use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    listen: String,
    port: u16,
    output_directory: Option<String>,
    lims_url: Option<String>,
    retries: Option<u32>,
    delay_secs: Option<f64>,
    wrapper_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(summarize(&config)),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

fn summarize(config: &BridgeConfig) -> ConfigSummary {
    ConfigSummary {
        version: format!("{:?}", config.version),
        listen: config.server.listen.clone(),
        port: config.server.port,
        output_directory: config
            .output
            .as_ref()
            .map(|output| output.directory.display().to_string()),
        lims_url: config.lims.as_ref().map(|lims| redact_url(&lims.url)),
        retries: config.lims.as_ref().map(|lims| lims.retries),
        delay_secs: config.lims.as_ref().map(|lims| lims.delay_secs),
        wrapper_count: config.wrappers.len(),
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &BridgeConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if !config.has_sinks() {
        warnings.push("No sinks configured - received messages will be dropped".to_string());
    }

    if let Some(output) = &config.output {
        if !output.directory.is_dir() {
            warnings.push(format!(
                "Output directory '{}' does not exist - `run` will refuse to start",
                output.directory.display()
            ));
        }
    }

    if let Some(lims) = &config.lims {
        if lims.url.username().is_empty() {
            warnings.push("LIMS URL carries no credentials".to_string());
        }
    } else if !config.wrappers.is_empty() {
        warnings.push("Wrappers configured but LIMS delivery is disabled".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Listen: {}:{}", summary.listen, summary.port);
            println!(
                "  Output: {}",
                summary.output_directory.as_deref().unwrap_or("disabled")
            );
            println!(
                "  LIMS: {}",
                summary.lims_url.as_deref().unwrap_or("disabled")
            );
            if let (Some(retries), Some(delay)) = (summary.retries, summary.delay_secs) {
                println!("  Retries: {} (delay {}s)", retries, delay);
            }
            println!("  Wrappers: {}", summary.wrapper_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
