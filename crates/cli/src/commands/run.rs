//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{BridgeConfig, LimsConfig, OutputConfig, RemoteSession};
use lims_session::SenaiteSession;
use tracing::{error, info, warn};

use super::redact_url;
use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    let mut config = load_config(args)?;
    apply_overrides(&mut config, args);
    config_loader::validate(&config).map_err(CliError::from)?;

    info!(
        listen = %config.server.listen,
        port = config.server.port,
        output = ?config.output.as_ref().map(|o| o.directory.display().to_string()),
        lims = ?config.lims.as_ref().map(|l| redact_url(&l.url)),
        wrappers = config.wrappers.len(),
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    startup_checks(&config).await?;

    let pipeline = Pipeline::new(PipelineConfig {
        config,
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    });

    info!("Starting bridge...");

    let stats = pipeline
        .run(setup_shutdown_signal())
        .await
        .context("Bridge execution failed")?;

    info!(
        messages = stats.messages_received,
        duration_secs = stats.duration.as_secs_f64(),
        "Bridge stopped"
    );
    stats.print_summary();

    Ok(())
}

/// Configuration file if given, defaults otherwise
fn load_config(args: &RunArgs) -> crate::error::Result<BridgeConfig> {
    let Some(path) = &args.config else {
        info!("No configuration file given, using defaults");
        return Ok(BridgeConfig::default());
    };

    info!(config = %path.display(), "Loading configuration");
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()));
    }
    Ok(config_loader::ConfigLoader::load_from_path(path)?)
}

/// Apply CLI options on top of the loaded configuration
///
/// `--url` creates the `[lims]` section when the file has none; the other
/// delivery options only apply once a LIMS is configured.
fn apply_overrides(config: &mut BridgeConfig, args: &RunArgs) {
    if let Some(listen) = &args.listen {
        config.server.listen = listen.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    if let Some(directory) = &args.output {
        match config.output.as_mut() {
            Some(output) => output.directory = directory.clone(),
            None => config.output = Some(OutputConfig::new(directory)),
        }
    }
    if let Some(extension) = &args.extension {
        match config.output.as_mut() {
            Some(output) => output.extension = extension.clone(),
            None => warn!("--extension given without an output directory, ignoring"),
        }
    }

    if let Some(url) = &args.url {
        match config.lims.as_mut() {
            Some(lims) => lims.url = url.clone(),
            None => config.lims = Some(LimsConfig::new(url.clone())),
        }
    }

    let delivery_overrides =
        args.consumer.is_some() || args.retries.is_some() || args.delay.is_some();
    match config.lims.as_mut() {
        Some(lims) => {
            if let Some(consumer) = &args.consumer {
                lims.consumer = consumer.clone();
            }
            if let Some(retries) = args.retries {
                lims.retries = retries;
            }
            if let Some(delay) = args.delay {
                lims.delay_secs = delay;
            }
        }
        None if delivery_overrides => {
            warn!("--consumer/--retries/--delay given without a LIMS url, ignoring");
        }
        None => {}
    }
}

/// Fail before accepting connections if a sink cannot work
async fn startup_checks(config: &BridgeConfig) -> crate::error::Result<()> {
    if !config.has_sinks() {
        warn!("No output directory and no LIMS url configured - messages will be dropped");
    }

    if let Some(output) = &config.output {
        if !output.directory.is_dir() {
            return Err(CliError::output_directory(
                &output.directory,
                "does not exist or is not a directory",
            ));
        }
    }

    if let Some(lims) = &config.lims {
        check_lims(lims).await?;
    }

    Ok(())
}

async fn check_lims(lims: &LimsConfig) -> crate::error::Result<()> {
    let url = redact_url(&lims.url);
    info!(url = %url, "Checking LIMS credentials");

    let mut session = SenaiteSession::new(&lims.url, lims.timeout()).map_err(|e| {
        error!(error = %e, "Cannot create LIMS session");
        CliError::lims_unreachable(&url)
    })?;

    if !session.authenticate().await {
        return Err(CliError::lims_unreachable(url));
    }
    info!("LIMS authentication succeeded");
    Ok(())
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &BridgeConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Server:");
    println!("  Listen: {}:{}", config.server.listen, config.server.port);

    match &config.output {
        Some(output) => {
            println!("\nOutput:");
            println!("  Directory: {}", output.directory.display());
            println!("  Extension: {}", output.extension);
        }
        None => println!("\nOutput: disabled"),
    }

    match &config.lims {
        Some(lims) => {
            println!("\nLIMS:");
            println!("  URL: {}", redact_url(&lims.url));
            println!("  Consumer: {}", lims.consumer);
            println!("  Retries: {}", lims.retries);
            println!("  Delay: {}s", lims.delay_secs);
            println!("  Timeout: {}s", lims.timeout_secs);
        }
        None => println!("\nLIMS: disabled"),
    }

    if !config.wrappers.is_empty() {
        println!("\nWrappers ({}):", config.wrappers.len());
        for wrapper in &config.wrappers {
            println!("  - {} ({:?})", wrapper.sender, wrapper.kind);
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use url::Url;

    fn url() -> Url {
        Url::parse("http://admin:pw@localhost/senaite").unwrap()
    }

    #[test]
    fn test_defaults_without_overrides() {
        let mut config = BridgeConfig::default();
        apply_overrides(&mut config, &RunArgs::default());

        assert_eq!(config.server.listen, "0.0.0.0");
        assert_eq!(config.server.port, 4010);
        assert!(config.output.is_none());
        assert!(config.lims.is_none());
    }

    #[test]
    fn test_url_creates_lims_section() {
        let mut config = BridgeConfig::default();
        let args = RunArgs {
            url: Some(url()),
            retries: Some(1),
            delay: Some(0.5),
            output: Some(PathBuf::from("/tmp/astm")),
            extension: Some(".astm".to_string()),
            port: Some(5000),
            ..Default::default()
        };
        apply_overrides(&mut config, &args);

        let lims = config.lims.unwrap();
        assert_eq!(lims.url, url());
        assert_eq!(lims.consumer, "senaite.lis2a.import");
        assert_eq!(lims.retries, 1);
        assert_eq!(lims.delay_secs, 0.5);

        let output = config.output.unwrap();
        assert_eq!(output.directory, PathBuf::from("/tmp/astm"));
        assert_eq!(output.extension, ".astm");
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_delivery_overrides_need_url() {
        let mut config = BridgeConfig::default();
        let args = RunArgs {
            retries: Some(7),
            ..Default::default()
        };
        apply_overrides(&mut config, &args);
        assert!(config.lims.is_none());
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let mut config = BridgeConfig {
            lims: Some(LimsConfig::new(url())),
            ..Default::default()
        };
        let args = RunArgs {
            consumer: Some("custom.import".to_string()),
            ..Default::default()
        };
        apply_overrides(&mut config, &args);

        let lims = config.lims.unwrap();
        assert_eq!(lims.consumer, "custom.import");
        assert_eq!(lims.retries, 3);
    }

    #[tokio::test]
    async fn test_startup_rejects_missing_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = BridgeConfig {
            output: Some(OutputConfig::new(dir.path().join("missing"))),
            ..Default::default()
        };
        let err = startup_checks(&config).await.unwrap_err();
        assert!(matches!(err, CliError::OutputDirectory { .. }));

        let config = BridgeConfig {
            output: Some(OutputConfig::new(dir.path())),
            ..Default::default()
        };
        assert!(startup_checks(&config).await.is_ok());
    }

    #[tokio::test]
    async fn test_startup_rejects_unreachable_lims() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut lims = LimsConfig::new(Url::parse(&format!("http://{addr}/senaite")).unwrap());
        lims.timeout_secs = 2;
        let config = BridgeConfig {
            lims: Some(lims),
            ..Default::default()
        };
        let err = startup_checks(&config).await.unwrap_err();
        assert!(matches!(err, CliError::LimsUnreachable { .. }));
    }

    #[test]
    fn test_load_config_missing_file() {
        let args = RunArgs {
            config: Some(PathBuf::from("/nonexistent/bridge.toml")),
            ..Default::default()
        };
        assert!(matches!(
            load_config(&args),
            Err(CliError::ConfigNotFound { .. })
        ));
    }
}
