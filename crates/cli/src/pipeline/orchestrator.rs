//! Pipeline orchestrator - owns the message queue and wires every component.
//!
//! endpoint → queue → dispatch consumer → dispatcher → sinks, with the
//! shutdown coordinator holding every task handle.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use contracts::{BridgeConfig, SessionFactory};
use dispatcher::{create_dispatcher, DispatchConsumer, ShutdownCoordinator, SinkTasks};
use ingestion::{message_queue, AstmEndpoint};
use lims_session::SenaiteSessionFactory;
use tracing::{info, warn};

use super::PipelineStats;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validated bridge configuration
    pub config: BridgeConfig,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` resolves, then stop everything
    pub async fn run<F>(self, shutdown: F) -> Result<PipelineStats>
    where
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let config = &self.config.config;

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Setup Dispatcher
        info!("Setting up dispatcher...");
        let tasks = SinkTasks::new();
        let factory = config.lims.as_ref().map(|lims| {
            Arc::new(SenaiteSessionFactory::new(lims.url.clone(), lims.timeout()))
                as Arc<dyn SessionFactory>
        });
        let dispatcher = Arc::new(
            create_dispatcher(config, factory, tasks.clone())
                .context("Failed to create dispatcher")?,
        );

        if !dispatcher.has_sinks() {
            warn!("No sinks configured - messages will be dropped");
        }

        // Setup Ingestion
        let (producer, queue) = message_queue();
        let ingestion_metrics = producer.metrics();
        let endpoint = AstmEndpoint::bind(&config.server.listen, config.server.port, producer)
            .await
            .with_context(|| {
                format!(
                    "Failed to listen on {}:{}",
                    config.server.listen, config.server.port
                )
            })?;
        let addr = endpoint.local_addr()?;

        let mut coordinator = ShutdownCoordinator::new(tasks);
        coordinator.register("endpoint", endpoint.spawn());
        coordinator.register(
            "dispatch_consumer",
            DispatchConsumer::new(queue, Arc::clone(&dispatcher)).spawn(),
        );

        info!(%addr, "Bridge accepting instrument connections");

        shutdown.await;
        warn!("Received shutdown signal, stopping bridge...");

        let report = coordinator.shutdown().await;

        let stats = PipelineStats {
            duration: start_time.elapsed(),
            ingestion: ingestion_metrics.snapshot(),
            messages_received: ingestion_metrics.snapshot().messages_enqueued,
            messages_dispatched: dispatcher.dispatched(),
            sinks: dispatcher.metrics(),
            delivery: dispatcher.delivery_summary(),
            shutdown: report,
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            sinks_cancelled = stats.shutdown.sinks_cancelled,
            "Bridge shutdown complete"
        );

        Ok(stats)
    }
}
