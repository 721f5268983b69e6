//! Dispatcher - fans each message out to the configured sinks

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use contracts::{BridgeConfig, Message, SessionFactory};
use observability::DeliverySummary;
use tracing::{debug, info, instrument};

use crate::error::DispatcherError;
use crate::handle::SinkTasks;
use crate::metrics::MetricsSnapshot;
use crate::registry::WrapperRegistry;
use crate::sinks::{FileSink, RemoteSink};

/// Hands a message to its sinks
///
/// Must return without waiting for any sink to finish.
pub trait Dispatch: Send + Sync {
    fn dispatch(&self, message: Message);
}

impl<D: Dispatch + ?Sized> Dispatch for Arc<D> {
    fn dispatch(&self, message: Message) {
        (**self).dispatch(message);
    }
}

/// Builder for creating a Dispatcher
#[derive(Debug, Default)]
pub struct DispatcherBuilder {
    file: Option<FileSink>,
    remote: Option<RemoteSink>,
    tasks: Option<SinkTasks>,
}

impl DispatcherBuilder {
    /// Create a new DispatcherBuilder
    pub fn new() -> Self {
        Self::default()
    }

    /// Write every message to disk
    pub fn file_sink(mut self, sink: FileSink) -> Self {
        self.file = Some(sink);
        self
    }

    /// Deliver every message to the LIMS
    pub fn remote_sink(mut self, sink: RemoteSink) -> Self {
        self.remote = Some(sink);
        self
    }

    /// Track sink work in an existing task set
    pub fn tasks(mut self, tasks: SinkTasks) -> Self {
        self.tasks = Some(tasks);
        self
    }

    /// Build the dispatcher
    pub fn build(self) -> Dispatcher {
        Dispatcher {
            file: self.file.map(Arc::new),
            remote: self.remote.map(Arc::new),
            tasks: self.tasks.unwrap_or_default(),
            dispatched: AtomicU64::new(0),
        }
    }
}

/// Routes each message to the file sink and/or the remote sink
///
/// Every enabled sink runs as its own task, tracked in `SinkTasks`, so a slow
/// or failing sink never holds up another sink or the next message.
#[derive(Debug)]
pub struct Dispatcher {
    file: Option<Arc<FileSink>>,
    remote: Option<Arc<RemoteSink>>,
    tasks: SinkTasks,
    dispatched: AtomicU64,
}

impl Dispatcher {
    /// Messages handed to the dispatcher so far
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Outstanding sink work
    pub fn tasks(&self) -> &SinkTasks {
        &self.tasks
    }

    /// Whether at least one sink is configured
    pub fn has_sinks(&self) -> bool {
        self.file.is_some() || self.remote.is_some()
    }

    /// Get metrics for all sinks
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        let file = self
            .file
            .iter()
            .map(|s| (s.name().to_string(), s.metrics().snapshot()));
        let remote = self
            .remote
            .iter()
            .map(|s| (s.name().to_string(), s.metrics().snapshot()));
        file.chain(remote).collect()
    }

    /// Delivery results of the remote sink, if configured
    pub fn delivery_summary(&self) -> Option<DeliverySummary> {
        self.remote.as_ref().map(|s| s.summary())
    }
}

impl Dispatch for Dispatcher {
    #[instrument(name = "dispatcher_dispatch", skip_all, fields(lines = message.len()))]
    fn dispatch(&self, message: Message) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        let mut scheduled = 0;

        if let Some(sink) = &self.file {
            let sink = Arc::clone(sink);
            let message = message.clone();
            self.tasks.spawn(async move {
                // Failures are logged and counted by the sink
                let _ = sink.persist(message).await;
            });
            scheduled += 1;
        }

        if let Some(sink) = &self.remote {
            let sink = Arc::clone(sink);
            self.tasks.spawn(async move {
                sink.deliver(&message).await;
            });
            scheduled += 1;
        }

        observability::record_message_dispatched(scheduled);
        if scheduled == 0 {
            debug!("No sink configured, message dropped");
        }
    }
}

/// Create a dispatcher from the bridge configuration
///
/// `factory` opens LIMS sessions and is only used when `[lims]` is set.
///
/// # Errors
/// The output directory is unusable, a wrapper is registered twice, or
/// `[lims]` is set without a session factory.
#[instrument(name = "dispatcher_create", skip_all)]
pub fn create_dispatcher(
    config: &BridgeConfig,
    factory: Option<Arc<dyn SessionFactory>>,
    tasks: SinkTasks,
) -> Result<Dispatcher, DispatcherError> {
    let mut builder = DispatcherBuilder::new().tasks(tasks);

    if let Some(output) = &config.output {
        builder = builder.file_sink(FileSink::from_config(output)?);
    }

    if let Some(lims) = &config.lims {
        let factory = factory.ok_or_else(|| {
            DispatcherError::sink_creation("remote", "no LIMS session factory provided")
        })?;
        let registry = WrapperRegistry::from_configs(&config.wrappers)?;
        builder = builder.remote_sink(RemoteSink::new(
            factory,
            lims.delivery(),
            Arc::new(registry),
        ));
    }

    let dispatcher = builder.build();
    info!(
        file = dispatcher.file.is_some(),
        remote = dispatcher.remote.is_some(),
        "Dispatcher created"
    );
    Ok(dispatcher)
}
