//! Shutdown coordinator
//!
//! Stops the long-lived services first (no new messages get in), then aborts
//! every outstanding sink task and waits until each one has acknowledged.
//! A file write already running on the blocking pool still completes; an
//! abandoned retry delay never resumes.

use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use crate::handle::SinkTasks;

/// What was stopped during shutdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Long-lived services stopped
    pub services_stopped: usize,
    /// Sink tasks that had finished on their own
    pub sinks_completed: usize,
    /// Sink tasks cancelled mid-flight
    pub sinks_cancelled: usize,
    /// Sink tasks that had panicked
    pub sinks_panicked: usize,
}

/// Cancels services and sink work on shutdown
#[derive(Debug)]
pub struct ShutdownCoordinator {
    services: Vec<(String, JoinHandle<()>)>,
    tasks: SinkTasks,
}

impl ShutdownCoordinator {
    pub fn new(tasks: SinkTasks) -> Self {
        Self {
            services: Vec::new(),
            tasks,
        }
    }

    /// Register a long-lived service (accept loop, dispatch consumer)
    pub fn register(&mut self, name: impl Into<String>, handle: JoinHandle<()>) {
        self.services.push((name.into(), handle));
    }

    /// Number of registered services
    pub fn services(&self) -> usize {
        self.services.len()
    }

    /// Cancel everything and wait for it to stop
    #[instrument(name = "shutdown_coordinator", skip(self), fields(services = self.services.len()))]
    pub async fn shutdown(self) -> ShutdownReport {
        for (_, handle) in &self.services {
            handle.abort();
        }

        let mut report = ShutdownReport::default();
        for (name, handle) in self.services {
            match handle.await {
                Ok(()) => debug!(service = %name, "Service had already stopped"),
                Err(e) if e.is_cancelled() => debug!(service = %name, "Service cancelled"),
                Err(e) => error!(service = %name, error = ?e, "Service panicked"),
            }
            report.services_stopped += 1;
        }

        let drained = self.tasks.cancel_all().await;
        observability::record_sink_cancelled(drained.cancelled);

        report.sinks_completed = drained.completed;
        report.sinks_cancelled = drained.cancelled;
        report.sinks_panicked = drained.panicked;

        info!(
            services = report.services_stopped,
            sinks_cancelled = report.sinks_cancelled,
            sinks_completed = report.sinks_completed,
            "Shutdown complete"
        );
        report
    }
}
