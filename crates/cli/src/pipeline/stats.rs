//! Pipeline statistics and metrics.

use std::time::Duration;

use dispatcher::{MetricsSnapshot, ShutdownReport};
use observability::DeliverySummary;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Endpoint counters
    pub ingestion: ingestion::MetricsSnapshot,

    /// Complete messages received from instruments
    pub messages_received: u64,

    /// Messages handed to the dispatcher
    pub messages_dispatched: u64,

    /// Per-sink counters, by sink name
    pub sinks: Vec<(String, MetricsSnapshot)>,

    /// Remote delivery results (None = LIMS disabled)
    pub delivery: Option<DeliverySummary>,

    /// What shutdown had to stop
    pub shutdown: ShutdownReport,
}

impl PipelineStats {
    /// Messages per minute over the whole run
    pub fn messages_per_minute(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.messages_received as f64 / self.duration.as_secs_f64() * 60.0
        } else {
            0.0
        }
    }

    /// Counters of the named sink
    pub fn sink(&self, name: &str) -> Option<&MetricsSnapshot> {
        self.sinks
            .iter()
            .find(|(sink, _)| sink == name)
            .map(|(_, snapshot)| snapshot)
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                      Bridge Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Connections: {}", self.ingestion.connections_accepted);
        println!("   ├─ Frames received: {}", self.ingestion.frames_received);
        println!("   ├─ Messages received: {}", self.messages_received);
        println!("   ├─ Messages dispatched: {}", self.messages_dispatched);
        println!(
            "   ├─ Transmissions discarded: {}",
            self.ingestion.transmissions_discarded
        );
        println!("   └─ Messages/min: {:.2}", self.messages_per_minute());

        if let Some(file) = self.sink("file") {
            println!("\n💾 File Sink");
            println!("   ├─ Files written: {}", file.write_count);
            println!("   └─ Write failures: {}", file.failure_count);
        }

        if let Some(remote) = self.sink("remote") {
            println!("\n🌐 Remote Delivery");
            println!("   ├─ Delivered: {}", remote.write_count);
            println!("   ├─ Failed: {}", remote.failure_count);
            println!("   └─ Retries: {}", remote.retry_count);
        }

        if let Some(delivery) = &self.delivery {
            println!("   Attempts: {}", delivery.attempts);
            println!("   Duration (ms): {}", delivery.duration_ms);
        }

        println!("\n🛑 Shutdown");
        println!("   ├─ Services stopped: {}", self.shutdown.services_stopped);
        println!("   ├─ Sink tasks cancelled: {}", self.shutdown.sinks_cancelled);
        println!("   └─ Sink tasks panicked: {}", self.shutdown.sinks_panicked);

        println!();
    }
}
