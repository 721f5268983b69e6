//! Sink metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for a single sink
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Total successful writes / deliveries
    write_count: AtomicU64,
    /// Total write failures / failed deliveries
    failure_count: AtomicU64,
    /// Total extra delivery attempts
    retry_count: AtomicU64,
}

impl SinkMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get total write count
    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::Relaxed)
    }

    /// Increment write count
    pub fn inc_write_count(&self) {
        self.write_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get failure count
    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Increment failure count
    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get retry count
    pub fn retry_count(&self) -> u64 {
        self.retry_count.load(Ordering::Relaxed)
    }

    /// Add retries of one delivery
    pub fn add_retries(&self, retries: u64) {
        self.retry_count.fetch_add(retries, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            write_count: self.write_count(),
            failure_count: self.failure_count(),
            retry_count: self.retry_count(),
        }
    }
}

/// Snapshot of sink metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub write_count: u64,
    pub failure_count: u64,
    pub retry_count: u64,
}
