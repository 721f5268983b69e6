//! Ingestion metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Ingestion metrics
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Total instrument connections accepted
    pub connections_accepted: AtomicU64,

    /// Total frames received
    pub frames_received: AtomicU64,

    /// Total messages enqueued
    pub messages_enqueued: AtomicU64,

    /// Transmissions lost to a closed connection
    pub transmissions_discarded: AtomicU64,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record accepted connection
    pub fn record_connection(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record received frame
    pub fn record_frame(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record enqueued message
    pub fn record_enqueued(&self) {
        self.messages_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Record discarded transmission
    pub fn record_discarded(&self) {
        self.transmissions_discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            messages_enqueued: self.messages_enqueued.load(Ordering::Relaxed),
            transmissions_discarded: self.transmissions_discarded.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    /// Total instrument connections accepted
    pub connections_accepted: u64,

    /// Total frames received
    pub frames_received: u64,

    /// Total messages enqueued
    pub messages_enqueued: u64,

    /// Transmissions lost to a closed connection
    pub transmissions_discarded: u64,
}
