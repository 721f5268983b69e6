//! # Ingestion
//!
//! Instrument message intake.
//!
//! Responsibilities:
//! - Accept instrument connections and acknowledge the low-level handshake
//! - Reassemble frames into one `Message` per transmission
//! - Hand messages to the dispatcher through an explicit FIFO queue
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{message_queue, AstmEndpoint};
//!
//! let (producer, mut queue) = message_queue();
//! let endpoint = AstmEndpoint::bind("0.0.0.0", 4010, producer).await?;
//! let server = endpoint.spawn();
//!
//! while let Some(message) = queue.dequeue().await {
//!     // Dispatch message
//! }
//! ```

mod endpoint;
mod error;
mod metrics;
mod queue;

// Re-exports
pub use contracts::Message;
pub use endpoint::AstmEndpoint;
pub use error::{IngestionError, Result};
pub use self::metrics::{IngestionMetrics, MetricsSnapshot};
pub use queue::{message_queue, MessageProducer, MessageQueue};
