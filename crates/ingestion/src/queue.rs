//! Message queue between the endpoint and the dispatch consumer
//!
//! Unbounded FIFO: intake never waits on sink I/O. The consumer half is not
//! `Clone`, so exactly one task drains it.

use std::sync::Arc;

use async_channel::{unbounded, Receiver, Sender};
use contracts::Message;
use metrics::{counter, gauge};
use tracing::trace;

use crate::error::{IngestionError, Result};
use crate::metrics::IngestionMetrics;

/// Create a connected producer / queue pair
pub fn message_queue() -> (MessageProducer, MessageQueue) {
    let (tx, rx) = unbounded();
    let metrics = Arc::new(IngestionMetrics::new());

    (
        MessageProducer {
            tx,
            metrics: Arc::clone(&metrics),
        },
        MessageQueue { rx, metrics },
    )
}

/// Producer half, one clone per connection
#[derive(Debug, Clone)]
pub struct MessageProducer {
    tx: Sender<Message>,
    metrics: Arc<IngestionMetrics>,
}

impl MessageProducer {
    /// Append a message to the queue
    ///
    /// # Errors
    /// `QueueClosed` once the consumer half is gone
    pub fn enqueue(&self, message: Message) -> Result<()> {
        let lines = message.len();
        self.tx
            .try_send(message)
            .map_err(|_| IngestionError::QueueClosed)?;

        self.metrics.record_enqueued();
        counter!("astm_bridge_messages_enqueued_total").increment(1);
        gauge!("astm_bridge_queue_depth").set(self.tx.len() as f64);
        trace!(lines, depth = self.tx.len(), "message enqueued");
        Ok(())
    }

    /// Whether the consumer half is gone
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Shared ingestion metrics
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        Arc::clone(&self.metrics)
    }
}

/// Consumer half
#[derive(Debug)]
pub struct MessageQueue {
    rx: Receiver<Message>,
    metrics: Arc<IngestionMetrics>,
}

impl MessageQueue {
    /// Wait for the next message
    ///
    /// Returns `None` once every producer is dropped and the queue is drained.
    /// Cancel safe: dropping the future never loses a message.
    pub async fn dequeue(&mut self) -> Option<Message> {
        let message = self.rx.recv().await.ok()?;
        gauge!("astm_bridge_queue_depth").set(self.rx.len() as f64);
        Some(message)
    }

    /// Messages waiting
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether no message is waiting
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Shared ingestion metrics
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        Arc::clone(&self.metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn message(n: usize) -> Message {
        Message::new(vec![Bytes::from(format!("R|{n}\r"))])
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let (producer, mut queue) = message_queue();
        for i in 0..10 {
            producer.enqueue(message(i)).unwrap();
        }
        assert_eq!(queue.len(), 10);

        for i in 0..10 {
            assert_eq!(queue.dequeue().await.unwrap(), message(i));
        }
        assert!(queue.is_empty());
        assert_eq!(queue.metrics().snapshot().messages_enqueued, 10);
    }

    #[tokio::test]
    async fn test_dequeue_none_after_producers_dropped() {
        let (producer, mut queue) = message_queue();
        let second = producer.clone();
        producer.enqueue(message(1)).unwrap();
        drop(producer);
        drop(second);

        assert!(queue.dequeue().await.is_some());
        assert!(queue.dequeue().await.is_none());
    }

    #[tokio::test]
    async fn test_enqueue_after_queue_dropped() {
        let (producer, queue) = message_queue();
        drop(queue);
        assert!(producer.is_closed());
        let err = producer.enqueue(message(1)).unwrap_err();
        assert!(matches!(err, IngestionError::QueueClosed));
    }
}
