//! Dispatch consumer - drains the message queue into the dispatcher

use ingestion::MessageQueue;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use crate::dispatcher::Dispatch;

/// Sole consumer of the message queue
///
/// Hands each message to the dispatcher in enqueue order and loops straight
/// back to the queue; it never waits on sink work.
pub struct DispatchConsumer<D> {
    queue: MessageQueue,
    dispatcher: D,
}

impl<D: Dispatch + 'static> DispatchConsumer<D> {
    pub fn new(queue: MessageQueue, dispatcher: D) -> Self {
        Self { queue, dispatcher }
    }

    /// Run until the queue closes (every producer dropped)
    ///
    /// Returns the number of messages dispatched. Cancelling the future while
    /// it waits on an empty queue loses nothing.
    #[instrument(name = "dispatch_consumer_run", skip(self))]
    pub async fn run(mut self) -> u64 {
        info!("Dispatch consumer started");

        let mut message_count: u64 = 0;

        while let Some(message) = self.queue.dequeue().await {
            message_count += 1;
            self.dispatcher.dispatch(message);

            if message_count.is_multiple_of(100) {
                debug!(messages = message_count, "Dispatch consumer progress");
            }
        }

        info!(
            messages = message_count,
            "Message queue closed, dispatch consumer stopping"
        );
        message_count
    }

    /// Spawn the consumer as a background task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::Message;
    use ingestion::message_queue;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Records dispatched messages in call order
    #[derive(Clone, Default)]
    struct Recording {
        seen: Arc<Mutex<Vec<Message>>>,
    }

    impl Dispatch for Recording {
        fn dispatch(&self, message: Message) {
            self.seen.lock().unwrap().push(message);
        }
    }

    fn message(n: usize) -> Message {
        Message::new(vec![Bytes::from(format!("R|{n}\r"))])
    }

    #[tokio::test]
    async fn test_dispatches_in_enqueue_order() {
        let (producer, queue) = message_queue();
        let recording = Recording::default();

        for i in 0..250 {
            producer.enqueue(message(i)).unwrap();
        }
        drop(producer);

        let count = DispatchConsumer::new(queue, recording.clone()).run().await;
        assert_eq!(count, 250);

        let seen = recording.seen.lock().unwrap();
        assert_eq!(seen.len(), 250);
        for (i, m) in seen.iter().enumerate() {
            assert_eq!(*m, message(i));
        }
    }

    #[tokio::test]
    async fn test_abort_while_waiting() {
        let (producer, queue) = message_queue();
        let recording = Recording::default();
        let handle = DispatchConsumer::new(queue, recording.clone()).spawn();

        producer.enqueue(message(1)).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(recording.seen.lock().unwrap().len(), 1);

        handle.abort();
        let joined = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap();
        assert!(joined.unwrap_err().is_cancelled());
        assert!(producer.is_closed());
    }
}
