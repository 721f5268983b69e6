//! RemoteSink - pushes messages to the LIMS with retry
//!
//! Every delivery opens its own session. Each attempt re-authenticates and
//! then pushes; an authentication failure, a push rejection and a transport
//! error are all just an unsuccessful attempt. Attempts are spaced by a fixed
//! delay and capped at `retries`.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use contracts::{
    DeliveryConfig, DeliveryOutcome, Message, PushPayload, RemoteSession, SessionFactory,
    PUSH_ENDPOINT,
};
use observability::{DeliveryStats, DeliverySummary};
use tracing::{debug, error, info, instrument, warn};

use crate::metrics::SinkMetrics;
use crate::registry::WrapperRegistry;

/// Sink that delivers messages to the remote system of record
pub struct RemoteSink {
    name: String,
    factory: Arc<dyn SessionFactory>,
    config: DeliveryConfig,
    registry: Arc<WrapperRegistry>,
    metrics: Arc<SinkMetrics>,
    stats: Mutex<DeliveryStats>,
}

impl RemoteSink {
    pub fn new(
        factory: Arc<dyn SessionFactory>,
        config: DeliveryConfig,
        registry: Arc<WrapperRegistry>,
    ) -> Self {
        Self {
            name: "remote".to_string(),
            factory,
            config,
            registry,
            metrics: Arc::new(SinkMetrics::new()),
            stats: Mutex::new(DeliveryStats::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &DeliveryConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Aggregated delivery results so far
    pub fn summary(&self) -> DeliverySummary {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .summary()
    }

    /// Deliver one message through a fresh session
    ///
    /// Never fails: the outcome says whether the remote accepted the message.
    /// A session that cannot be opened is a failure with zero attempts.
    #[instrument(
        name = "remote_sink_deliver",
        skip(self, message),
        fields(sink = %self.name, sender = %message.sender_name())
    )]
    pub async fn deliver(&self, message: &Message) -> DeliveryOutcome {
        let started = Instant::now();

        let outcome = match self.factory.open() {
            Ok(mut session) => {
                deliver(message, session.as_mut(), &self.config, &self.registry).await
            }
            Err(e) => {
                error!(error = %e, "Cannot open LIMS session, message not delivered");
                DeliveryOutcome::failed(0)
            }
        };

        let elapsed = started.elapsed();
        if outcome.success {
            self.metrics.inc_write_count();
        } else {
            self.metrics.inc_failure_count();
        }
        self.metrics
            .add_retries(u64::from(outcome.attempts_made.saturating_sub(1)));
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .update(&outcome, elapsed);
        observability::record_delivery(&outcome, elapsed);

        outcome
    }
}

impl std::fmt::Debug for RemoteSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSink")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish()
    }
}

/// Deliver `message` over `session`
///
/// Authenticates and pushes up to `config.retries` times (at least once),
/// waiting `config.delay()` between attempts. Logs one warning per retry and
/// a single error when every attempt failed.
pub async fn deliver(
    message: &Message,
    session: &mut dyn RemoteSession,
    config: &DeliveryConfig,
    registry: &WrapperRegistry,
) -> DeliveryOutcome {
    let sender = message.sender_name();
    let payload = PushPayload::new(&config.consumer, message, registry.structured(message));
    let delay = config.delay();

    let mut attempt: u32 = 1;
    loop {
        if attempt_once(session, &payload, attempt).await {
            if attempt > 1 {
                info!(sender = %sender, attempt, "Message delivered after retry");
            } else {
                debug!(sender = %sender, "Message delivered");
            }
            return DeliveryOutcome::succeeded(attempt);
        }

        if attempt >= config.retries {
            error!(
                sender = %sender,
                attempts = attempt,
                "Delivery failed, giving up on message"
            );
            return DeliveryOutcome::failed(attempt);
        }

        attempt += 1;
        warn!(
            sender = %sender,
            attempt,
            retries = config.retries,
            delay_secs = config.delay_secs,
            "Delivery not accepted, retrying ({attempt}/{})",
            config.retries
        );
        observability::record_delivery_retry();

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

async fn attempt_once(session: &mut dyn RemoteSession, payload: &PushPayload, attempt: u32) -> bool {
    if !session.authenticate().await {
        debug!(attempt, "LIMS authentication failed");
        return false;
    }

    match session.push(PUSH_ENDPOINT, payload).await {
        Ok(response) => {
            if !response.success {
                debug!(attempt, response = ?response.extra, "Push rejected");
            }
            response.success
        }
        Err(e) => {
            debug!(attempt, error = %e, "Push failed");
            false
        }
    }
}
