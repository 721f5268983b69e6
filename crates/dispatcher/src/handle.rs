//! SinkTasks - tracks outstanding per-message sink work
//!
//! Every sink unit the dispatcher schedules is one task in a shared
//! `JoinSet`. Finished tasks are reaped on each spawn, so the set only holds
//! outstanding work; the shutdown coordinator aborts and joins what is left.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, instrument};

/// Shared set of in-flight sink tasks
#[derive(Clone, Default)]
pub struct SinkTasks {
    inner: Arc<Mutex<JoinSet<()>>>,
}

impl SinkTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn one sink unit of work
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut set = self.lock();
        while let Some(joined) = set.try_join_next() {
            log_join_error(joined);
        }
        set.spawn(task);
    }

    /// Outstanding (or finished but not yet reaped) tasks
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Abort every outstanding task and wait until each one has stopped
    ///
    /// Cancelled tasks are the expected outcome here and are not errors.
    #[instrument(name = "sink_tasks_cancel_all", skip(self))]
    pub async fn cancel_all(&self) -> DrainReport {
        let mut set = std::mem::take(&mut *self.lock());
        set.abort_all();

        let mut report = DrainReport::default();
        while let Some(joined) = set.join_next().await {
            report.record(joined);
        }
        debug!(
            completed = report.completed,
            cancelled = report.cancelled,
            panicked = report.panicked,
            "Sink tasks drained"
        );
        report
    }

    /// Wait for every outstanding task to finish on its own
    pub async fn wait_idle(&self) -> DrainReport {
        let mut report = DrainReport::default();
        loop {
            let mut set = std::mem::take(&mut *self.lock());
            if set.is_empty() {
                return report;
            }
            while let Some(joined) = set.join_next().await {
                report.record(joined);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SinkTasks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkTasks")
            .field("outstanding", &self.len())
            .finish()
    }
}

/// How drained sink tasks ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub completed: usize,
    pub cancelled: usize,
    pub panicked: usize,
}

impl DrainReport {
    fn record(&mut self, joined: Result<(), JoinError>) {
        match joined {
            Ok(()) => self.completed += 1,
            Err(e) if e.is_cancelled() => self.cancelled += 1,
            Err(e) => {
                self.panicked += 1;
                error!(error = ?e, "Sink task panicked");
            }
        }
    }
}

fn log_join_error(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            error!(error = ?e, "Sink task panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::time::{sleep, Duration};

    #[tokio::test]
    async fn test_wait_idle() {
        let tasks = SinkTasks::new();
        let done = Arc::new(AtomicU64::new(0));

        for i in 0..5 {
            let done = Arc::clone(&done);
            tasks.spawn(async move {
                sleep(Duration::from_millis(10 * i)).await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }

        let report = tasks.wait_idle().await;
        assert_eq!(report.completed, 5);
        assert_eq!(done.load(Ordering::SeqCst), 5);
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_all() {
        let tasks = SinkTasks::new();
        let done = Arc::new(AtomicU64::new(0));

        for _ in 0..3 {
            let done = Arc::clone(&done);
            tasks.spawn(async move {
                sleep(Duration::from_secs(3600)).await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(tasks.len(), 3);

        let report = tasks.cancel_all().await;
        assert_eq!(report.cancelled, 3);
        assert_eq!(report.panicked, 0);
        assert_eq!(done.load(Ordering::SeqCst), 0);
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn test_finished_tasks_are_reaped() {
        let tasks = SinkTasks::new();
        tasks.spawn(async {});
        tasks.spawn(async {});
        sleep(Duration::from_millis(20)).await;

        // Reaping happens on the next spawn
        tasks.spawn(async {
            sleep(Duration::from_secs(3600)).await;
        });
        assert_eq!(tasks.len(), 1);

        tasks.cancel_all().await;
    }

    #[tokio::test]
    async fn test_panicking_task_is_counted() {
        let tasks = SinkTasks::new();
        tasks.spawn(async { panic!("sink exploded") });

        let report = tasks.wait_idle().await;
        assert_eq!(report.panicked, 1);
    }
}
