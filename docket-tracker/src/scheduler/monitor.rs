//! Polling monitor
//!
//! Each subscription runs as its own task: one immediate status fetch, then
//! one fetch per interval until the tracked id is terminal. The outcome is
//! delivered to the subscriber exactly once, and never after unsubscribe.

use async_trait::async_trait;
use docket_client::{ClientError, Result};
use docket_core::domain::Terminal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio::time::{self, Instant};
use tracing::{debug, error, warn};

use super::registry::{PollControl, PollRegistry};
use crate::config::TrackerConfig;

/// Something a subscription can poll: a tracker owning a snapshot map
#[async_trait]
pub trait StatusSource: Send + Sync + 'static {
    type Snapshot: Terminal + Send + Sync + 'static;

    /// Fetch the remote state, fold it, and return the stored snapshot
    async fn refresh(&self, id: &str) -> Result<Arc<Self::Snapshot>>;

    /// The stored snapshot, without network access
    fn cached(&self, id: &str) -> Option<Arc<Self::Snapshot>>;

    fn polls(&self) -> &PollRegistry;
}

/// How a subscription ended
#[derive(Debug, Clone)]
pub enum PollOutcome<T> {
    /// The id reached a terminal state
    Terminal(Arc<T>),
    /// A non-retryable error, or too many consecutive retryable ones
    Failed(ClientError),
    /// Still non-terminal when the polling deadline passed
    Stalled(Option<Arc<T>>),
    /// A command on the tracker cleared polling while still non-terminal
    Cleared(Option<Arc<T>>),
}

impl<T> PollOutcome<T> {
    /// The last known snapshot, if any
    pub fn snapshot(&self) -> Option<&Arc<T>> {
        match self {
            PollOutcome::Terminal(snapshot) => Some(snapshot),
            PollOutcome::Stalled(last) | PollOutcome::Cleared(last) => last.as_ref(),
            PollOutcome::Failed(_) => None,
        }
    }
}

/// Starts polling subscriptions against one status source
pub struct PollingMonitor<S> {
    source: Arc<S>,
    default_interval: Duration,
    max_failures: u32,
    max_duration: Option<Duration>,
}

impl<S: StatusSource> PollingMonitor<S> {
    pub fn new(source: Arc<S>, config: &TrackerConfig) -> Self {
        Self {
            source,
            default_interval: config.poll_interval,
            max_failures: config.max_poll_failures.max(1),
            max_duration: config.max_poll_duration,
        }
    }

    pub fn default_interval(&self) -> Duration {
        self.default_interval
    }

    /// Poll `id` every `interval` until it is terminal.
    ///
    /// `on_done` runs at most once, from the polling task. Dropping or
    /// cancelling the returned handle stops polling without calling it.
    pub fn subscribe<F>(
        &self,
        id: impl Into<String>,
        interval: Duration,
        on_done: F,
    ) -> Subscription<S::Snapshot>
    where
        F: FnOnce(PollOutcome<S::Snapshot>) + Send + 'static,
    {
        let id = id.into();
        let control = PollControl::new();
        self.source.polls().register(&id, &control);

        let (updates, updates_rx) = watch::channel(self.source.cached(&id));
        let poll = Poll {
            source: Arc::clone(&self.source),
            id: id.clone(),
            interval,
            control: Arc::clone(&control),
            updates,
            max_failures: self.max_failures,
            max_duration: self.max_duration,
        };

        debug!(id = %id, ?interval, "Subscribing to status updates");

        let registration = Registration {
            source: Arc::clone(&self.source),
            id: id.clone(),
        };
        let task = tokio::spawn(async move {
            // Dropped on every exit, including abort
            let _registration = registration;
            if let Some(outcome) = poll.run().await {
                if poll.control.retire() {
                    on_done(outcome);
                }
            }
        });

        Subscription {
            id,
            interval,
            control,
            task: task.abort_handle(),
            updates: updates_rx,
        }
    }
}

/// Handle to a live polling subscription
///
/// `cancel` is idempotent and safe to call from inside the outcome callback.
/// Dropping the handle cancels the subscription.
pub struct Subscription<T> {
    id: String,
    interval: Duration,
    control: Arc<PollControl>,
    task: AbortHandle,
    updates: watch::Receiver<Option<Arc<T>>>,
}

impl<T> Subscription<T> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the outcome is still pending
    pub fn is_active(&self) -> bool {
        self.control.is_alive()
    }

    /// Latest snapshot seen by this subscription
    pub fn updates(&self) -> watch::Receiver<Option<Arc<T>>> {
        self.updates.clone()
    }

    pub fn cancel(&self) {
        self.control.stop();
        self.task.abort();
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Prunes the registry entry of a subscription once its task ends
struct Registration<S: StatusSource> {
    source: Arc<S>,
    id: String,
}

impl<S: StatusSource> Drop for Registration<S> {
    fn drop(&mut self) {
        self.source.polls().prune(&self.id);
    }
}

struct Poll<S: StatusSource> {
    source: Arc<S>,
    id: String,
    interval: Duration,
    control: Arc<PollControl>,
    updates: watch::Sender<Option<Arc<S::Snapshot>>>,
    max_failures: u32,
    max_duration: Option<Duration>,
}

impl<S: StatusSource> Poll<S> {
    /// Drive the subscription; `None` means it was cancelled
    async fn run(&self) -> Option<PollOutcome<S::Snapshot>> {
        let started = Instant::now();
        let mut failures = 0;
        let mut first = true;

        loop {
            if !first {
                tokio::select! {
                    _ = time::sleep(self.interval) => {}
                    _ = self.control.woken() => {}
                }
                if !self.control.is_alive() {
                    return None;
                }

                // A direct command may have settled the id since the last tick
                if let Some(snapshot) = self.source.cached(&self.id).filter(|s| s.is_terminal()) {
                    debug!(id = %self.id, "Already terminal, skipping fetch");
                    return Some(PollOutcome::Terminal(snapshot));
                }
            }
            first = false;

            if self.control.is_cleared() {
                debug!(id = %self.id, "Polling cleared by command");
                return Some(PollOutcome::Cleared(self.source.cached(&self.id)));
            }

            if self
                .max_duration
                .is_some_and(|limit| started.elapsed() >= limit)
            {
                warn!(id = %self.id, elapsed = ?started.elapsed(), "Job stalled, giving up polling");
                return Some(PollOutcome::Stalled(self.source.cached(&self.id)));
            }

            let result = self.source.refresh(&self.id).await;
            if !self.control.is_alive() {
                return None;
            }

            match result {
                Ok(snapshot) => {
                    failures = 0;
                    self.updates.send_replace(Some(Arc::clone(&snapshot)));
                    if snapshot.is_terminal() {
                        return Some(PollOutcome::Terminal(snapshot));
                    }
                }
                Err(err) if err.is_retryable() => {
                    failures += 1;
                    if failures >= self.max_failures {
                        error!(
                            id = %self.id,
                            failures,
                            "Status polling failed repeatedly: {}", err
                        );
                        return Some(PollOutcome::Failed(err));
                    }
                    warn!(
                        id = %self.id,
                        "Status poll failed (attempt {}/{}): {}",
                        failures, self.max_failures, err
                    );
                }
                Err(err) => {
                    error!(id = %self.id, "Status polling stopped: {}", err);
                    return Some(PollOutcome::Failed(err));
                }
            }
        }
    }
}
