use std::sync::Arc;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::{
    QueueConfig, QueueError, QueueNamespace, QueueResult, ScoreRange, Transition,
    TransitionOutcome,
    backend::OrderedStore,
    clock::{Clock, SystemClock},
    observability::QueueMetrics,
};

/// What a reclaim pass does when the store fails mid-pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log the failure, give up on that queue for this pass, carry on with the next
    #[default]
    Skip,
    /// Stop the pass and return the error
    Abort,
}

/// Counts from one reclaim pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReclaimReport {
    /// Expired reservations put back in the ready set
    pub reclaimed: u64,
    /// Expired reservations whose payload was already ready again
    pub skipped: u64,
    /// Queues abandoned for this pass because the store failed
    pub failed_queues: u64,
}

/// Returns expired reservations of the watched queues to their ready sets.
///
/// Each call to [`Reclaimer::run`] is one pass; it never sleeps. Drive it
/// from your own scheduler or use [`Reclaimer::spawn`].
pub struct Reclaimer<S: OrderedStore> {
    store: Arc<S>,
    watched: Vec<QueueNamespace>,
    key_prefix: Option<String>,
    failure_policy: FailurePolicy,
    clock: Arc<dyn Clock>,
    metrics: Arc<QueueMetrics>,
}

impl<S: OrderedStore + 'static> Reclaimer<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
            watched: Vec::new(),
            key_prefix: None,
            failure_policy: FailurePolicy::default(),
            clock: Arc::new(SystemClock),
            metrics: Arc::new(QueueMetrics::new()),
        }
    }

    /// Reclaimer watching the configured queues with the configured policy
    pub fn with_config(store: S, config: &QueueConfig) -> Self {
        let mut reclaimer = Self::new(store).with_failure_policy(config.failure_policy);
        reclaimer.key_prefix = config.key_prefix.clone();
        reclaimer.watch_queue(config.watch_queues.iter().cloned());
        reclaimer
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<QueueMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Start watching `queue`. Watching a queue twice has no effect.
    pub fn attach_watch_queue(&mut self, queue: impl Into<String>) -> &mut Self {
        let namespace = self.namespace_for(queue);
        if !self.watched.contains(&namespace) {
            debug!(queue = namespace.queue(), "Watching queue");
            self.watched.push(namespace);
        }
        self
    }

    /// Start watching every queue in `queues`
    pub fn watch_queue<I, Q>(&mut self, queues: I) -> &mut Self
    where
        I: IntoIterator<Item = Q>,
        Q: Into<String>,
    {
        for queue in queues {
            self.attach_watch_queue(queue);
        }
        self
    }

    /// Names of the watched queues, in attach order
    pub fn watched_queues(&self) -> Vec<&str> {
        self.watched.iter().map(QueueNamespace::queue).collect()
    }

    /// Whether `queue` has a reservation past its deadline
    pub async fn has_overdue(&self, queue: &str) -> QueueResult<bool> {
        let namespace = self.namespace_for(queue);
        let due = ScoreRange::due(self.clock.now());
        Ok(self.store.count(namespace.reserved(), due).await? > 0)
    }

    fn namespace_for(&self, queue: impl Into<String>) -> QueueNamespace {
        match &self.key_prefix {
            Some(prefix) => QueueNamespace::with_prefix(prefix, queue),
            None => QueueNamespace::new(queue),
        }
    }

    /// One pass over every watched queue
    pub async fn run(&self) -> QueueResult<ReclaimReport> {
        let mut report = ReclaimReport::default();

        for namespace in &self.watched {
            let Err(e) = self.reclaim_queue(namespace, &mut report).await else {
                continue;
            };
            self.metrics.increment_reclaim_failures();
            match self.failure_policy {
                FailurePolicy::Abort => {
                    self.metrics.add_jobs_reclaimed(report.reclaimed);
                    return Err(e);
                }
                FailurePolicy::Skip => {
                    warn!(queue = namespace.queue(), error = %e, "Reclaim failed, skipping queue");
                    report.failed_queues += 1;
                }
            }
        }

        self.metrics.add_jobs_reclaimed(report.reclaimed);
        if report.reclaimed > 0 {
            info!("Reclaimed {} expired reservations", report.reclaimed);
        }
        Ok(report)
    }

    /// Move expired reservations of one queue back to ready until none are left.
    ///
    /// Every iteration removes one entry from the reserved set, so the loop
    /// ends once the entries due at the start of the call are gone.
    async fn reclaim_queue(
        &self,
        namespace: &QueueNamespace,
        report: &mut ReclaimReport,
    ) -> QueueResult<()> {
        let now = self.clock.now();
        let transition = Transition::earliest_due(namespace.reserved(), namespace.ready(), now, now);

        loop {
            match self.store.execute_atomic(&transition).await? {
                TransitionOutcome::Moved { payload, inserted: true } => {
                    debug!(queue = namespace.queue(), payload = %payload, "Reclaimed expired reservation");
                    report.reclaimed += 1;
                }
                TransitionOutcome::Moved { payload, inserted: false } => {
                    debug!(queue = namespace.queue(), payload = %payload, "Expired reservation already requeued");
                    report.skipped += 1;
                }
                TransitionOutcome::NotFound => return Ok(()),
            }
        }
    }

    /// Run a pass every `period` on the tokio runtime until the handle is shut down
    pub fn spawn(self, period: Duration) -> ReclaimerHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        info!(
            "Starting reclaimer for {} queues with interval: {:?}",
            self.watched.len(),
            period
        );

        let join_handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        info!("Reclaimer stopped");
                        return;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = self.run().await {
                            error!("Reclaim pass aborted: {}", e);
                        }
                    }
                }
            }
        });

        ReclaimerHandle {
            shutdown_tx,
            join_handle,
        }
    }
}

/// Handle for a spawned reclaimer
pub struct ReclaimerHandle {
    shutdown_tx: oneshot::Sender<()>,
    join_handle: JoinHandle<()>,
}

impl ReclaimerHandle {
    /// Stop after the pass in progress, if any, and wait for the task to end
    pub async fn shutdown(self) -> QueueResult<()> {
        let _ = self.shutdown_tx.send(());
        self.join_handle
            .await
            .map_err(|e| QueueError::ReclaimerShutdown(format!("Reclaimer join error: {}", e)))
    }

    pub fn is_finished(&self) -> bool {
        self.join_handle.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Client;
    use crate::backend::memory::MemoryStore;
    use crate::clock::ManualClock;
    use tracing_test::traced_test;

    fn setup(now: i64) -> (Client<MemoryStore>, Reclaimer<MemoryStore>, ManualClock) {
        let store = MemoryStore::new();
        let clock = ManualClock::new(now);
        let client = Client::new(store.clone(), "orders").with_clock(clock.clone());
        let mut reclaimer = Reclaimer::new(store).with_clock(clock.clone());
        reclaimer.attach_watch_queue("orders");
        (client, reclaimer, clock)
    }

    #[test]
    fn test_duplicate_attach_is_ignored() {
        let mut reclaimer = Reclaimer::new(MemoryStore::new());
        reclaimer.attach_watch_queue("orders");
        reclaimer.watch_queue(["emails", "orders", "emails"]);
        assert_eq!(reclaimer.watched_queues(), vec!["orders", "emails"]);
    }

    #[test]
    fn test_config_prefix_applies_to_watched_queues() {
        let config = QueueConfig::new("orders")
            .with_key_prefix("shop")
            .with_watch_queues(["orders"])
            .with_failure_policy(FailurePolicy::Abort);
        let reclaimer = Reclaimer::with_config(MemoryStore::new(), &config);
        assert_eq!(reclaimer.watched[0].reserved(), "shop:orders_#RESERVED");
        assert_eq!(reclaimer.failure_policy, FailurePolicy::Abort);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_reclaims_expired_reservation() {
        let (client, reclaimer, clock) = setup(1_000);
        client.put("order-1", 0).await.unwrap();
        client.reserve(10).await.unwrap();

        clock.advance(9);
        assert!(!reclaimer.has_overdue("orders").await.unwrap());
        assert_eq!(reclaimer.run().await.unwrap().reclaimed, 0);

        clock.advance(1);
        assert!(reclaimer.has_overdue("orders").await.unwrap());
        let report = reclaimer.run().await.unwrap();
        assert_eq!(report.reclaimed, 1);
        assert!(logs_contain("Reclaimed 1 expired reservations"));

        let ready = client.namespace().ready().to_string();
        assert_eq!(client.store().score(&ready, "order-1"), Some(clock.now()));
        assert_eq!(client.reserve(0).await.unwrap().as_deref(), Some("order-1"));
    }

    #[tokio::test]
    async fn test_metrics_record_reclaims() {
        let (client, reclaimer, clock) = setup(1_000);
        let metrics = Arc::new(QueueMetrics::new());
        let reclaimer = reclaimer.with_metrics(metrics.clone());
        client.put("a", 0).await.unwrap();
        client.put("b", 0).await.unwrap();
        client.reserve(5).await.unwrap();
        client.reserve(5).await.unwrap();

        clock.advance(5);
        reclaimer.run().await.unwrap();
        assert_eq!(metrics.jobs_reclaimed(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_reclaimer_shuts_down() {
        let (client, reclaimer, clock) = setup(1_000);
        client.put("order-1", 0).await.unwrap();
        client.reserve(1).await.unwrap();
        clock.advance(1);

        let handle = reclaimer.spawn(Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        handle.shutdown().await.unwrap();

        assert_eq!(client.stats().await.unwrap().ready, 1);
        assert_eq!(client.stats().await.unwrap().reserved, 0);
    }
}
