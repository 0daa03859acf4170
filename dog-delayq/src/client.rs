use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::{
    QueueResult, QueueConfig, QueueNamespace, QueueStats, Score, ScoreRange,
    Transition, TransitionOutcome,
    backend::OrderedStore,
    clock::{Clock, SystemClock},
    observability::QueueMetrics,
};

/// Producer/consumer handle bound to one queue and one store.
///
/// A job is identified by its payload. `put` places it in the ready set;
/// `reserve` hands it to a consumer, who then `delete`s, `release`s or
/// `bury`s it; `kick` brings a buried job back. All moves between sets go
/// through [`OrderedStore::execute_atomic`], so any number of clients and
/// reclaimers may share the store.
///
/// `false`/`None` results are normal outcomes (nothing due, payload not in the
/// expected set). Errors mean the store failed.
pub struct Client<S: OrderedStore> {
    store: Arc<S>,
    namespace: QueueNamespace,
    key_prefix: Option<String>,
    clock: Arc<dyn Clock>,
    metrics: Arc<QueueMetrics>,
}

impl<S: OrderedStore> Client<S> {
    /// Create a client for `queue`
    pub fn new(store: S, queue: impl Into<String>) -> Self {
        Self::from_shared(Arc::new(store), QueueNamespace::new(queue), None)
    }

    /// Create a client for the configured queue and key prefix
    pub fn with_config(store: S, config: &QueueConfig) -> Self {
        Self::from_shared(Arc::new(store), config.namespace(), config.key_prefix.clone())
    }

    fn from_shared(store: Arc<S>, namespace: QueueNamespace, key_prefix: Option<String>) -> Self {
        Self {
            store,
            namespace,
            key_prefix,
            clock: Arc::new(SystemClock),
            metrics: Arc::new(QueueMetrics::new()),
        }
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Record into a shared metrics sink
    pub fn with_metrics(mut self, metrics: Arc<QueueMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Switch to another queue on the same store
    pub fn use_queue(&mut self, queue: impl Into<String>) -> &mut Self {
        self.namespace = match &self.key_prefix {
            Some(prefix) => QueueNamespace::with_prefix(prefix, queue),
            None => QueueNamespace::new(queue),
        };
        self
    }

    /// Enqueue `payload`, reservable `delay_secs` from now.
    ///
    /// Putting a payload that is already ready reschedules it. Returns true once
    /// the store accepted the write, whether the payload was new or rescheduled.
    ///
    /// Putting a payload that is still reserved or buried leaves it in both
    /// sets; a later `reserve` hands it out again.
    #[instrument(skip(self, payload), fields(queue = %self.namespace.queue()))]
    pub async fn put(&self, payload: &str, delay_secs: u64) -> QueueResult<bool> {
        let score = self.clock.now().after(delay_secs);
        let created = self.store.upsert(self.namespace.ready(), payload, score).await?;
        self.metrics.increment_jobs_put();
        debug!(%score, created, "Put job");
        Ok(true)
    }

    /// Take the earliest due job, if any.
    ///
    /// The reservation expires `ttr_secs` from now; zero means it never does
    /// and the reclaimer leaves it alone.
    #[instrument(skip(self), fields(queue = %self.namespace.queue()))]
    pub async fn reserve(&self, ttr_secs: u64) -> QueueResult<Option<String>> {
        let now = self.clock.now();
        let transition = Transition::earliest_due(
            self.namespace.ready(),
            self.namespace.reserved(),
            now,
            now.deadline(ttr_secs),
        );

        match self.store.execute_atomic(&transition).await? {
            TransitionOutcome::Moved { payload, inserted } => {
                if !inserted {
                    debug!("Job was already reserved, keeping its deadline");
                }
                self.metrics.increment_jobs_reserved();
                Ok(Some(payload))
            }
            TransitionOutcome::NotFound => Ok(None),
        }
    }

    /// Give a reserved job back, reservable `delay_secs` from now
    #[instrument(skip(self, payload), fields(queue = %self.namespace.queue()))]
    pub async fn release(&self, payload: &str, delay_secs: u64) -> QueueResult<bool> {
        let score = self.clock.now().after(delay_secs);
        let moved = self
            .transition(self.namespace.reserved(), self.namespace.ready(), payload, score)
            .await?;
        if moved {
            self.metrics.increment_jobs_released();
        }
        Ok(moved)
    }

    /// Quarantine a reserved job until it is kicked
    #[instrument(skip(self, payload), fields(queue = %self.namespace.queue()))]
    pub async fn bury(&self, payload: &str) -> QueueResult<bool> {
        let score = self.clock.now();
        let moved = self
            .transition(self.namespace.reserved(), self.namespace.buried(), payload, score)
            .await?;
        if moved {
            self.metrics.increment_jobs_buried();
        }
        Ok(moved)
    }

    /// Return a buried job to the ready set, reservable `delay_secs` from now
    #[instrument(skip(self, payload), fields(queue = %self.namespace.queue()))]
    pub async fn kick(&self, payload: &str, delay_secs: u64) -> QueueResult<bool> {
        let score = self.clock.now().after(delay_secs);
        let moved = self
            .transition(self.namespace.buried(), self.namespace.ready(), payload, score)
            .await?;
        if moved {
            self.metrics.increment_jobs_kicked();
        }
        Ok(moved)
    }

    /// Confirm a reserved job. Only the reserved set is touched.
    #[instrument(skip(self, payload), fields(queue = %self.namespace.queue()))]
    pub async fn delete(&self, payload: &str) -> QueueResult<bool> {
        let removed = self.store.remove(self.namespace.reserved(), payload).await?;
        if removed {
            self.metrics.increment_jobs_deleted();
        } else {
            debug!("Job not reserved, nothing deleted");
        }
        Ok(removed)
    }

    /// Whether `reserve` would find a job right now
    pub async fn have_ready_job(&self) -> QueueResult<bool> {
        let due = ScoreRange::due(self.clock.now());
        Ok(self.store.count(self.namespace.ready(), due).await? > 0)
    }

    /// Job counts of this queue
    pub async fn stats(&self) -> QueueResult<QueueStats> {
        let due = ScoreRange::due(self.clock.now());
        let total_ready = self.store.cardinality(self.namespace.ready()).await?;
        let ready = self.store.count(self.namespace.ready(), due).await?;
        let reserved = self.store.cardinality(self.namespace.reserved()).await?;
        let buried = self.store.cardinality(self.namespace.buried()).await?;

        Ok(QueueStats {
            delayed: total_ready.saturating_sub(ready),
            ready,
            reserved,
            buried,
        })
    }

    /// Buried payloads, oldest burial first
    pub async fn buried_jobs(&self, limit: usize) -> QueueResult<Vec<String>> {
        self.store
            .range_by_score(self.namespace.buried(), ScoreRange::all(), limit)
            .await
    }

    pub fn namespace(&self) -> &QueueNamespace {
        &self.namespace
    }

    pub fn metrics(&self) -> &Arc<QueueMetrics> {
        &self.metrics
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn transition(
        &self,
        source: &str,
        destination: &str,
        payload: &str,
        score: Score,
    ) -> QueueResult<bool> {
        let transition = Transition::member(source, destination, payload, score);
        match self.store.execute_atomic(&transition).await? {
            TransitionOutcome::Moved { inserted, .. } => {
                if !inserted {
                    debug!(destination, "Job already present in destination, score kept");
                }
                Ok(true)
            }
            TransitionOutcome::NotFound => {
                debug!(source, "Job not found in source set");
                Ok(false)
            }
        }
    }
}

impl<S: OrderedStore> Clone for Client<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            namespace: self.namespace.clone(),
            key_prefix: self.key_prefix.clone(),
            clock: self.clock.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

impl<S: OrderedStore> fmt::Debug for Client<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("namespace", &self.namespace)
            .field("now", &self.clock.now())
            .finish_non_exhaustive()
    }
}
