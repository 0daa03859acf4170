use std::sync::atomic::{AtomicU64, Ordering};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Live counters for queue operations.
///
/// Only successful transitions are counted; no-op outcomes are not. Share one
/// instance between clients and reclaimers with `Arc`.
#[derive(Debug, Default)]
pub struct QueueMetrics {
    jobs_put: AtomicU64,
    jobs_reserved: AtomicU64,
    jobs_released: AtomicU64,
    jobs_buried: AtomicU64,
    jobs_kicked: AtomicU64,
    jobs_deleted: AtomicU64,
    jobs_reclaimed: AtomicU64,
    reclaim_failures: AtomicU64,
}

impl QueueMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_jobs_put(&self) {
        self.jobs_put.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_jobs_reserved(&self) {
        self.jobs_reserved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_jobs_released(&self) {
        self.jobs_released.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_jobs_buried(&self) {
        self.jobs_buried.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_jobs_kicked(&self) {
        self.jobs_kicked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_jobs_deleted(&self) {
        self.jobs_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_jobs_reclaimed(&self, count: u64) {
        self.jobs_reclaimed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_reclaim_failures(&self) {
        self.reclaim_failures.fetch_add(1, Ordering::Relaxed);
    }

    // Getters
    pub fn jobs_put(&self) -> u64 {
        self.jobs_put.load(Ordering::Relaxed)
    }

    pub fn jobs_reserved(&self) -> u64 {
        self.jobs_reserved.load(Ordering::Relaxed)
    }

    pub fn jobs_released(&self) -> u64 {
        self.jobs_released.load(Ordering::Relaxed)
    }

    pub fn jobs_buried(&self) -> u64 {
        self.jobs_buried.load(Ordering::Relaxed)
    }

    pub fn jobs_kicked(&self) -> u64 {
        self.jobs_kicked.load(Ordering::Relaxed)
    }

    pub fn jobs_deleted(&self) -> u64 {
        self.jobs_deleted.load(Ordering::Relaxed)
    }

    pub fn jobs_reclaimed(&self) -> u64 {
        self.jobs_reclaimed.load(Ordering::Relaxed)
    }

    pub fn reclaim_failures(&self) -> u64 {
        self.reclaim_failures.load(Ordering::Relaxed)
    }

    /// Copy of every counter at this moment
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            jobs_put: self.jobs_put(),
            jobs_reserved: self.jobs_reserved(),
            jobs_released: self.jobs_released(),
            jobs_buried: self.jobs_buried(),
            jobs_kicked: self.jobs_kicked(),
            jobs_deleted: self.jobs_deleted(),
            jobs_reclaimed: self.jobs_reclaimed(),
            reclaim_failures: self.reclaim_failures(),
            taken_at: Utc::now(),
        }
    }
}

/// Serialisable view of [`QueueMetrics`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub jobs_put: u64,
    pub jobs_reserved: u64,
    pub jobs_released: u64,
    pub jobs_buried: u64,
    pub jobs_kicked: u64,
    pub jobs_deleted: u64,
    pub jobs_reclaimed: u64,
    pub reclaim_failures: u64,
    pub taken_at: DateTime<Utc>,
}

impl MetricsSnapshot {
    /// Reservations that ended in a confirm, as a percentage of all reservations
    pub fn completion_rate(&self) -> f64 {
        if self.jobs_reserved == 0 {
            100.0
        } else {
            (self.jobs_deleted as f64 / self.jobs_reserved as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = QueueMetrics::new();
        metrics.increment_jobs_put();
        metrics.increment_jobs_reserved();
        metrics.increment_jobs_reserved();
        metrics.increment_jobs_deleted();
        metrics.add_jobs_reclaimed(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.jobs_put, 1);
        assert_eq!(snapshot.jobs_reserved, 2);
        assert_eq!(snapshot.jobs_reclaimed, 3);
        assert_eq!(snapshot.completion_rate(), 50.0);
    }

    #[test]
    fn test_empty_completion_rate() {
        assert_eq!(QueueMetrics::new().snapshot().completion_rate(), 100.0);
    }
}
