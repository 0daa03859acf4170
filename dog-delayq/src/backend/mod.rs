pub mod memory;

#[cfg(feature = "redis")]
pub mod redis;

use async_trait::async_trait;

use crate::{QueueResult, Score, ScoreRange, Transition, TransitionOutcome};

/// Storage primitives for named, score-ordered sets.
///
/// Entries are ordered by score ascending, then by payload bytes. Every method
/// is a single atomic step against the store; `execute_atomic` is the only one
/// that touches two sets and it must be indivisible with respect to every
/// other call on the same store, from any process.
#[async_trait]
pub trait OrderedStore: Send + Sync {
    /// Insert `member` or update its score. Returns true if it was newly added.
    async fn upsert(&self, set: &str, member: &str, score: Score) -> QueueResult<bool>;

    /// Members with a score inside `range`, in set order, at most `limit` of them
    async fn range_by_score(
        &self,
        set: &str,
        range: ScoreRange,
        limit: usize,
    ) -> QueueResult<Vec<String>>;

    /// Remove `member`. Returns true if it was present.
    async fn remove(&self, set: &str, member: &str) -> QueueResult<bool>;

    async fn contains(&self, set: &str, member: &str) -> QueueResult<bool>;

    /// Number of members with a score inside `range`
    async fn count(&self, set: &str, range: ScoreRange) -> QueueResult<u64>;

    /// Number of members in the set
    async fn cardinality(&self, set: &str) -> QueueResult<u64>;

    /// Run one transition: take the selected member out of the source set and
    /// put it in the destination unless it is already there.
    async fn execute_atomic(&self, transition: &Transition) -> QueueResult<TransitionOutcome>;
}
