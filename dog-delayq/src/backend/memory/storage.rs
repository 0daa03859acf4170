use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use parking_lot::RwLock;

use crate::{
    QueueResult, Score, ScoreRange, Selector, Transition, TransitionOutcome,
    backend::OrderedStore,
};

use super::sorted_set::SortedSet;

type SetMap = HashMap<String, SortedSet>;

/// In-memory ordered store for tests and single-process deployments.
///
/// Clones share the same sets, so any number of clients and reclaimers can be
/// pointed at one store. A single lock covers every set, which makes
/// `execute_atomic` indivisible.
#[derive(Clone, Default)]
pub struct MemoryStore {
    pub(crate) sets: Arc<RwLock<SetMap>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current score of `member` in `set` (inspection helper)
    pub fn score(&self, set: &str, member: &str) -> Option<Score> {
        self.sets.read().get(set).and_then(|entry| entry.score(member))
    }

    /// Names of sets currently holding at least one member
    pub fn set_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.sets.read().keys().cloned().collect();
        names.sort();
        names
    }
}

/// Empty sets are dropped, as Redis does with empty keys
fn remove_member(sets: &mut SetMap, set: &str, member: &str) -> bool {
    let Some(entry) = sets.get_mut(set) else {
        return false;
    };
    let removed = entry.remove(member);
    if entry.is_empty() {
        sets.remove(set);
    }
    removed
}

#[async_trait]
impl OrderedStore for MemoryStore {
    async fn upsert(&self, set: &str, member: &str, score: Score) -> QueueResult<bool> {
        let mut sets = self.sets.write();
        Ok(sets.entry(set.to_string()).or_default().upsert(member, score))
    }

    async fn range_by_score(
        &self,
        set: &str,
        range: ScoreRange,
        limit: usize,
    ) -> QueueResult<Vec<String>> {
        let sets = self.sets.read();
        Ok(sets
            .get(set)
            .map(|entry| entry.range(range).take(limit).map(str::to_string).collect())
            .unwrap_or_default())
    }

    async fn remove(&self, set: &str, member: &str) -> QueueResult<bool> {
        Ok(remove_member(&mut self.sets.write(), set, member))
    }

    async fn contains(&self, set: &str, member: &str) -> QueueResult<bool> {
        Ok(self
            .sets
            .read()
            .get(set)
            .is_some_and(|entry| entry.contains(member)))
    }

    async fn count(&self, set: &str, range: ScoreRange) -> QueueResult<u64> {
        Ok(self
            .sets
            .read()
            .get(set)
            .map_or(0, |entry| entry.range(range).count() as u64))
    }

    async fn cardinality(&self, set: &str) -> QueueResult<u64> {
        Ok(self.sets.read().get(set).map_or(0, |entry| entry.len() as u64))
    }

    async fn execute_atomic(&self, transition: &Transition) -> QueueResult<TransitionOutcome> {
        let mut sets = self.sets.write();

        let payload = match &transition.selector {
            Selector::Member(payload) => payload.clone(),
            Selector::EarliestDue { max_score } => {
                let due = sets
                    .get(&transition.source)
                    .and_then(|entry| entry.first_in(ScoreRange::due(*max_score)));
                match due {
                    Some(payload) => payload,
                    None => return Ok(TransitionOutcome::NotFound),
                }
            }
        };

        if !remove_member(&mut sets, &transition.source, &payload) {
            return Ok(TransitionOutcome::NotFound);
        }

        let destination = sets.entry(transition.destination.clone()).or_default();
        let inserted = !destination.contains(&payload);
        if inserted {
            destination.upsert(&payload, transition.score);
        }

        Ok(TransitionOutcome::Moved { payload, inserted })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_reports_creation() {
        let store = MemoryStore::new();
        assert!(store.upsert("ready", "job", Score(10)).await.unwrap());
        assert!(!store.upsert("ready", "job", Score(20)).await.unwrap());
        assert_eq!(store.score("ready", "job"), Some(Score(20)));
        assert_eq!(store.cardinality("ready").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_range_respects_limit_and_order() {
        let store = MemoryStore::new();
        store.upsert("ready", "c", Score(3)).await.unwrap();
        store.upsert("ready", "a", Score(1)).await.unwrap();
        store.upsert("ready", "b", Score(2)).await.unwrap();

        let first_two = store.range_by_score("ready", ScoreRange::all(), 2).await.unwrap();
        assert_eq!(first_two, vec!["a", "b"]);
        assert_eq!(store.count("ready", ScoreRange::due(Score(2))).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_missing_set_reads_as_empty() {
        let store = MemoryStore::new();
        assert!(!store.contains("nothing", "job").await.unwrap());
        assert!(!store.remove("nothing", "job").await.unwrap());
        assert_eq!(store.cardinality("nothing").await.unwrap(), 0);
        assert!(store.range_by_score("nothing", ScoreRange::all(), 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transition_moves_member() {
        let store = MemoryStore::new();
        store.upsert("src", "job", Score(1)).await.unwrap();

        let outcome = store
            .execute_atomic(&Transition::member("src", "dst", "job", Score(50)))
            .await
            .unwrap();

        assert_eq!(outcome, TransitionOutcome::Moved { payload: "job".into(), inserted: true });
        assert!(!store.contains("src", "job").await.unwrap());
        assert_eq!(store.score("dst", "job"), Some(Score(50)));
        assert_eq!(store.set_names(), vec!["dst"]);
    }

    #[tokio::test]
    async fn test_transition_keeps_existing_destination_score() {
        let store = MemoryStore::new();
        store.upsert("src", "job", Score(1)).await.unwrap();
        store.upsert("dst", "job", Score(7)).await.unwrap();

        let outcome = store
            .execute_atomic(&Transition::member("src", "dst", "job", Score(50)))
            .await
            .unwrap();

        assert_eq!(outcome, TransitionOutcome::Moved { payload: "job".into(), inserted: false });
        assert_eq!(store.score("dst", "job"), Some(Score(7)));
        assert!(!store.contains("src", "job").await.unwrap());
    }

    #[tokio::test]
    async fn test_transition_missing_member_changes_nothing() {
        let store = MemoryStore::new();
        store.upsert("dst", "other", Score(1)).await.unwrap();

        let outcome = store
            .execute_atomic(&Transition::member("src", "dst", "job", Score(50)))
            .await
            .unwrap();

        assert_eq!(outcome, TransitionOutcome::NotFound);
        assert!(!store.contains("dst", "job").await.unwrap());
    }

    #[tokio::test]
    async fn test_earliest_due_skips_sentinel_and_future() {
        let store = MemoryStore::new();
        store.upsert("src", "forever", Score::NEVER).await.unwrap();
        store.upsert("src", "later", Score(200)).await.unwrap();
        store.upsert("src", "b", Score(90)).await.unwrap();
        store.upsert("src", "a", Score(90)).await.unwrap();

        let move_due = Transition::earliest_due("src", "dst", Score(100), Score(100));
        let first = store.execute_atomic(&move_due).await.unwrap();
        let second = store.execute_atomic(&move_due).await.unwrap();
        let third = store.execute_atomic(&move_due).await.unwrap();

        assert_eq!(first.into_payload().as_deref(), Some("a"));
        assert_eq!(second.into_payload().as_deref(), Some("b"));
        assert_eq!(third, TransitionOutcome::NotFound);
        assert!(store.contains("src", "forever").await.unwrap());
        assert!(store.contains("src", "later").await.unwrap());
    }
}
