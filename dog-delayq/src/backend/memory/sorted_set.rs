use std::collections::{BTreeSet, HashMap};

use crate::{Score, ScoreRange};

/// Score-ordered set with unique members, shaped like a Redis sorted set.
///
/// `by_score` holds `(score, member)` pairs so iteration yields score order
/// with byte-wise member order as the tie-break.
#[derive(Debug, Default, Clone)]
pub(crate) struct SortedSet {
    scores: HashMap<String, Score>,
    by_score: BTreeSet<(Score, String)>,
}

impl SortedSet {
    /// Returns true if the member was added rather than rescored
    pub(crate) fn upsert(&mut self, member: &str, score: Score) -> bool {
        match self.scores.insert(member.to_string(), score) {
            Some(previous) => {
                self.by_score.remove(&(previous, member.to_string()));
                self.by_score.insert((score, member.to_string()));
                false
            }
            None => {
                self.by_score.insert((score, member.to_string()));
                true
            }
        }
    }

    pub(crate) fn remove(&mut self, member: &str) -> bool {
        match self.scores.remove(member) {
            Some(score) => {
                self.by_score.remove(&(score, member.to_string()));
                true
            }
            None => false,
        }
    }

    pub(crate) fn contains(&self, member: &str) -> bool {
        self.scores.contains_key(member)
    }

    pub(crate) fn score(&self, member: &str) -> Option<Score> {
        self.scores.get(member).copied()
    }

    pub(crate) fn range(&self, range: ScoreRange) -> impl Iterator<Item = &str> + '_ {
        self.by_score
            .range((range.min, String::new())..)
            .take_while(move |(score, _)| *score <= range.max)
            .map(|(_, member)| member.as_str())
    }

    pub(crate) fn first_in(&self, range: ScoreRange) -> Option<String> {
        self.range(range).next().map(str::to_string)
    }

    pub(crate) fn len(&self) -> usize {
        self.scores.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_rescores_existing_member() {
        let mut set = SortedSet::default();
        assert!(set.upsert("job", Score(10)));
        assert!(!set.upsert("job", Score(5)));
        assert_eq!(set.len(), 1);
        assert_eq!(set.score("job"), Some(Score(5)));
        assert_eq!(set.first_in(ScoreRange::all()), Some("job".to_string()));
    }

    #[test]
    fn test_equal_scores_order_by_member_bytes() {
        let mut set = SortedSet::default();
        set.upsert("b", Score(1));
        set.upsert("a", Score(1));
        set.upsert("c", Score(0));
        let order: Vec<_> = set.range(ScoreRange::all()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let mut set = SortedSet::default();
        set.upsert("never", Score::NEVER);
        set.upsert("due", Score(100));
        set.upsert("late", Score(101));
        let due: Vec<_> = set.range(ScoreRange::due(Score(100))).collect();
        assert_eq!(due, vec!["due"]);
    }

    #[test]
    fn test_remove() {
        let mut set = SortedSet::default();
        set.upsert("job", Score(1));
        assert!(set.remove("job"));
        assert!(!set.remove("job"));
        assert!(set.is_empty());
        assert_eq!(set.first_in(ScoreRange::all()), None);
    }
}
