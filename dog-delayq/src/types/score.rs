use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a payload inside a state set, in Unix seconds.
///
/// In the ready set it is the not-before time, in the reserved set the
/// reservation deadline. Buried entries carry the bury time, which nothing reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Score(pub i64);

impl Score {
    /// Reservation deadline that never passes. Sorts below every real timestamp.
    pub const NEVER: Score = Score(-1);

    /// Lowest score that can be due
    pub const EPOCH: Score = Score(0);

    /// Score `secs` seconds after `self`
    pub fn after(self, secs: u64) -> Self {
        let secs = i64::try_from(secs).unwrap_or(i64::MAX);
        Self(self.0.saturating_add(secs))
    }

    /// Deadline for a reservation held for `ttr_secs`; zero means no deadline
    pub fn deadline(self, ttr_secs: u64) -> Self {
        if ttr_secs == 0 {
            Self::NEVER
        } else {
            self.after(ttr_secs)
        }
    }

    pub fn as_i64(self) -> i64 {
        self.0
    }

    pub fn is_never(self) -> bool {
        self == Self::NEVER
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Score {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Closed score interval `[min, max]` used by range and count queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreRange {
    pub min: Score,
    pub max: Score,
}

impl ScoreRange {
    pub fn new(min: Score, max: Score) -> Self {
        Self { min, max }
    }

    /// Entries whose time has come at `now`. Excludes [`Score::NEVER`].
    pub fn due(now: Score) -> Self {
        Self::new(Score::EPOCH, now)
    }

    /// Every possible score
    pub fn all() -> Self {
        Self::new(Score(i64::MIN), Score(i64::MAX))
    }

    pub fn contains(&self, score: Score) -> bool {
        self.min <= score && score <= self.max
    }
}
