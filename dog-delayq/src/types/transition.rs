use serde::{Deserialize, Serialize};

use super::Score;

/// How the payload to move is picked from the source set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selector {
    /// A specific payload
    Member(String),

    /// The lowest-scored entry with a score in `[0, max_score]`.
    /// Equal scores are broken by byte-wise payload order.
    EarliestDue { max_score: Score },
}

/// One indivisible "remove from source, insert into destination" step.
///
/// The destination score is only written if the destination does not already
/// hold the payload; an existing entry keeps its score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub source: String,
    pub destination: String,
    pub selector: Selector,
    pub score: Score,
}

impl Transition {
    /// Move a named payload
    pub fn member(
        source: impl Into<String>,
        destination: impl Into<String>,
        payload: impl Into<String>,
        score: Score,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            selector: Selector::Member(payload.into()),
            score,
        }
    }

    /// Move whichever entry of `source` became due first
    pub fn earliest_due(
        source: impl Into<String>,
        destination: impl Into<String>,
        now: Score,
        score: Score,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            selector: Selector::EarliestDue { max_score: now },
            score,
        }
    }
}

/// Result of [`crate::backend::OrderedStore::execute_atomic`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The payload left the source set. `inserted` is false when the
    /// destination already held it and its score was left alone.
    Moved { payload: String, inserted: bool },

    /// Nothing matched in the source set; nothing changed
    NotFound,
}

impl TransitionOutcome {
    pub fn is_moved(&self) -> bool {
        matches!(self, Self::Moved { .. })
    }

    pub fn into_payload(self) -> Option<String> {
        match self {
            Self::Moved { payload, .. } => Some(payload),
            Self::NotFound => None,
        }
    }
}
