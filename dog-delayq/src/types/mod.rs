pub mod namespace;
pub mod score;
pub mod stats;
pub mod transition;

pub use namespace::QueueNamespace;
pub use score::{Score, ScoreRange};
pub use stats::QueueStats;
pub use transition::{Selector, Transition, TransitionOutcome};
