use serde::{Deserialize, Serialize};

/// Point-in-time job counts of one queue.
///
/// Each count is read separately, so concurrent mutations can make the
/// snapshot internally inconsistent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Ready entries whose not-before time is still in the future
    #[serde(rename = "current-jobs-delayed")]
    pub delayed: u64,

    /// Ready entries that can be reserved now
    #[serde(rename = "current-jobs-ready")]
    pub ready: u64,

    #[serde(rename = "current-jobs-reserved")]
    pub reserved: u64,

    #[serde(rename = "current-jobs-buried")]
    pub buried: u64,
}

impl QueueStats {
    /// Every job the queue still holds
    pub fn total(&self) -> u64 {
        self.delayed + self.ready + self.reserved + self.buried
    }
}
