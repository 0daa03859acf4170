use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::{FailurePolicy, QueueError, QueueNamespace, QueueResult};

/// Configuration shared by clients and reclaimers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Queue a client is bound to
    pub queue_name: String,
    /// Optional prefix for every set name (`{prefix}:{queue}_#READY`)
    pub key_prefix: Option<String>,
    /// Queues a reclaimer watches
    pub watch_queues: Vec<String>,
    /// Seconds between reclaim passes when the reclaimer is spawned
    pub reclaim_interval_secs: u64,
    /// What a reclaim pass does when the store fails
    pub failure_policy: FailurePolicy,
    /// Connection URL for the Redis store
    pub redis_url: Option<String>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            queue_name: "default".to_string(),
            key_prefix: None,
            watch_queues: Vec::new(),
            reclaim_interval_secs: 1,
            failure_policy: FailurePolicy::Skip,
            redis_url: None,
        }
    }
}

impl QueueConfig {
    pub fn new(queue_name: impl Into<String>) -> Self {
        Self {
            queue_name: queue_name.into(),
            ..Self::default()
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_watch_queues<I, Q>(mut self, queues: I) -> Self
    where
        I: IntoIterator<Item = Q>,
        Q: Into<String>,
    {
        self.watch_queues = queues.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_reclaim_interval(mut self, interval: Duration) -> Self {
        self.reclaim_interval_secs = interval.as_secs().max(1);
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = Some(url.into());
        self
    }

    pub fn reclaim_interval(&self) -> Duration {
        Duration::from_secs(self.reclaim_interval_secs)
    }

    /// Namespace of a queue under this configuration's key prefix
    pub fn namespace_for(&self, queue: &str) -> QueueNamespace {
        match &self.key_prefix {
            Some(prefix) => QueueNamespace::with_prefix(prefix, queue),
            None => QueueNamespace::new(queue),
        }
    }

    /// Namespace of the configured queue
    pub fn namespace(&self) -> QueueNamespace {
        self.namespace_for(&self.queue_name)
    }

    /// Reject configurations that would address unnamed queues
    pub fn validate(&self) -> QueueResult<()> {
        if self.queue_name.is_empty() {
            return Err(QueueError::Config("queue_name must not be empty".to_string()));
        }
        if self.watch_queues.iter().any(String::is_empty) {
            return Err(QueueError::Config("watch_queues must not contain empty names".to_string()));
        }
        if self.reclaim_interval_secs == 0 {
            return Err(QueueError::Config("reclaim_interval_secs must be positive".to_string()));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration document
    #[cfg(feature = "json")]
    pub fn from_json(json: &str) -> QueueResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}
