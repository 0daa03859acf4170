use serde::{Deserialize, Serialize};

const READY_TAG: &str = "_#READY";
const RESERVED_TAG: &str = "_#RESERVED";
const BURIED_TAG: &str = "_#BURIED";

/// The three state-set names belonging to one queue.
///
/// No tag is a suffix of another, so two distinct queue names can never
/// produce the same set name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueNamespace {
    queue: String,
    ready: String,
    reserved: String,
    buried: String,
}

impl QueueNamespace {
    pub fn new(queue: impl Into<String>) -> Self {
        let queue = queue.into();
        Self::derive(queue.clone(), &queue)
    }

    /// Namespace whose set names are prefixed with `{prefix}:`
    pub fn with_prefix(prefix: &str, queue: impl Into<String>) -> Self {
        let queue = queue.into();
        let base = format!("{}:{}", prefix, queue);
        Self::derive(queue, &base)
    }

    fn derive(queue: String, base: &str) -> Self {
        Self {
            ready: format!("{}{}", base, READY_TAG),
            reserved: format!("{}{}", base, RESERVED_TAG),
            buried: format!("{}{}", base, BURIED_TAG),
            queue,
        }
    }

    /// Queue name as given by the caller
    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn ready(&self) -> &str {
        &self.ready
    }

    pub fn reserved(&self) -> &str {
        &self.reserved
    }

    pub fn buried(&self) -> &str {
        &self.buried
    }
}
