use thiserror::Error;

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Infrastructure errors for queue operations.
///
/// Expected outcomes such as an empty `reserve` or a `release` of a payload
/// that is no longer reserved are not errors; they surface as `None`/`false`.
#[derive(Error, Debug, Clone)]
pub enum QueueError {
    /// The store was unreachable or rejected a command
    #[error("Store error: {0}")]
    Store(String),

    /// The store replied with something the transition protocol does not allow
    #[error("Protocol violation: {0}")]
    Protocol(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Reclaimer task terminated: {0}")]
    ReclaimerShutdown(String),
}

impl QueueError {
    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Whether the error came from the store connection rather than from us
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for QueueError {
    fn from(err: redis::RedisError) -> Self {
        Self::Store(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_failure_classification() {
        assert!(QueueError::store("connection refused").is_store_failure());
        assert!(!QueueError::protocol("bad reply").is_store_failure());
        assert!(!QueueError::Config("empty queue name".into()).is_store_failure());
    }

    #[test]
    fn test_error_display() {
        let err = QueueError::store("connection refused");
        assert_eq!(err.to_string(), "Store error: connection refused");
    }
}
