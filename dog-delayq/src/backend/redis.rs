use std::sync::Arc;
use async_trait::async_trait;
use redis::{AsyncCommands, Client, Script, aio::ConnectionManager};
use tracing::{debug, info};

use crate::{
    QueueConfig, QueueError, QueueResult, Score, ScoreRange, Selector, Transition,
    TransitionOutcome, backend::OrderedStore,
};

/// Transition protocol as one script so Redis runs it without interleaving.
///
/// KEYS[1] source, KEYS[2] destination.
/// ARGV[1] selector kind, ARGV[2] payload or max score, ARGV[3] destination
/// score, ARGV[4] min due score.
/// Returns nil when nothing was removed, else `{payload, inserted}`.
const TRANSITION_SCRIPT: &str = r#"
local source = KEYS[1]
local destination = KEYS[2]
local payload = ARGV[2]

if ARGV[1] == 'due' then
    local found = redis.call('ZRANGEBYSCORE', source, ARGV[4], ARGV[2], 'LIMIT', 0, 1)
    if #found ~= 1 then
        return false
    end
    payload = found[1]
end

if redis.call('ZREM', source, payload) ~= 1 then
    return false
end

local inserted = 0
if not redis.call('ZSCORE', destination, payload) then
    redis.call('ZADD', destination, ARGV[3], payload)
    inserted = 1
end

return {payload, inserted}
"#;

/// Ordered store on Redis sorted sets
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    transition_script: Arc<Script>,
}

impl RedisStore {
    /// Connect to the server at `redis_url`
    pub async fn connect(redis_url: &str) -> QueueResult<Self> {
        let client = Client::open(redis_url).map_err(|e| QueueError::Config(e.to_string()))?;
        let connection = ConnectionManager::new(client).await?;
        info!("Connected to Redis store");
        Ok(Self::from_connection(connection))
    }

    /// Connect using `redis_url` from the configuration
    pub async fn from_config(config: &QueueConfig) -> QueueResult<Self> {
        let url = config
            .redis_url
            .as_deref()
            .ok_or_else(|| QueueError::Config("redis_url is not set".to_string()))?;
        Self::connect(url).await
    }

    pub fn from_connection(connection: ConnectionManager) -> Self {
        Self {
            connection,
            transition_script: Arc::new(Script::new(TRANSITION_SCRIPT)),
        }
    }
}

fn selector_args(selector: &Selector) -> (&'static str, String) {
    match selector {
        Selector::Member(payload) => ("member", payload.clone()),
        Selector::EarliestDue { max_score } => ("due", max_score.to_string()),
    }
}

/// Script reply: nil when nothing moved, else `{payload, inserted}`
fn decode_transition_reply(reply: Option<(String, i64)>) -> QueueResult<TransitionOutcome> {
    match reply {
        None => Ok(TransitionOutcome::NotFound),
        Some((payload, inserted @ (0 | 1))) => Ok(TransitionOutcome::Moved {
            payload,
            inserted: inserted == 1,
        }),
        Some((_, other)) => Err(QueueError::protocol(format!(
            "transition script returned insert flag {}",
            other
        ))),
    }
}

fn redis_limit(limit: usize) -> isize {
    isize::try_from(limit).unwrap_or(isize::MAX)
}

#[async_trait]
impl OrderedStore for RedisStore {
    async fn upsert(&self, set: &str, member: &str, score: Score) -> QueueResult<bool> {
        let mut conn = self.connection.clone();
        let added: i64 = conn.zadd(set, member, score.as_i64()).await?;
        Ok(added == 1)
    }

    async fn range_by_score(
        &self,
        set: &str,
        range: ScoreRange,
        limit: usize,
    ) -> QueueResult<Vec<String>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.connection.clone();
        let members: Vec<String> = conn
            .zrangebyscore_limit(set, range.min.as_i64(), range.max.as_i64(), 0, redis_limit(limit))
            .await?;
        Ok(members)
    }

    async fn remove(&self, set: &str, member: &str) -> QueueResult<bool> {
        let mut conn = self.connection.clone();
        let removed: i64 = conn.zrem(set, member).await?;
        Ok(removed == 1)
    }

    async fn contains(&self, set: &str, member: &str) -> QueueResult<bool> {
        let mut conn = self.connection.clone();
        let score: Option<f64> = conn.zscore(set, member).await?;
        Ok(score.is_some())
    }

    async fn count(&self, set: &str, range: ScoreRange) -> QueueResult<u64> {
        let mut conn = self.connection.clone();
        let count: u64 = conn.zcount(set, range.min.as_i64(), range.max.as_i64()).await?;
        Ok(count)
    }

    async fn cardinality(&self, set: &str) -> QueueResult<u64> {
        let mut conn = self.connection.clone();
        let count: u64 = conn.zcard(set).await?;
        Ok(count)
    }

    async fn execute_atomic(&self, transition: &Transition) -> QueueResult<TransitionOutcome> {
        let mut conn = self.connection.clone();
        let (kind, target) = selector_args(&transition.selector);

        let reply: Option<(String, i64)> = self
            .transition_script
            .key(&transition.source)
            .key(&transition.destination)
            .arg(kind)
            .arg(target)
            .arg(transition.score.as_i64())
            .arg(Score::EPOCH.as_i64())
            .invoke_async(&mut conn)
            .await?;

        let outcome = decode_transition_reply(reply)?;
        if outcome.is_moved() {
            debug!(source = %transition.source, destination = %transition.destination, "Transition applied");
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Client;
    use crate::clock::{Clock, ManualClock};

    #[test]
    fn test_selector_args() {
        assert_eq!(
            selector_args(&Selector::Member("order-1".into())),
            ("member", "order-1".to_string())
        );
        assert_eq!(
            selector_args(&Selector::EarliestDue { max_score: Score(1_000) }),
            ("due", "1000".to_string())
        );
    }

    #[test]
    fn test_decode_transition_reply() {
        assert_eq!(decode_transition_reply(None).unwrap(), TransitionOutcome::NotFound);
        assert_eq!(
            decode_transition_reply(Some(("order-1".into(), 1))).unwrap(),
            TransitionOutcome::Moved { payload: "order-1".into(), inserted: true }
        );
        assert_eq!(
            decode_transition_reply(Some(("order-1".into(), 0))).unwrap(),
            TransitionOutcome::Moved { payload: "order-1".into(), inserted: false }
        );
        assert!(matches!(
            decode_transition_reply(Some(("order-1".into(), 2))),
            Err(QueueError::Protocol(_))
        ));
    }

    #[test]
    fn test_redis_limit_clamps() {
        assert_eq!(redis_limit(10), 10);
        assert_eq!(redis_limit(usize::MAX), isize::MAX);
    }

    #[tokio::test]
    async fn test_missing_url_is_config_error() {
        let result = RedisStore::from_config(&QueueConfig::default()).await;
        assert!(matches!(result, Err(QueueError::Config(_))));
    }

    // Needs a live server: REDIS_URL=redis://localhost:6379 cargo test --features redis -- --ignored
    #[tokio::test]
    #[ignore]
    async fn test_lifecycle_against_redis() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into());
        let store = RedisStore::connect(&url).await.unwrap();
        let clock = ManualClock::starting_now();
        let queue = format!("dog-delayq-test-{}", clock.now());
        let client = Client::new(store, queue).with_clock(clock.clone());

        assert!(client.put("order-1", 3).await.unwrap());
        assert!(!client.have_ready_job().await.unwrap());
        clock.advance(3);
        assert!(client.have_ready_job().await.unwrap());

        assert_eq!(client.reserve(0).await.unwrap().as_deref(), Some("order-1"));
        assert_eq!(client.reserve(0).await.unwrap(), None);
        assert!(client.bury("order-1").await.unwrap());
        assert_eq!(client.buried_jobs(10).await.unwrap(), vec!["order-1"]);
        assert!(client.kick("order-1", 0).await.unwrap());
        assert_eq!(client.reserve(0).await.unwrap().as_deref(), Some("order-1"));
        assert!(client.delete("order-1").await.unwrap());
        assert!(!client.delete("order-1").await.unwrap());
        assert_eq!(client.stats().await.unwrap().total(), 0);
    }
}
