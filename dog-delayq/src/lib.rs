//! # dog-delayq: Delayed Job Queue
//!
//! Producers `put` payloads that become reservable after a delay. Consumers
//! `reserve` them and then `delete` (done), `release` (retry later) or `bury`
//! (quarantine until `kick`ed). Reservations that outlive their time-to-run
//! are put back by a [`Reclaimer`], so a consumer dying mid-job never loses it.
//!
//! ## State sets
//!
//! Every queue is three score-ordered sets in an [`OrderedStore`]:
//!
//! | set      | score meaning                          |
//! |----------|----------------------------------------|
//! | ready    | not-before time                        |
//! | reserved | deadline, or [`Score::NEVER`]          |
//! | buried   | bury time (unused)                     |
//!
//! A payload is the job's identity and sits in at most one set. Moving it
//! between sets is a single atomic store operation; when two callers race on
//! the same payload exactly one of them sees it move.
//!
//! ## Quick Start
//!
//! ```rust
//! use dog_delayq::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> QueueResult<()> {
//! let store = MemoryStore::new();
//! let client = Client::new(store.clone(), "orders");
//!
//! client.put("order-1", 0).await?;
//! if let Some(payload) = client.reserve(30).await? {
//!     // process payload...
//!     client.delete(&payload).await?;
//! }
//!
//! let mut reclaimer = Reclaimer::new(store);
//! reclaimer.attach_watch_queue("orders");
//! let report = reclaimer.run().await?;
//! assert_eq!(report.reclaimed, 0);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod observability;
pub mod reclaimer;
pub mod types;

pub use backend::OrderedStore;
pub use backend::memory::MemoryStore;
pub use client::Client;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::QueueConfig;
pub use error::{QueueError, QueueResult};
pub use reclaimer::{FailurePolicy, ReclaimReport, Reclaimer, ReclaimerHandle};
pub use types::{
    QueueNamespace, QueueStats, Score, ScoreRange, Selector, Transition, TransitionOutcome,
};

pub use observability::{MetricsSnapshot, QueueMetrics};

#[cfg(feature = "redis")]
pub use backend::redis::RedisStore;

#[cfg(feature = "tracing-basic")]
pub use observability::{init_tracing, LogFormat};

/// Everything a producer, consumer or reclaimer needs
pub mod prelude {
    pub use crate::{
        Client, MemoryStore, OrderedStore, QueueConfig, QueueError, QueueResult, QueueStats,
        Reclaimer, FailurePolicy,
    };

    #[cfg(feature = "redis")]
    pub use crate::RedisStore;
}
