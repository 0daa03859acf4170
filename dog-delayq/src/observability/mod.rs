pub mod metrics;

#[cfg(feature = "tracing-basic")]
pub mod logging;

pub use metrics::{MetricsSnapshot, QueueMetrics};

#[cfg(feature = "tracing-basic")]
pub use logging::{init_tracing, LogFormat};
