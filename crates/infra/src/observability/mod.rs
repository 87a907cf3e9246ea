//! Observability infrastructure for logging, metrics, and request statistics
//!
//! ## Design Principles
//!
//! 1. **Observers, not registries**: metrics and statistics are
//!    [`CallObserver`](vkrpc_core::ports::CallObserver)s injected into the
//!    transport. Nothing here registers with an exporter.
//!
//! 2. **Poison Recovery**: All std mutex locks recover from poisoning (log a
//!    warning, continue with the recovered data).
//!
//! 3. **Ring Buffers**: VecDeque for O(1) eviction (not Vec with remove(0))
//!
//! 4. **Never block the request path**: statistics are dropped rather than
//!    awaited when the consumer falls behind.

pub mod logging;
pub mod metrics;
pub mod stats;

pub use logging::{init_tracing, LogFormat};
pub use metrics::CallMetrics;
pub use stats::{RequestStat, StatsObserver};

/// Metrics error type
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Empty data set - cannot calculate aggregate metric
    #[error("Empty data: cannot calculate {metric}")]
    EmptyData {
        /// Metric name that failed (e.g., "P95", "P50")
        metric: &'static str,
    },
}

/// Result type for metrics operations
pub type MetricsResult<T> = Result<T, MetricsError>;
