//! Metrics collection modules
//!
//! Thread-safe metrics for physical calls.

pub mod call;

// Re-export metric types for convenience
pub use call::CallMetrics;
