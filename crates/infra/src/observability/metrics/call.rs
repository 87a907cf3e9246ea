//! Physical call metrics
//!
//! Tracks total and failed physical calls, per-method call counts, and a
//! latency ring buffer for P50/P95/P99.
//!
//! ## Design
//! - **VecDeque ring buffer** for O(1) eviction (not Vec with remove(0))
//! - **Poison-safe locking** with explicit match pattern (no .expect())
//! - **SeqCst ordering** for counters read together in snapshots

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use vkrpc_core::ports::{CallObserver, CallRecord};

use crate::observability::{MetricsError, MetricsResult};

const LATENCY_SAMPLES: usize = 1000;

/// Metrics for physical calls, fed by the transport.
#[derive(Debug, Default)]
pub struct CallMetrics {
    /// Total number of physical calls
    pub total_calls: AtomicUsize,
    /// Physical calls that ended in a transport error
    pub failed_calls: AtomicUsize,
    by_method: Mutex<HashMap<String, usize>>,
    latencies: Mutex<VecDeque<u64>>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, metric: &'static str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poison_err) => {
            tracing::warn!(metric, "Mutex poisoned, recovering data");
            poison_err.into_inner()
        }
    }
}

impl CallMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one finished physical call.
    pub fn record(&self, method: &str, elapsed: Duration, failed: bool) {
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        if failed {
            self.failed_calls.fetch_add(1, Ordering::SeqCst);
        }

        *lock(&self.by_method, "CallMetrics::by_method").entry(method.to_string()).or_default() += 1;

        let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let mut latencies = lock(&self.latencies, "CallMetrics::latencies");
        latencies.push_back(ms);
        if latencies.len() > LATENCY_SAMPLES {
            latencies.pop_front();
        }
    }

    /// Physical calls made to `method` so far.
    pub fn calls_for(&self, method: &str) -> usize {
        lock(&self.by_method, "CallMetrics::by_method").get(method).copied().unwrap_or_default()
    }

    /// Share of physical calls that failed, 0.0 when nothing was recorded.
    pub fn failure_rate(&self) -> f64 {
        let total = self.total_calls.load(Ordering::SeqCst);
        if total == 0 {
            return 0.0;
        }
        self.failed_calls.load(Ordering::SeqCst) as f64 / total as f64
    }

    pub fn p50_ms(&self) -> MetricsResult<u64> {
        self.percentile(0.50, "P50")
    }

    pub fn p95_ms(&self) -> MetricsResult<u64> {
        self.percentile(0.95, "P95")
    }

    pub fn p99_ms(&self) -> MetricsResult<u64> {
        self.percentile(0.99, "P99")
    }

    fn percentile(&self, percentile: f64, metric: &'static str) -> MetricsResult<u64> {
        let latencies = lock(&self.latencies, "CallMetrics::latencies");
        if latencies.is_empty() {
            return Err(MetricsError::EmptyData { metric });
        }

        let mut sorted: Vec<u64> = latencies.iter().copied().collect();
        sorted.sort_unstable();

        let index = ((sorted.len() as f64 * percentile) as usize).min(sorted.len() - 1);
        Ok(sorted[index])
    }
}

impl CallObserver for CallMetrics {
    fn on_call(&self, record: &CallRecord<'_>) {
        self.record(record.method, record.elapsed, record.error.is_some());
    }
}
