//! Per-call statistics channel
//!
//! [`StatsObserver`] pushes one [`RequestStat`] per physical call into a
//! bounded tokio channel. The request path never waits on the consumer: a
//! record is dropped once the queue is more than 10% full.

use tokio::sync::mpsc;
use tracing::trace;
use vkrpc_core::ports::{CallObserver, CallRecord};

/// One physical call, as seen by the statistics consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestStat {
    pub method: String,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl RequestStat {
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct StatsObserver {
    sender: mpsc::Sender<RequestStat>,
}

impl StatsObserver {
    pub fn new(sender: mpsc::Sender<RequestStat>) -> Self {
        Self { sender }
    }

    /// Observer plus the receiving half of a fresh channel.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<RequestStat>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self::new(sender), receiver)
    }

    fn backlogged(&self) -> bool {
        let max = self.sender.max_capacity();
        let queued = max - self.sender.capacity();
        queued * 10 > max
    }
}

impl CallObserver for StatsObserver {
    fn on_call(&self, record: &CallRecord<'_>) {
        if self.backlogged() {
            trace!(method = record.method, "stats queue backlogged; record dropped");
            return;
        }

        let stat = RequestStat {
            method: record.method.to_string(),
            error: record.error.map(ToString::to_string),
            elapsed_ms: u64::try_from(record.elapsed.as_millis()).unwrap_or(u64::MAX),
        };
        if self.sender.try_send(stat).is_err() {
            trace!(method = record.method, "stats receiver gone or full; record dropped");
        }
    }
}
