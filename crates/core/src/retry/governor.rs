use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;
use vkrpc_domain::RetryConfig;

/// Which ladder a failure climbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ladder {
    Flood,
    Transport,
}

/// Outcome of asking the governor about one failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for the given delay, then re-issue the call.
    Retry(Duration),
    /// Surface the error to the caller.
    Stop,
}

/// Per-client retry counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryState {
    pub flood_retry_count: u32,
    pub http_retry_count: u32,
}

/// Decides whether a classified failure is re-issued.
///
/// Counters are not reset by a success; they only return to zero when a
/// ladder reaches its ceiling.
#[derive(Debug)]
pub struct RetryGovernor {
    config: RetryConfig,
    state: Mutex<RetryState>,
}

impl RetryGovernor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config, state: Mutex::new(RetryState::default()) }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Snapshot of the counters.
    pub fn state(&self) -> RetryState {
        *self.state.lock()
    }

    /// Record one failure on `ladder` for a call to `method`.
    pub fn on_failure(&self, ladder: Ladder, method: &str) -> RetryDecision {
        match ladder {
            Ladder::Flood => self.on_flood(),
            Ladder::Transport => self.on_transport(method),
        }
    }

    /// Flood ladder: the delay is chosen from the count before this failure.
    pub fn on_flood(&self) -> RetryDecision {
        let mut state = self.state.lock();
        let previous = state.flood_retry_count;
        let (next, decision) = climb(previous, self.config.flood_ceiling, self.config.flood_delay(previous));
        state.flood_retry_count = next;
        drop(state);

        debug!(ladder = "flood", count = previous, ?decision, "flood ladder step");
        decision
    }

    /// Transport ladder. Side-effecting methods are never re-issued and do
    /// not touch the counter.
    pub fn on_transport(&self, method: &str) -> RetryDecision {
        if !self.config.is_idempotent(method) {
            debug!(method, "transport failure on non-idempotent method; not retrying");
            return RetryDecision::Stop;
        }

        let mut state = self.state.lock();
        let previous = state.http_retry_count;
        let (next, decision) = climb(previous, self.config.transport_ceiling, self.config.transport_delay());
        state.http_retry_count = next;
        drop(state);

        debug!(ladder = "transport", method, count = previous, ?decision, "transport ladder step");
        decision
    }
}

fn climb(previous: u32, ceiling: u32, delay: Duration) -> (u32, RetryDecision) {
    let next = previous.saturating_add(1);
    if next >= ceiling {
        (0, RetryDecision::Stop)
    } else {
        (next, RetryDecision::Retry(delay))
    }
}
