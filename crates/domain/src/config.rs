//! Client configuration structures
//!
//! Loaded by `vkrpc-infra::config::loader` from the environment or a TOML/JSON
//! file. Every field has a default matching the platform's expectations, so
//! partial files are accepted.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{API_METHOD_URL, API_VERSION};

/// Top-level client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Bearer token. `None` builds a client that rejects every call.
    pub access_token: Option<String>,
    /// Method dispatch endpoint; the method name is appended to it.
    pub api_url: String,
    /// Pinned protocol version sent as the `v` parameter.
    pub api_version: String,
    /// Per physical call deadline, enforced by cancelling the request.
    pub request_timeout_secs: Option<u64>,
    pub retry: RetryConfig,
    /// Extra failure phrases that should not be logged at error level.
    pub quiet_errors: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            api_url: API_METHOD_URL.to_string(),
            api_version: API_VERSION.to_string(),
            request_timeout_secs: None,
            retry: RetryConfig::default(),
            quiet_errors: Vec::new(),
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.filter(|secs| *secs > 0).map(Duration::from_secs)
    }
}

/// One rung of the flood ladder: counters below `below` sleep `delay_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloodStep {
    pub below: u32,
    pub delay_ms: u64,
}

/// Settings for the two retry ladders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Consecutive flood failures at which the flood counter resets and the
    /// error is surfaced.
    pub flood_ceiling: u32,
    /// Ordered rungs; counters past the last rung use `flood_tail_delay_ms`.
    pub flood_steps: Vec<FloodStep>,
    pub flood_tail_delay_ms: u64,
    /// Consecutive transport failures at which the transport counter resets
    /// and the error is surfaced.
    pub transport_ceiling: u32,
    pub transport_delay_ms: u64,
    /// Side-effecting methods that are never re-issued after a transport
    /// failure.
    pub non_idempotent_methods: BTreeSet<String>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            flood_ceiling: 26,
            flood_steps: vec![
                FloodStep { below: 5, delay_ms: 1_000 },
                FloodStep { below: 10, delay_ms: 2_000 },
                FloodStep { below: 20, delay_ms: 3_000 },
            ],
            flood_tail_delay_ms: 5_000,
            transport_ceiling: 4,
            transport_delay_ms: 1_000,
            non_idempotent_methods: ["wall.post", "wall.repost"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl RetryConfig {
    /// Sleep for the given flood counter value (before increment).
    ///
    /// Rungs are applied in order, so the result is non-decreasing as long as
    /// the configured rungs are.
    pub fn flood_delay(&self, count: u32) -> Duration {
        let millis = self
            .flood_steps
            .iter()
            .find(|step| count < step.below)
            .map_or(self.flood_tail_delay_ms, |step| step.delay_ms);
        Duration::from_millis(millis)
    }

    pub fn transport_delay(&self) -> Duration {
        Duration::from_millis(self.transport_delay_ms)
    }

    pub fn is_idempotent(&self, method: &str) -> bool {
        !self.non_idempotent_methods.contains(method)
    }

    /// Same ladder shape with every delay scaled to zero. Test helper for
    /// callers that want ladder bookkeeping without wall-clock waits.
    #[must_use]
    pub fn without_delays(mut self) -> Self {
        for step in &mut self.flood_steps {
            step.delay_ms = 0;
        }
        self.flood_tail_delay_ms = 0;
        self.transport_delay_ms = 0;
        self
    }
}
