//! Shared test helpers for `vkrpc-core` integration tests.
//!
//! An in-memory transport that replays a queue of scripted replies, so the
//! orchestrator and retry ladders can be exercised without a network and
//! under paused time.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use vkrpc_core::ports::Transport;
use vkrpc_domain::{CallSpec, Credential, RetryConfig, TransportError};

/// One scripted transport reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Body(String),
    Fail(TransportError),
    /// Never answers; resolves only when the call is cancelled.
    Hang,
}

impl Reply {
    pub fn ok(payload: &str) -> Self {
        Self::Body(format!(r#"{{"response": {payload}}}"#))
    }

    pub fn error(code: i64, message: &str) -> Self {
        Self::Body(format!(r#"{{"error": {{"error_code": {code}, "error_msg": "{message}"}}}}"#))
    }

    pub fn flood() -> Self {
        Self::error(6, "Too many requests per second")
    }
}

/// Transport that pops replies in order. Once the queue is empty every call
/// gets `fallback`.
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    calls: Mutex<Vec<CallSpec>>,
    stopped: CancellationToken,
}

impl ScriptedTransport {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Self::with_fallback(replies, Reply::ok("1"))
    }

    pub fn with_fallback(replies: impl IntoIterator<Item = Reply>, fallback: Reply) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            fallback,
            calls: Mutex::new(Vec::new()),
            stopped: CancellationToken::new(),
        })
    }

    /// Number of physical calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls(&self) -> Vec<CallSpec> {
        self.calls.lock().clone()
    }

    /// Refuse every later call with [`TransportError::Shutdown`].
    pub fn stop(&self) {
        self.stopped.cancel();
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        call: &CallSpec,
        _credential: &Credential,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, TransportError> {
        if self.stopped.is_cancelled() {
            return Err(TransportError::Shutdown);
        }
        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        self.calls.lock().push(call.clone());

        let reply = self.replies.lock().pop_front().unwrap_or_else(|| self.fallback.clone());
        match reply {
            Reply::Body(body) => Ok(body.into_bytes()),
            Reply::Fail(err) => Err(err),
            Reply::Hang => {
                cancel.cancelled().await;
                Err(TransportError::Cancelled)
            }
        }
    }

    fn shutdown_signal(&self) -> Option<CancellationToken> {
        Some(self.stopped.clone())
    }
}

pub fn credential() -> Option<Credential> {
    Some(Credential::new("test-token"))
}

pub fn retry_config() -> RetryConfig {
    RetryConfig::default()
}
