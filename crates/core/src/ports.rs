//! Port interfaces for the request execution core
//!
//! These traits define the boundaries between the core and infrastructure
//! implementations (HTTP transport, metrics sinks).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use vkrpc_domain::{CallSpec, Credential, TransportError};

/// Executes one physical call and returns the raw response body.
///
/// Implementations must:
/// - fail fast with [`TransportError::Shutdown`] once the process is shutting
///   down, without touching the network
/// - stop waiting as soon as `cancel` fires
/// - leave payload interpretation to the response classifier
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        call: &CallSpec,
        credential: &Credential,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, TransportError>;

    /// Token cancelled when the transport stops accepting calls for good.
    /// The orchestrator uses it to cut retry sleeps short.
    fn shutdown_signal(&self) -> Option<CancellationToken> {
        None
    }
}

/// What an observer learns about a finished physical call.
#[derive(Debug, Clone, Copy)]
pub struct CallRecord<'a> {
    pub method: &'a str,
    pub elapsed: Duration,
    pub error: Option<&'a TransportError>,
}

/// Receives one record per physical call (metrics, statistics channels).
///
/// Called on the request path, so implementations must not block.
pub trait CallObserver: Send + Sync {
    fn on_call(&self, record: &CallRecord<'_>);
}

/// Observer that discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl CallObserver for NoopObserver {
    fn on_call(&self, _record: &CallRecord<'_>) {}
}

/// Forwards each record to several observers in registration order.
#[derive(Default, Clone)]
pub struct FanoutObserver {
    observers: Vec<Arc<dyn CallObserver>>,
}

impl FanoutObserver {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, observer: Arc<dyn CallObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn push(&mut self, observer: Arc<dyn CallObserver>) {
        self.observers.push(observer);
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl CallObserver for FanoutObserver {
    fn on_call(&self, record: &CallRecord<'_>) {
        for observer in &self.observers {
            observer.on_call(record);
        }
    }
}
