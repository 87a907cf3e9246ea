use std::sync::Arc;

use parking_lot::Mutex;
use vkrpc_core::ports::{CallObserver, FanoutObserver, Transport};
use vkrpc_core::{BatchCompiler, CancellationRegistry, QuietErrors, RequestOrchestrator};
use vkrpc_domain::{ApiError, ClientConfig, Credential, RetryConfig};

use super::VkClient;
use crate::http::HttpTransport;

/// Builder for [`VkClient`].
#[derive(Default)]
pub struct VkClientBuilder {
    config: ClientConfig,
    registry: Option<Arc<CancellationRegistry>>,
    observers: FanoutObserver,
    transport: Option<Arc<dyn Transport>>,
    http_client: Option<reqwest::Client>,
}

impl VkClientBuilder {
    /// Replace the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.config.access_token = Some(token.into());
        self
    }

    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_url = url.into();
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    /// Cancellation registry that [`VkClient::shutdown`] signals.
    ///
    /// Defaults to [`CancellationRegistry::shared`]. Clients sharing a
    /// registry shut down together; give a client its own to isolate it:
    ///
    /// ```no_run
    /// # use std::sync::Arc;
    /// # use vkrpc_core::CancellationRegistry;
    /// # use vkrpc_infra::VkClient;
    /// let client = VkClient::builder()
    ///     .access_token("token")
    ///     .registry(Arc::new(CancellationRegistry::new()))
    ///     .build()?;
    /// # Ok::<(), vkrpc_domain::ApiError>(())
    /// ```
    pub fn registry(mut self, registry: Arc<CancellationRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Add a per-call observer (metrics, statistics). May be repeated.
    pub fn observer(mut self, observer: Arc<dyn CallObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Reuse a reqwest client for the HTTP transport.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Use a custom transport. Observers and the HTTP settings are then
    /// ignored; the registry is still what [`VkClient::shutdown`] signals.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<VkClient, ApiError> {
        let registry = self.registry.unwrap_or_else(CancellationRegistry::shared);

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => {
                let mut builder = HttpTransport::builder()
                    .api_url(&self.config.api_url)
                    .api_version(&self.config.api_version)
                    .registry(Arc::clone(&registry));
                if let Some(timeout) = self.config.request_timeout() {
                    builder = builder.timeout(timeout);
                }
                if let Some(client) = self.http_client {
                    builder = builder.client(client);
                }
                if !self.observers.is_empty() {
                    builder = builder.observer(Arc::new(self.observers));
                }
                Arc::new(builder.build()?)
            }
        };

        let credential = self.config.access_token.map(Credential::new);
        let orchestrator = RequestOrchestrator::new(transport, credential, self.config.retry)
            .with_quiet_errors(QuietErrors::new(self.config.quiet_errors));

        Ok(VkClient { orchestrator, compiler: BatchCompiler::new(), registry, last_execute: Mutex::new(None) })
    }
}
