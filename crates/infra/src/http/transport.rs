use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use vkrpc_core::ports::{CallObserver, CallRecord, NoopObserver, Transport};
use vkrpc_core::CancellationRegistry;
use vkrpc_domain::constants::{ACCESS_TOKEN_PARAM, API_METHOD_URL, API_VERSION, VERSION_PARAM};
use vkrpc_domain::{ApiError, CallSpec, ClientConfig, Credential, TransportError};

use crate::errors::{error_chain, InfraError};

/// reqwest-backed [`Transport`] for the method endpoint.
///
/// Each physical call is a form-encoded POST to `<api_url><method>`. The call
/// is listed in the cancellation registry while it is on the wire; a process
/// shutdown, the caller's token or the per-call deadline abort it.
#[derive(Clone)]
pub struct HttpTransport {
    client: ReqwestClient,
    api_url: String,
    api_version: String,
    timeout: Option<Duration>,
    registry: Arc<CancellationRegistry>,
    observer: Arc<dyn CallObserver>,
}

impl HttpTransport {
    /// Start building a new transport.
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    /// Transport with the endpoint, version and deadline from `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let mut builder = Self::builder().api_url(&config.api_url).api_version(&config.api_version);
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }

    pub fn registry(&self) -> &Arc<CancellationRegistry> {
        &self.registry
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}{method}", self.api_url)
    }

    /// Call parameters, then `v` unless the caller pinned one, then the
    /// token.
    fn form<'a>(&'a self, call: &'a CallSpec, credential: &'a Credential) -> Vec<(&'a str, &'a str)> {
        let mut form: Vec<(&str, &str)> =
            call.parameters().iter().map(|(key, value)| (key.as_str(), value.as_str())).collect();
        if call.get(VERSION_PARAM).is_none() {
            form.push((VERSION_PARAM, self.api_version.as_str()));
        }
        form.push((ACCESS_TOKEN_PARAM, credential.expose()));
        form
    }

    fn interrupted(&self) -> TransportError {
        if self.registry.is_exited() {
            TransportError::Shutdown
        } else {
            TransportError::Cancelled
        }
    }

    async fn exchange(
        &self,
        call: &CallSpec,
        credential: &Credential,
        token: &CancellationToken,
    ) -> Result<Vec<u8>, TransportError> {
        let request = async {
            let response = self
                .client
                .post(self.method_url(call.method()))
                .form(&self.form(call, credential))
                .send()
                .await
                .map_err(|err| TransportError::from(InfraError::from(err)))?;

            let status = response.status();
            if status != StatusCode::OK {
                return Err(TransportError::Status {
                    code: status.as_u16(),
                    status_text: status.canonical_reason().unwrap_or_default().to_string(),
                });
            }

            let body = response.bytes().await.map_err(|err| TransportError::Read(error_chain(&err)))?;
            Ok::<_, TransportError>(body.to_vec())
        };

        let guarded = async {
            tokio::select! {
                biased;
                () = token.cancelled() => Err(self.interrupted()),
                result = request => result,
            }
        };

        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, guarded)
                .await
                .unwrap_or_else(|_| Err(TransportError::Timeout(limit))),
            None => guarded.await,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        call: &CallSpec,
        credential: &Credential,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, TransportError> {
        if self.registry.is_exited() {
            return Err(TransportError::Shutdown);
        }

        let guard = self.registry.enroll(credential, cancel);
        // shutdown may have swept the registry between the check and enroll
        if self.registry.is_exited() {
            return Err(TransportError::Shutdown);
        }

        let started = Instant::now();
        debug!(method = call.method(), key = guard.key(), "sending HTTP request");
        let result = self.exchange(call, credential, guard.token()).await;
        let elapsed = started.elapsed();
        drop(guard);

        match &result {
            Ok(body) => debug!(method = call.method(), bytes = body.len(), ?elapsed, "received HTTP response"),
            Err(err) => debug!(method = call.method(), error = %err, ?elapsed, "HTTP request failed"),
        }
        self.observer.on_call(&CallRecord { method: call.method(), elapsed, error: result.as_ref().err() });
        result
    }

    fn shutdown_signal(&self) -> Option<CancellationToken> {
        Some(self.registry.exited_token())
    }
}

/// Builder for [`HttpTransport`].
pub struct HttpTransportBuilder {
    api_url: String,
    api_version: String,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    client: Option<ReqwestClient>,
    registry: Option<Arc<CancellationRegistry>>,
    observer: Arc<dyn CallObserver>,
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self {
            api_url: API_METHOD_URL.to_string(),
            api_version: API_VERSION.to_string(),
            timeout: None,
            user_agent: None,
            client: None,
            registry: None,
            observer: Arc::new(NoopObserver),
        }
    }
}

impl HttpTransportBuilder {
    /// Method dispatch endpoint. A missing trailing slash is added.
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        let mut url = url.into();
        if !url.ends_with('/') {
            url.push('/');
        }
        self.api_url = url;
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Per physical call deadline. A fired deadline is reported as
    /// [`TransportError::Timeout`].
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Use a preconfigured reqwest client instead of building one.
    pub fn client(mut self, client: ReqwestClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Registry to enroll calls in. Without one the transport uses
    /// [`CancellationRegistry::shared`], so a shutdown of the shared registry
    /// stops every client that was not given its own.
    pub fn registry(mut self, registry: Arc<CancellationRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn CallObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn build(self) -> Result<HttpTransport, ApiError> {
        let client = match self.client {
            Some(client) => client,
            None => {
                let mut builder = ReqwestClient::builder().no_proxy();
                if let Some(agent) = self.user_agent {
                    builder = builder.user_agent(agent);
                }
                builder
                    .build()
                    .map_err(|err| ApiError::Config(format!("failed to build HTTP client: {}", error_chain(&err))))?
            }
        };

        Ok(HttpTransport {
            client,
            api_url: self.api_url,
            api_version: self.api_version,
            timeout: self.timeout,
            registry: self.registry.unwrap_or_else(CancellationRegistry::shared),
            observer: self.observer,
        })
    }
}
