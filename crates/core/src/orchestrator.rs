//! Request orchestrator - one logical call
//!
//! Composes the transport, the response classifier and the retry governor.
//! The loop has no iteration cap of its own; it ends when a call succeeds,
//! fails fatally, or a ladder declines.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use vkrpc_domain::{ApiError, CallOutcome, CallSpec, Credential, Result, RetryConfig};

use crate::classify::{transport_transient_kind, QuietErrors, ResponseClassifier, Verdict};
use crate::ports::Transport;
use crate::retry::{Ladder, RetryDecision, RetryGovernor};

pub struct RequestOrchestrator {
    transport: Arc<dyn Transport>,
    credential: Option<Credential>,
    governor: RetryGovernor,
    classifier: ResponseClassifier,
    quiet: QuietErrors,
}

impl RequestOrchestrator {
    pub fn new(transport: Arc<dyn Transport>, credential: Option<Credential>, retry: RetryConfig) -> Self {
        Self {
            transport,
            credential,
            governor: RetryGovernor::new(retry),
            classifier: ResponseClassifier::new(),
            quiet: QuietErrors::default(),
        }
    }

    /// Failure phrases that are logged at `debug` instead of `error`.
    #[must_use]
    pub fn with_quiet_errors(mut self, quiet: QuietErrors) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn governor(&self) -> &RetryGovernor {
        &self.governor
    }

    pub fn quiet_errors(&self) -> &QuietErrors {
        &self.quiet
    }

    /// Run one logical call with no caller-side cancellation.
    pub async fn call(&self, call: &CallSpec) -> Result<CallOutcome> {
        self.call_with_cancel(call, &CancellationToken::new()).await
    }

    /// Run one logical call.
    ///
    /// Cancelling `cancel` aborts the physical call in flight and cuts any
    /// retry sleep short; the call then surfaces [`ApiError::Cancelled`] (or
    /// [`ApiError::Shutdown`] when the process is shutting down). A shutdown
    /// of the transport also ends a retry sleep.
    pub async fn call_with_cancel(&self, call: &CallSpec, cancel: &CancellationToken) -> Result<CallOutcome> {
        let credential = self.credential.as_ref().filter(|c| !c.is_empty()).ok_or(ApiError::MissingCredential)?;

        let shutdown = self.transport.shutdown_signal();

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            debug!(method = call.method(), attempt, "sending call");

            let (ladder, err) = match self.transport.send(call, credential, cancel).await {
                Ok(raw) => match self.classifier.assess(&raw) {
                    Ok(Verdict::Ok(outcome)) => return Ok(outcome),
                    Ok(Verdict::Flood(error)) => (
                        Some(Ladder::Flood),
                        ApiError::Flood { code: error.error_code, message: error.error_msg },
                    ),
                    Ok(Verdict::Transient { error, .. }) => (Some(Ladder::Transport), ApiError::Protocol(error)),
                    Ok(Verdict::Fatal(error)) => (None, ApiError::Protocol(error)),
                    Err(err) => (None, err),
                },
                Err(err) => {
                    let ladder = transport_transient_kind(&err).map(|_| Ladder::Transport);
                    (ladder, ApiError::from(err))
                }
            };

            let decision = match ladder {
                Some(ladder) => self.governor.on_failure(ladder, call.method()),
                None => RetryDecision::Stop,
            };

            match decision {
                RetryDecision::Retry(delay) => {
                    warn!(
                        method = call.method(),
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "call failed; retrying"
                    );
                    pause(delay, cancel, shutdown.as_ref()).await;
                }
                RetryDecision::Stop => {
                    self.report(call, attempt, &err);
                    return Err(err);
                }
            }
        }
    }

    fn report(&self, call: &CallSpec, attempt: u32, err: &ApiError) {
        let message = err.to_string();
        if matches!(err, ApiError::Cancelled | ApiError::Shutdown) || self.quiet.is_expected(&message) {
            debug!(method = call.method(), attempt, error = %message, "call failed");
        } else {
            error!(method = call.method(), attempt, category = ?err.category(), error = %message, "call failed");
        }
    }
}

/// Sleep before the next attempt, waking early on cancellation or shutdown.
/// The next attempt then fails fast inside the transport.
async fn pause(delay: Duration, cancel: &CancellationToken, shutdown: Option<&CancellationToken>) {
    if delay.is_zero() {
        return;
    }
    let shutdown = async {
        match shutdown {
            Some(token) => token.cancelled().await,
            None => std::future::pending().await,
        }
    };
    tokio::select! {
        () = tokio::time::sleep(delay) => {}
        () = cancel.cancelled() => {}
        () = shutdown => {}
    }
}
