//! Conversions from external infrastructure errors into domain errors.

use std::error::Error as StdError;

use reqwest::Error as HttpError;
use vkrpc_domain::{ApiError, TransportError};

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub TransportError);

impl From<InfraError> for TransportError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<InfraError> for ApiError {
    fn from(value: InfraError) -> Self {
        value.0.into()
    }
}

impl From<TransportError> for InfraError {
    fn from(value: TransportError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoTransportError {
    fn into_transport(self) -> TransportError;
}

/// Display text of an error and all of its sources, joined with `": "`.
///
/// reqwest's own message is generic ("error sending request"); the phrases
/// the classifier matches on ("unexpected EOF", "GOAWAY", "connection reset
/// by peer") live in hyper and io errors further down the chain.
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → TransportError */
/* -------------------------------------------------------------------------- */

impl IntoTransportError for HttpError {
    fn into_transport(self) -> TransportError {
        if let Some(status) = self.status() {
            return TransportError::Status {
                code: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("unknown status").to_string(),
            };
        }

        let message = error_chain(&self);
        if self.is_builder() {
            return TransportError::Serialization(message);
        }
        if self.is_body() || self.is_decode() {
            return TransportError::Read(message);
        }
        TransportError::Network(message)
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_transport())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
