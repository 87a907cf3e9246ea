use serde::Deserialize;
use serde_json::Value;
use vkrpc_domain::{ApiError, CallOutcome, ProtocolError, ResponseEnvelope, Result};

use super::taxonomy::{is_flood_control, transient_kind, TransientKind};

/// Routing decision for one parsed envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Successful call, possibly with partial sub-call failures.
    Ok(CallOutcome),
    /// Platform rate limiting; goes to the flood ladder.
    Flood(ProtocolError),
    /// Protocol error whose text names a transient transport condition.
    Transient { kind: TransientKind, error: ProtocolError },
    /// Any other non-zero error code.
    Fatal(ProtocolError),
}

/// Stateless envelope parser.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseClassifier;

impl ResponseClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Parse raw bytes into an envelope.
    ///
    /// Anything that is not a JSON object with the envelope shape is a
    /// [`ApiError::Parse`] and is never retried.
    pub fn classify(&self, raw: &[u8]) -> Result<ResponseEnvelope> {
        let value: Value = serde_json::from_slice(raw).map_err(|e| ApiError::Parse(e.to_string()))?;
        if !value.is_object() {
            return Err(ApiError::Parse(format!("expected a JSON object, got {}", kind_of(&value))));
        }
        ResponseEnvelope::deserialize(value).map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// Decide what to do with a parsed envelope.
    pub fn verdict(&self, envelope: ResponseEnvelope) -> Verdict {
        let Some(error) = envelope.protocol_error() else {
            return Verdict::Ok(envelope.into_outcome());
        };

        if is_flood_control(error) {
            return Verdict::Flood(error.clone());
        }
        match transient_kind(&error.error_msg) {
            Some(kind) => Verdict::Transient { kind, error: error.clone() },
            None => Verdict::Fatal(error.clone()),
        }
    }

    /// [`classify`](Self::classify) followed by [`verdict`](Self::verdict).
    pub fn assess(&self, raw: &[u8]) -> Result<Verdict> {
        self.classify(raw).map(|envelope| self.verdict(envelope))
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
