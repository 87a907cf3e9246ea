use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ApiError;

/// Request parameter echoed back by the platform inside an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestParam {
    pub key: String,
    #[serde(default)]
    pub value: Value,
}

/// Envelope-level error. A non-zero code fails the whole call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProtocolError {
    #[serde(default)]
    pub error_code: i64,
    #[serde(default)]
    pub error_msg: String,
    #[serde(default)]
    pub request_params: Vec<RequestParam>,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.error_msg)
    }
}

/// Failure of one sub-call inside an otherwise successful execute script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialError {
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub error_code: i64,
    #[serde(default)]
    pub error_msg: String,
}

/// The platform's response envelope:
/// `{"response": ..., "error": {...}, "execute_errors": [...]}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub response: Value,
    #[serde(default)]
    pub error: Option<ProtocolError>,
    #[serde(default)]
    pub execute_errors: Vec<PartialError>,
}

impl ResponseEnvelope {
    /// The envelope error, if it carries a non-zero code.
    pub fn protocol_error(&self) -> Option<&ProtocolError> {
        self.error.as_ref().filter(|err| err.error_code != 0)
    }

    /// Drop the error part and keep what a successful call returns.
    pub fn into_outcome(self) -> CallOutcome {
        CallOutcome { payload: self.response, partial_errors: self.execute_errors }
    }
}

/// Result of a successful logical call.
///
/// `partial_errors` is auxiliary data: a sub-call failing inside an execute
/// script never fails the call itself.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallOutcome {
    pub payload: Value,
    pub partial_errors: Vec<PartialError>,
}

impl CallOutcome {
    /// Deserialize the payload into a concrete response shape.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        T::deserialize(&self.payload).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub fn has_partial_errors(&self) -> bool {
        !self.partial_errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_error_code_is_not_a_failure() {
        let envelope: ResponseEnvelope =
            serde_json::from_str(r#"{"response": 1, "error": {"error_code": 0}}"#).unwrap();
        assert!(envelope.protocol_error().is_none());
    }

    #[test]
    fn parses_request_param_echo() {
        let envelope: ResponseEnvelope = serde_json::from_str(
            r#"{"error": {"error_code": 5, "error_msg": "User authorization failed: invalid session.",
                "request_params": [{"key": "method", "value": "users.get"}, {"key": "oauth", "value": 1}]}}"#,
        )
        .unwrap();

        let err = envelope.protocol_error().unwrap();
        assert_eq!(err.error_code, 5);
        assert_eq!(err.request_params.len(), 2);
        assert_eq!(err.request_params[0].key, "method");
        assert_eq!(envelope.response, Value::Null);
    }

    #[test]
    fn outcome_decodes_payload_and_keeps_partial_errors() {
        let envelope: ResponseEnvelope = serde_json::from_str(
            r#"{"response": [1, 2, 3],
                "execute_errors": [{"method": "wall.get", "error_code": 15, "error_msg": "Access denied"}]}"#,
        )
        .unwrap();

        let outcome = envelope.into_outcome();
        let ids: Vec<u64> = outcome.decode().unwrap();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(outcome.has_partial_errors());
        assert_eq!(outcome.partial_errors[0].method, "wall.get");
    }

    #[test]
    fn decode_mismatch_is_a_decode_error() {
        let outcome = CallOutcome { payload: Value::String("x".into()), partial_errors: vec![] };
        let result: Result<Vec<u64>, ApiError> = outcome.decode();
        assert!(matches!(result, Err(ApiError::Decode(_))));
    }
}
