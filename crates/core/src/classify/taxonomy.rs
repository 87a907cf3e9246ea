//! Failure phrase tables
//!
//! The platform exposes no structured retryability flag. Retryable and
//! expected conditions are recognised from literal phrases in HTTP status
//! lines, transport error text and `error_msg`. The literals below must match
//! the platform's wording exactly.

use once_cell::sync::Lazy;
use regex::Regex;
use vkrpc_domain::constants::{FLOOD_CONTROL_CODE, FLOOD_CONTROL_MESSAGE};
use vkrpc_domain::{ProtocolError, TransportError};

/// Closed set of transient conditions that the transport ladder may retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransientKind {
    UnexpectedEof,
    GoAway,
    BadRequest,
    InternalServerError,
    EntityTooLarge,
    Canceled,
}

impl TransientKind {
    /// Canonical phrase for this kind.
    pub fn phrase(self) -> &'static str {
        match self {
            Self::UnexpectedEof => "unexpected EOF",
            Self::GoAway => "server sent GOAWAY",
            Self::BadRequest => "Bad Request",
            Self::InternalServerError => "Internal Server Error",
            Self::EntityTooLarge => "Request Entity Too Large",
            Self::Canceled => "context canceled",
        }
    }

    fn from_status(code: u16) -> Option<Self> {
        match code {
            400 => Some(Self::BadRequest),
            413 => Some(Self::EntityTooLarge),
            500 => Some(Self::InternalServerError),
            _ => None,
        }
    }
}

/// Phrase → kind, first match wins.
const TRANSIENT_PHRASES: &[(&str, TransientKind)] = &[
    ("unexpected EOF", TransientKind::UnexpectedEof),
    ("end of file before message length reached", TransientKind::UnexpectedEof),
    ("server sent GOAWAY", TransientKind::GoAway),
    ("Bad Request", TransientKind::BadRequest),
    ("Internal Server Error", TransientKind::InternalServerError),
    ("Request Entity Too Large", TransientKind::EntityTooLarge),
    ("context canceled", TransientKind::Canceled),
];

/// Failures that are routine for this platform and not worth an error log.
const EXPECTED_FAILURE_PHRASES: &[&str] = &[
    "server sent GOAWAY",
    "User authorization failed",
    "unexpected EOF",
    "Database problems, try later",
    "Internal Server Error",
    "Bad Request",
    "Gateway Timeout",
    "Bad Gateway",
    "could not check access_token now",
    "connection reset by peer",
    "Request Entity Too Large",
    "response size is too big",
    "context canceled",
];

static EXPECTED_FAILURES: Lazy<Option<Regex>> = Lazy::new(|| {
    let alternation =
        EXPECTED_FAILURE_PHRASES.iter().map(|phrase| regex::escape(phrase)).collect::<Vec<_>>().join("|");
    Regex::new(&alternation).ok()
});

/// Map free-form failure text to a transient kind.
pub fn transient_kind(message: &str) -> Option<TransientKind> {
    TRANSIENT_PHRASES.iter().find(|(phrase, _)| message.contains(phrase)).map(|(_, kind)| *kind)
}

/// Transient kind of a transport failure, if the transport ladder may
/// retry it.
///
/// Explicit cancellation and shutdown are never transient; a deadline that
/// fired is reported as [`TransientKind::Canceled`].
pub fn transport_transient_kind(err: &TransportError) -> Option<TransientKind> {
    match err {
        TransportError::Status { code, status_text } => {
            TransientKind::from_status(*code).or_else(|| transient_kind(status_text))
        }
        TransportError::Read(message) | TransportError::Network(message) => transient_kind(message),
        TransportError::Timeout(_) => Some(TransientKind::Canceled),
        TransportError::Serialization(_) | TransportError::Cancelled | TransportError::Shutdown => None,
    }
}

/// Whether a protocol error is the platform's rate-limit signal.
pub fn is_flood_control(err: &ProtocolError) -> bool {
    err.error_msg == FLOOD_CONTROL_MESSAGE || err.error_code == FLOOD_CONTROL_CODE
}

/// Failure text that is routine for this platform: built-in phrases plus a
/// per-client list.
#[derive(Debug, Clone, Default)]
pub struct QuietErrors {
    extra: Vec<String>,
}

impl QuietErrors {
    pub fn new(extra: impl IntoIterator<Item = String>) -> Self {
        Self { extra: extra.into_iter().filter(|phrase| !phrase.is_empty()).collect() }
    }

    pub fn is_expected(&self, message: &str) -> bool {
        EXPECTED_FAILURES.as_ref().is_some_and(|re| re.is_match(message))
            || self.extra.iter().any(|phrase| message.contains(phrase.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn phrase_table_matches_platform_wording() {
        assert_eq!(transient_kind("read tcp: unexpected EOF"), Some(TransientKind::UnexpectedEof));
        assert_eq!(transient_kind("http2: server sent GOAWAY and closed the connection"), Some(TransientKind::GoAway));
        assert_eq!(transient_kind("400 Bad Request"), Some(TransientKind::BadRequest));
        assert_eq!(transient_kind("Internal Server Error"), Some(TransientKind::InternalServerError));
        assert_eq!(transient_kind("413 Request Entity Too Large"), Some(TransientKind::EntityTooLarge));
        assert_eq!(transient_kind("context canceled"), Some(TransientKind::Canceled));
        assert_eq!(transient_kind("Access denied"), None);
        // case sensitive, like the platform contract
        assert_eq!(transient_kind("bad request"), None);
    }

    #[test]
    fn every_kind_phrase_maps_back_to_itself() {
        for kind in [
            TransientKind::UnexpectedEof,
            TransientKind::GoAway,
            TransientKind::BadRequest,
            TransientKind::InternalServerError,
            TransientKind::EntityTooLarge,
            TransientKind::Canceled,
        ] {
            assert_eq!(transient_kind(kind.phrase()), Some(kind));
        }
    }

    #[test]
    fn status_codes_map_structurally() {
        let err = TransportError::Status { code: 500, status_text: String::new() };
        assert_eq!(transport_transient_kind(&err), Some(TransientKind::InternalServerError));

        let bad_gateway = TransportError::Status { code: 502, status_text: "Bad Gateway".into() };
        assert_eq!(transport_transient_kind(&bad_gateway), None);
    }

    #[test]
    fn cancellation_and_shutdown_are_not_transient() {
        assert_eq!(transport_transient_kind(&TransportError::Cancelled), None);
        assert_eq!(transport_transient_kind(&TransportError::Shutdown), None);
        assert_eq!(
            transport_transient_kind(&TransportError::Timeout(Duration::from_secs(1))),
            Some(TransientKind::Canceled)
        );
        assert_eq!(transport_transient_kind(&TransportError::Network("connection reset by peer".into())), None);
    }

    #[test]
    fn flood_control_by_message_or_code() {
        let by_message = ProtocolError { error_code: 9, error_msg: FLOOD_CONTROL_MESSAGE.into(), ..Default::default() };
        let by_code = ProtocolError { error_code: 6, error_msg: "rate limited".into(), ..Default::default() };
        let other = ProtocolError { error_code: 15, error_msg: "Access denied".into(), ..Default::default() };

        assert!(is_flood_control(&by_message));
        assert!(is_flood_control(&by_code));
        assert!(!is_flood_control(&other));
    }

    #[test]
    fn quiet_errors_cover_builtin_and_custom_phrases() {
        let quiet = QuietErrors::new(vec!["Access denied: group is blocked".to_string(), String::new()]);

        assert!(quiet.is_expected("User authorization failed: invalid session."));
        assert!(quiet.is_expected("502 Bad Gateway"));
        assert!(quiet.is_expected("Access denied: group is blocked"));
        assert!(!quiet.is_expected("One of the parameters specified was missing or invalid"));
        assert!(!QuietErrors::default().is_expected(""));
    }
}
