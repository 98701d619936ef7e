//! Error types for dispatching and endpoint parsing.
//!
//! None of these are retried by the dispatcher. They are logged and published
//! as [`DispatchEvent::Failed`](crate::DispatchEvent::Failed) so the host can
//! surface a transient status; the user re-triggers by typing again.

use std::time::Duration;

use thiserror::Error;

/// Failure of a single channel session.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Endpoint unreachable or handshake rejected; the session never became send-ready.
    #[error("connection to {endpoint} failed: {reason}")]
    Connection {
        /// URL of the endpoint.
        endpoint: String,
        /// Transport-level reason.
        reason: String,
    },
    /// Handshake did not finish in time.
    #[error("connection timed out after {0:?}")]
    ConnectTimeout(Duration),
    /// Session was open but the outbound value could not be delivered.
    #[error("send to {endpoint} failed: {reason}")]
    Send {
        /// URL of the endpoint.
        endpoint: String,
        /// Transport-level reason.
        reason: String,
    },
    /// The inbound stream broke mid-session.
    #[error("receive from {endpoint} failed: {reason}")]
    Receive {
        /// URL of the endpoint.
        endpoint: String,
        /// Transport-level reason.
        reason: String,
    },
    /// No inbound message arrived within the reply timeout.
    #[error("no reply within {0:?}")]
    ReplyTimeout(Duration),
}

impl DispatchError {
    /// Whether the session failed before the value was sent.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::ConnectTimeout(_))
    }

    /// Short classification string for logs and events.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "connection_failed",
            Self::ConnectTimeout(_) => "connect_timeout",
            Self::Send { .. } => "send_failed",
            Self::Receive { .. } => "receive_failed",
            Self::ReplyTimeout(_) => "reply_timeout",
        }
    }
}

/// Errors from parsing an endpoint URL.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EndpointError {
    /// Scheme missing or not `ws`/`wss`.
    #[error("invalid endpoint scheme: {0}")]
    InvalidScheme(String),
    /// Host part is empty.
    #[error("endpoint has no host: {0}")]
    MissingHost(String),
    /// Port is not a valid `u16`.
    #[error("invalid endpoint port: {0}")]
    InvalidPort(String),
}

/// Result type for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> DispatchError {
        DispatchError::Connection {
            endpoint: "ws://127.0.0.1:8000/countries".into(),
            reason: "connection refused".into(),
        }
    }

    #[test]
    fn connection_failures_classified() {
        assert!(connection().is_connection_failure());
        assert!(DispatchError::ConnectTimeout(Duration::from_secs(1)).is_connection_failure());
        assert!(
            !DispatchError::Send {
                endpoint: "e".into(),
                reason: "r".into()
            }
            .is_connection_failure()
        );
        assert!(!DispatchError::ReplyTimeout(Duration::from_secs(1)).is_connection_failure());
    }

    #[test]
    fn error_kind_strings() {
        assert_eq!(connection().error_kind(), "connection_failed");
        assert_eq!(
            DispatchError::ReplyTimeout(Duration::from_millis(10)).error_kind(),
            "reply_timeout"
        );
        assert_eq!(
            DispatchError::Receive {
                endpoint: "e".into(),
                reason: "eof".into()
            }
            .error_kind(),
            "receive_failed"
        );
    }

    #[test]
    fn display_includes_endpoint() {
        let msg = connection().to_string();
        assert!(msg.contains("ws://127.0.0.1:8000/countries"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn endpoint_error_display() {
        let err = EndpointError::InvalidPort("abc".into());
        assert_eq!(err.to_string(), "invalid endpoint port: abc");
    }
}
