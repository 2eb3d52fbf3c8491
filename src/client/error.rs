//! Error types for daemon requests

use thiserror::Error;

use crate::error::ErrorKind;

/// Errors that can occur while talking to the power daemon
#[derive(Error, Debug)]
pub enum ClientError {
    /// The daemon rejected the bearer token (HTTP 401)
    #[error("Authentication failed")]
    Authentication,

    /// The daemon answered with a non-success status other than 401
    #[error("Daemon returned HTTP {status}")]
    Status { status: u16 },

    /// The request did not complete within the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// Network-level failure (connection refused, DNS, reset)
    #[error("Connection failed: {0}")]
    Connection(#[source] reqwest::Error),

    /// The response body was not a JSON object
    #[error("Invalid status document: {0}")]
    Protocol(String),

    /// The HTTP client could not be built
    #[error("Failed to initialize HTTP client: {0}")]
    Init(#[source] reqwest::Error),
}

impl ClientError {
    /// Classify this error for the coordinator and setup callers
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication => ErrorKind::Authentication,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Status { .. } | Self::Timeout | Self::Connection(_) | Self::Init(_) => {
                ErrorKind::Connection
            }
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication => Some(401),
            Self::Status { status } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Protocol(err.to_string())
        } else {
            Self::Connection(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(ClientError::Authentication.kind(), ErrorKind::Authentication);
        assert_eq!(
            ClientError::Status { status: 500 }.kind(),
            ErrorKind::Connection
        );
        assert_eq!(ClientError::Timeout.kind(), ErrorKind::Connection);
        assert_eq!(
            ClientError::Protocol("not an object".into()).kind(),
            ErrorKind::Protocol
        );
    }

    #[test]
    fn test_status_code() {
        assert_eq!(ClientError::Authentication.status(), Some(401));
        assert_eq!(ClientError::Status { status: 503 }.status(), Some(503));
        assert_eq!(ClientError::Timeout.status(), None);
    }

    #[test]
    fn test_display() {
        let err = ClientError::Status { status: 502 };
        assert_eq!(err.to_string(), "Daemon returned HTTP 502");
    }
}
