//! Unified error handling for the powerd-bridge crate
//!
//! Request-level failures are described by [`ClientError`] and classified
//! into an [`ErrorKind`]. The coordinator only ever records the kind, while
//! callers of user-initiated operations receive the full [`Error`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use powerd_bridge::error::{Error, ErrorKind};
//!
//! match coordinator.set_mode("performance").await {
//!     Err(err) if err.kind() == Some(ErrorKind::Authentication) => {
//!         eprintln!("token rejected: {err}");
//!     }
//!     other => other?,
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub use crate::client::error::ClientError;

/// Classification of daemon failures
///
/// The coordinator treats every kind identically (record it, keep the last
/// good snapshot). The distinction matters to setup and to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad or missing bearer token (HTTP 401)
    Authentication,
    /// Network unreachable, timeout expiry or a non-2xx status
    Connection,
    /// Response body is not a JSON object
    Protocol,
}

impl ErrorKind {
    /// Reason code reported to the host during setup
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authentication => "invalid_auth",
            Self::Connection => "cannot_connect",
            Self::Protocol => "invalid_response",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the powerd-bridge crate
#[derive(Error, Debug)]
pub enum Error {
    /// Daemon request errors
    #[error("Daemon error: {0}")]
    Client(#[from] ClientError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// `start()` was called on a coordinator that is already running
    #[error("Coordinator is already running")]
    AlreadyRunning,

    /// Refresh interval outside the accepted range
    #[error("Invalid refresh interval: {0}")]
    InvalidInterval(String),

    /// I/O errors while reading a file
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// TOML parse errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Daemon failure kind, if this error came from a request
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Client(e) => Some(e.kind()),
            _ => None,
        }
    }

    /// Check if this error is recoverable (a later attempt may succeed)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Client(e) => e.kind() != ErrorKind::Authentication,
            Self::Io { .. } => true,
            Self::Config(_) | Self::AlreadyRunning | Self::InvalidInterval(_) | Self::Toml(_) => {
                false
            }
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_reason_codes() {
        assert_eq!(ErrorKind::Authentication.as_str(), "invalid_auth");
        assert_eq!(ErrorKind::Connection.as_str(), "cannot_connect");
        assert_eq!(ErrorKind::Protocol.to_string(), "invalid_response");
    }

    #[test]
    fn test_error_conversion() {
        let unified: Error = ClientError::Authentication.into();
        assert!(matches!(unified, Error::Client(_)));
        assert_eq!(unified.kind(), Some(ErrorKind::Authentication));
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::from(ClientError::Timeout).is_recoverable());
        assert!(Error::from(ClientError::Status { status: 503 }).is_recoverable());
        assert!(!Error::from(ClientError::Authentication).is_recoverable());
        assert!(!Error::config("bad port").is_recoverable());
    }

    #[test]
    fn test_config_error_has_no_kind() {
        assert_eq!(Error::config("empty host").kind(), None);
        assert_eq!(Error::AlreadyRunning.kind(), None);
    }
}
