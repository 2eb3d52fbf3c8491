//! HTTP client for the Framework Power Daemon
//!
//! The daemon exposes two endpoints:
//!
//! ```text
//! GET  {base_url}/status   -> 200 + JSON object
//! POST {base_url}/mode     <- {"mode": "<string>"}
//! ```
//!
//! Both accept an optional `Authorization: Bearer <token>` header and
//! answer 401 when the token is missing or wrong. Every call is bounded by
//! the client's request timeout and is attempted exactly once; retry policy
//! belongs to the caller.

pub mod error;
pub mod snapshot;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use std::time::{Duration, Instant};

use crate::error::ErrorKind;

pub use error::ClientError;
pub use snapshot::StatusSnapshot;

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Endpoint
// ============================================================================

/// Address and credentials of one daemon
///
/// Built once from configuration and never mutated; a configuration change
/// produces a new endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct DaemonEndpoint {
    base_url: String,
    auth_token: Option<String>,
}

impl DaemonEndpoint {
    /// Create an endpoint; an empty token counts as no token
    pub fn new(base_url: impl Into<String>, auth_token: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let auth_token = auth_token.filter(|t| !t.trim().is_empty());
        Self {
            base_url,
            auth_token,
        }
    }

    /// Compose `http://{host}:{port}`
    pub fn from_host_port(host: &str, port: u16, auth_token: Option<String>) -> Self {
        Self::new(format!("http://{host}:{port}"), auth_token)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    pub fn status_url(&self) -> String {
        format!("{}/status", self.base_url)
    }

    pub fn mode_url(&self) -> String {
        format!("{}/mode", self.base_url)
    }
}

impl std::fmt::Debug for DaemonEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaemonEndpoint")
            .field("base_url", &self.base_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

// ============================================================================
// Status Source
// ============================================================================

/// A daemon the coordinator can poll and write to
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetch and decode the current status document
    async fn fetch_status(&self) -> Result<StatusSnapshot, ClientError>;

    /// Ask the daemon to switch power mode
    async fn set_mode(&self, mode: &str) -> Result<(), ClientError>;
}

// ============================================================================
// Status Client
// ============================================================================

#[derive(Debug, Serialize)]
struct ModeRequest<'a> {
    mode: &'a str,
}

/// Stateless client for the daemon's HTTP API
///
/// Cloning is cheap and clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct StatusClient {
    http_client: Client,
    timeout: Duration,
}

impl StatusClient {
    /// Create a client whose requests are bounded by `timeout`
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Init` if the HTTP client cannot be created
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("powerd-bridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ClientError::Init)?;

        Ok(Self {
            http_client,
            timeout,
        })
    }

    /// Create a client with the default 10 second timeout
    pub fn with_defaults() -> Result<Self, ClientError> {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Pair this client with an endpoint so it can feed a coordinator
    pub fn bind(self, endpoint: DaemonEndpoint) -> BoundClient {
        BoundClient {
            client: self,
            endpoint,
        }
    }

    /// GET `/status` and decode the body as a JSON object
    ///
    /// # Errors
    ///
    /// - `ClientError::Authentication` on HTTP 401
    /// - `ClientError::Status` on any other non-2xx status
    /// - `ClientError::Timeout` / `ClientError::Connection` on network failure
    /// - `ClientError::Protocol` if the body is not a JSON object
    pub async fn fetch_status(
        &self,
        endpoint: &DaemonEndpoint,
    ) -> Result<StatusSnapshot, ClientError> {
        let url = endpoint.status_url();
        let start = Instant::now();

        let request = authorize(self.http_client.get(&url), endpoint);
        let response = check_status(request.send().await?)?;
        let body = response.bytes().await?;
        let snapshot = StatusSnapshot::from_slice(&body)?;

        tracing::debug!(
            url = %url,
            fields = snapshot.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fetched daemon status"
        );

        Ok(snapshot)
    }

    /// POST `{"mode": mode}` to `/mode`
    ///
    /// The daemon answers 200 or 204 on success; the body is ignored.
    pub async fn set_mode(&self, endpoint: &DaemonEndpoint, mode: &str) -> Result<(), ClientError> {
        let url = endpoint.mode_url();

        let request = authorize(self.http_client.post(&url), endpoint).json(&ModeRequest { mode });
        check_status(request.send().await?)?;

        tracing::info!(url = %url, mode = %mode, "Daemon power mode set");
        Ok(())
    }

    /// Setup-time reachability check
    ///
    /// Only the status code is inspected: 401 maps to
    /// [`ErrorKind::Authentication`], every other failure to
    /// [`ErrorKind::Connection`].
    pub async fn check_connection(&self, endpoint: &DaemonEndpoint) -> Result<(), ErrorKind> {
        let request = authorize(self.http_client.get(endpoint.status_url()), endpoint);

        match request.send().await {
            Ok(response) if response.status() == StatusCode::UNAUTHORIZED => {
                Err(ErrorKind::Authentication)
            }
            Ok(response) if response.status() == StatusCode::OK => Ok(()),
            Ok(response) => {
                tracing::debug!(status = response.status().as_u16(), "Daemon check failed");
                Err(ErrorKind::Connection)
            }
            Err(e) => {
                tracing::debug!(error = %e, "Daemon unreachable");
                Err(ErrorKind::Connection)
            }
        }
    }
}

fn authorize(request: RequestBuilder, endpoint: &DaemonEndpoint) -> RequestBuilder {
    match endpoint.auth_token() {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(ClientError::Authentication);
    }
    if !status.is_success() {
        return Err(ClientError::Status {
            status: status.as_u16(),
        });
    }
    Ok(response)
}

// ============================================================================
// Bound Client
// ============================================================================

/// A [`StatusClient`] tied to one [`DaemonEndpoint`]
#[derive(Debug, Clone)]
pub struct BoundClient {
    client: StatusClient,
    endpoint: DaemonEndpoint,
}

impl BoundClient {
    pub fn endpoint(&self) -> &DaemonEndpoint {
        &self.endpoint
    }

    pub fn client(&self) -> &StatusClient {
        &self.client
    }
}

#[async_trait]
impl StatusSource for BoundClient {
    async fn fetch_status(&self) -> Result<StatusSnapshot, ClientError> {
        self.client.fetch_status(&self.endpoint).await
    }

    async fn set_mode(&self, mode: &str) -> Result<(), ClientError> {
        self.client.set_mode(&self.endpoint, mode).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_urls() {
        let endpoint = DaemonEndpoint::from_host_port("localhost", 7890, None);

        assert_eq!(endpoint.base_url(), "http://localhost:7890");
        assert_eq!(endpoint.status_url(), "http://localhost:7890/status");
        assert_eq!(endpoint.mode_url(), "http://localhost:7890/mode");
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let endpoint = DaemonEndpoint::new("http://10.0.0.5:7890/", None);
        assert_eq!(endpoint.status_url(), "http://10.0.0.5:7890/status");
    }

    #[test]
    fn test_empty_token_is_none() {
        let endpoint = DaemonEndpoint::new("http://localhost:7890", Some("  ".to_string()));
        assert_eq!(endpoint.auth_token(), None);

        let endpoint = DaemonEndpoint::new("http://localhost:7890", Some("secret".to_string()));
        assert_eq!(endpoint.auth_token(), Some("secret"));
    }

    #[test]
    fn test_endpoint_debug_redacts_token() {
        let endpoint = DaemonEndpoint::new("http://localhost:7890", Some("secret".to_string()));
        let debug = format!("{endpoint:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_client_creation() {
        let client = StatusClient::with_defaults().unwrap();
        assert_eq!(client.timeout(), DEFAULT_REQUEST_TIMEOUT);
    }
}
