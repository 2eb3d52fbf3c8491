//! Configuration management for the power daemon bridge
//!
//! Configuration comes from environment variables or a TOML file. Every
//! section is optional in the file and falls back to the defaults below.
//!
//! ```toml
//! name = "Framework Power"
//!
//! [daemon]
//! host = "localhost"
//! port = 7890
//! token = "..."
//!
//! [polling]
//! scan_interval_secs = 30
//! request_timeout_secs = 10
//!
//! [logging]
//! level = "info"
//! format = "text"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::client::DaemonEndpoint;
use crate::entities::{POLLING_INTERVAL_MAX_SECS, POLLING_INTERVAL_MIN_SECS};
use crate::error::{Error, Result};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 7890;
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_NAME: &str = "Framework Power";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Display name used for the device
    pub name: String,

    /// Daemon connection settings
    pub daemon: DaemonConfig,

    /// Polling cadence and request timeout
    pub polling: PollingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Where the daemon listens and how to authenticate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub host: String,

    pub port: u16,

    /// Bearer token; empty means no token
    pub token: Option<String>,
}

/// Polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Seconds between scheduled refreshes
    pub scan_interval_secs: u64,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            host: String::from(DEFAULT_HOST),
            port: DEFAULT_PORT,
            token: None,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: DEFAULT_SCAN_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            name: String::from(DEFAULT_NAME),
            daemon: DaemonConfig::default(),
            polling: PollingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

impl BridgeConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = std::env::var("POWERD_HOST").unwrap_or(defaults.daemon.host);
        let port = env_parse::<u16>("POWERD_PORT").unwrap_or(defaults.daemon.port);
        let token = std::env::var("POWERD_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());

        let scan_interval_secs = env_parse::<u64>("POWERD_SCAN_INTERVAL")
            .unwrap_or(defaults.polling.scan_interval_secs);
        let request_timeout_secs = env_parse::<u64>("POWERD_REQUEST_TIMEOUT")
            .unwrap_or(defaults.polling.request_timeout_secs);

        let level = std::env::var("POWERD_LOG_LEVEL").unwrap_or(defaults.logging.level);
        let format = std::env::var("POWERD_LOG_FORMAT").unwrap_or(defaults.logging.format);
        let name = std::env::var("POWERD_NAME").unwrap_or(defaults.name);

        Self {
            name,
            daemon: DaemonConfig { host, port, token },
            polling: PollingConfig {
                scan_interval_secs,
                request_timeout_secs,
            },
            logging: LoggingConfig { level, format },
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.daemon.host.trim().is_empty() {
            return Err(Error::config("daemon.host must not be empty"));
        }

        if self.daemon.port == 0 {
            return Err(Error::config("daemon.port must be greater than 0"));
        }

        let interval = self.polling.scan_interval_secs;
        if !(POLLING_INTERVAL_MIN_SECS..=POLLING_INTERVAL_MAX_SECS).contains(&interval) {
            return Err(Error::config(format!(
                "polling.scan_interval_secs must be between {POLLING_INTERVAL_MIN_SECS} and {POLLING_INTERVAL_MAX_SECS}"
            )));
        }

        if self.polling.request_timeout_secs == 0 {
            return Err(Error::config(
                "polling.request_timeout_secs must be greater than 0",
            ));
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(Error::config(format!(
                "logging.format must be 'text' or 'json', got '{}'",
                self.logging.format
            )));
        }

        Ok(())
    }

    /// `http://{host}:{port}`
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.daemon.host, self.daemon.port)
    }

    /// Endpoint value handed to the status client
    pub fn endpoint(&self) -> DaemonEndpoint {
        DaemonEndpoint::new(self.base_url(), self.daemon.token.clone())
    }

    /// Device identifier, `host:port`
    pub fn device_identifier(&self) -> String {
        format!("{}:{}", self.daemon.host, self.daemon.port)
    }

    #[must_use]
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.polling.scan_interval_secs)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.polling.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = BridgeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.base_url(), "http://localhost:7890");
        assert_eq!(config.scan_interval(), Duration::from_secs(30));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_invalid_port() {
        let mut config = BridgeConfig::default();
        config.daemon.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_interval_bounds() {
        let mut config = BridgeConfig::default();
        config.polling.scan_interval_secs = 0;
        assert!(config.validate().is_err());

        config.polling.scan_interval_secs = 601;
        assert!(config.validate().is_err());

        config.polling.scan_interval_secs = 600;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_log_format() {
        let mut config = BridgeConfig::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_endpoint_carries_token() {
        let mut config = BridgeConfig::default();
        config.daemon.host = "framework.lan".to_string();
        config.daemon.token = Some("secret".to_string());

        let endpoint = config.endpoint();
        assert_eq!(endpoint.base_url(), "http://framework.lan:7890");
        assert_eq!(endpoint.auth_token(), Some("secret"));
        assert_eq!(config.device_identifier(), "framework.lan:7890");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: BridgeConfig = toml::from_str(
            r#"
            [daemon]
            host = "10.0.0.5"
            "#,
        )
        .unwrap();

        assert_eq!(config.daemon.host, "10.0.0.5");
        assert_eq!(config.daemon.port, DEFAULT_PORT);
        assert_eq!(config.polling.scan_interval_secs, 30);
        assert_eq!(config.name, DEFAULT_NAME);
    }
}
