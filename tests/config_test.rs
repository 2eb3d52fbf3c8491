//! Tests for config loading from the environment and TOML files

use powerd_bridge::config::{BridgeConfig, DEFAULT_PORT};
use powerd_bridge::error::Error;
use serial_test::serial;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;

const ENV_KEYS: [&str; 8] = [
    "POWERD_HOST",
    "POWERD_PORT",
    "POWERD_TOKEN",
    "POWERD_SCAN_INTERVAL",
    "POWERD_REQUEST_TIMEOUT",
    "POWERD_LOG_LEVEL",
    "POWERD_LOG_FORMAT",
    "POWERD_NAME",
];

fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_from_env_defaults() {
    clear_env();

    let config = BridgeConfig::from_env();

    assert_eq!(config.daemon.host, "localhost");
    assert_eq!(config.daemon.port, DEFAULT_PORT);
    assert!(config.daemon.token.is_none());
    assert_eq!(config.scan_interval(), Duration::from_secs(30));
    assert_eq!(config.request_timeout(), Duration::from_secs(10));
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_from_env_overrides() {
    clear_env();
    std::env::set_var("POWERD_HOST", "framework.lan");
    std::env::set_var("POWERD_PORT", "9000");
    std::env::set_var("POWERD_TOKEN", "secret");
    std::env::set_var("POWERD_SCAN_INTERVAL", "15");
    std::env::set_var("POWERD_REQUEST_TIMEOUT", "3");
    std::env::set_var("POWERD_LOG_FORMAT", "json");
    std::env::set_var("POWERD_NAME", "Desk Laptop");

    let config = BridgeConfig::from_env();
    clear_env();

    assert_eq!(config.base_url(), "http://framework.lan:9000");
    assert_eq!(config.daemon.token.as_deref(), Some("secret"));
    assert_eq!(config.scan_interval(), Duration::from_secs(15));
    assert_eq!(config.request_timeout(), Duration::from_secs(3));
    assert_eq!(config.logging.format, "json");
    assert_eq!(config.name, "Desk Laptop");
    assert_eq!(config.device_identifier(), "framework.lan:9000");
}

#[test]
#[serial]
fn test_from_env_ignores_bad_values() {
    clear_env();
    std::env::set_var("POWERD_PORT", "not-a-port");
    std::env::set_var("POWERD_TOKEN", "   ");

    let config = BridgeConfig::from_env();
    clear_env();

    assert_eq!(config.daemon.port, DEFAULT_PORT);
    assert!(config.daemon.token.is_none());
}

#[test]
fn test_from_file() {
    let file = write_config(
        r#"
        name = "Lab Framework"

        [daemon]
        host = "10.0.0.5"
        port = 7891
        token = "abc"

        [polling]
        scan_interval_secs = 5
        "#,
    );

    let config = BridgeConfig::from_file(file.path()).unwrap();

    assert_eq!(config.name, "Lab Framework");
    assert_eq!(config.base_url(), "http://10.0.0.5:7891");
    assert_eq!(config.daemon.token.as_deref(), Some("abc"));
    assert_eq!(config.scan_interval(), Duration::from_secs(5));
    // Unset keys keep their defaults
    assert_eq!(config.request_timeout(), Duration::from_secs(10));
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_from_file_invalid_values_fail_validation() {
    let file = write_config("[polling]\nscan_interval_secs = 0\n");

    let config = BridgeConfig::from_file(file.path()).unwrap();
    let err = config.validate().unwrap_err();

    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_from_file_malformed_toml() {
    let file = write_config("[daemon\nhost = ");

    let err = BridgeConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, Error::Toml(_)));
}

#[test]
fn test_from_file_missing() {
    let dir = tempfile::tempdir().unwrap();
    let err = BridgeConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();

    assert!(matches!(
        &err,
        Error::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound
    ));
    assert!(err.to_string().contains("absent.toml"));
    assert!(err.is_recoverable());
}

#[test]
fn test_example_config_is_valid() {
    let config = BridgeConfig::from_file(Path::new("config.example.toml")).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.daemon.port, DEFAULT_PORT);
}
