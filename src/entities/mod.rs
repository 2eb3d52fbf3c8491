//! Read-only projection of a status snapshot into named points
//!
//! The host's entity layer only needs `(name, value)` pairs re-read after
//! every refresh cycle. Instead of one type per entity, the points are a
//! flat registry of extractor functions over [`StatusSnapshot`], plus one
//! generic sensor per top-level key the daemon reports.

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::client::StatusSnapshot;
use crate::config::BridgeConfig;
use crate::coordinator::UpdateCoordinator;
use crate::error::{Error, Result};

/// Modes offered by the power mode selector
pub const POWER_MODE_OPTIONS: [&str; 3] = ["power-saver", "balanced", "performance"];

pub const POLLING_INTERVAL_MIN_SECS: u64 = 1;
pub const POLLING_INTERVAL_MAX_SECS: u64 = 600;
pub const POLLING_INTERVAL_STEP_SECS: u64 = 1;

// ============================================================================
// Points
// ============================================================================

/// Which host platform a point maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PointKind {
    Sensor,
    BinarySensor,
    Select,
    Number,
}

/// One named value derived from the current snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub unique_id: String,
    pub key: String,
    pub name: String,
    pub kind: PointKind,
    pub value: Value,
}

/// A boolean point computed from the snapshot
pub struct BinaryPoint {
    pub key: &'static str,
    pub name: &'static str,
    pub device_class: Option<&'static str>,
    pub extract: fn(&StatusSnapshot) -> Option<bool>,
}

fn is_idle(snapshot: &StatusSnapshot) -> Option<bool> {
    snapshot.get_bool("is_idle")
}

fn is_remote_play(snapshot: &StatusSnapshot) -> Option<bool> {
    snapshot.get_bool("is_remote_play")
}

fn is_game_running(snapshot: &StatusSnapshot) -> Option<bool> {
    Some(snapshot.get_i64("game_pid").unwrap_or(0) > 0)
}

fn is_game_paused(snapshot: &StatusSnapshot) -> Option<bool> {
    snapshot.get_bool("is_game_paused")
}

pub const BINARY_POINTS: &[BinaryPoint] = &[
    BinaryPoint {
        key: "is_idle",
        name: "System Idle",
        device_class: Some("running"),
        extract: is_idle,
    },
    BinaryPoint {
        key: "is_remote_play",
        name: "Remote Play Active",
        device_class: Some("connectivity"),
        extract: is_remote_play,
    },
    BinaryPoint {
        key: "is_game_running",
        name: "Game Running",
        device_class: None,
        extract: is_game_running,
    },
    BinaryPoint {
        key: "is_game_paused",
        name: "Game Paused",
        device_class: None,
        extract: is_game_paused,
    },
];

/// `uptime_seconds` -> `Uptime Seconds`
///
/// Underscores become spaces and every run of letters is title-cased, so a
/// letter following a digit starts a new word (`24h` -> `24H`).
pub fn sensor_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len());
    let mut in_word = false;

    for c in key.chars() {
        let c = if c == '_' { ' ' } else { c };
        if c.is_alphabetic() {
            if in_word {
                name.extend(c.to_lowercase());
            } else {
                name.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            name.push(c);
            in_word = false;
        }
    }

    name
}

// ============================================================================
// Device
// ============================================================================

/// Device the points are grouped under
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// `host:port` of the daemon
    pub identifier: String,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
}

impl DeviceInfo {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            identifier: config.device_identifier(),
            name: config.name.clone(),
            manufacturer: String::from("Framework"),
            model: String::from("Power Daemon"),
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Projects snapshots into points for one configured daemon
#[derive(Debug, Clone)]
pub struct EntityRegistry {
    entry_id: String,
    device: DeviceInfo,
}

impl EntityRegistry {
    pub fn new(entry_id: impl Into<String>, device: DeviceInfo) -> Self {
        Self {
            entry_id: entry_id.into(),
            device,
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        let device = DeviceInfo::from_config(config);
        Self::new(device.identifier.clone(), device)
    }

    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    fn unique_id(&self, key: &str) -> String {
        format!("{}_{key}", self.entry_id)
    }

    /// Every point derivable from `snapshot`
    ///
    /// Binary points first, then the mode selector, then one sensor per
    /// top-level key.
    pub fn project(&self, snapshot: &StatusSnapshot) -> Vec<Point> {
        let mut points = Vec::with_capacity(BINARY_POINTS.len() + 1 + snapshot.len());

        for binary in BINARY_POINTS {
            points.push(Point {
                unique_id: self.unique_id(binary.key),
                key: binary.key.to_string(),
                name: binary.name.to_string(),
                kind: PointKind::BinarySensor,
                value: (binary.extract)(snapshot).map_or(Value::Null, Value::Bool),
            });
        }

        points.push(Point {
            unique_id: self.unique_id("power_mode"),
            key: String::from("power_mode"),
            name: String::from("Power Mode"),
            kind: PointKind::Select,
            value: current_mode(snapshot).map_or(Value::Null, |m| Value::String(m.to_string())),
        });

        for (key, value) in snapshot.iter() {
            points.push(Point {
                unique_id: self.unique_id(key),
                key: key.to_string(),
                name: sensor_name(key),
                kind: PointKind::Sensor,
                value: value.clone(),
            });
        }

        points
    }

    /// The polling interval as a number point
    pub fn polling_interval_point(&self, interval: Duration) -> Point {
        Point {
            unique_id: self.unique_id("polling_interval"),
            key: String::from("polling_interval"),
            name: String::from("Polling Interval"),
            kind: PointKind::Number,
            value: Value::from(interval.as_secs()),
        }
    }
}

// ============================================================================
// Writes
// ============================================================================

/// Current option of the mode selector
pub fn current_mode(snapshot: &StatusSnapshot) -> Option<&str> {
    snapshot.mode()
}

/// Select one of [`POWER_MODE_OPTIONS`] through the coordinator
pub async fn select_power_mode(coordinator: &UpdateCoordinator, option: &str) -> Result<()> {
    if !POWER_MODE_OPTIONS.contains(&option) {
        return Err(Error::config(format!(
            "unsupported power mode '{option}', expected one of {}",
            POWER_MODE_OPTIONS.join(", ")
        )));
    }
    coordinator.set_mode(option).await
}

/// Validate a polling interval in seconds
pub fn polling_interval(secs: u64) -> Result<Duration> {
    if !(POLLING_INTERVAL_MIN_SECS..=POLLING_INTERVAL_MAX_SECS).contains(&secs)
        || secs % POLLING_INTERVAL_STEP_SECS != 0
    {
        return Err(Error::InvalidInterval(format!(
            "{secs}s is outside {POLLING_INTERVAL_MIN_SECS}..={POLLING_INTERVAL_MAX_SECS}s"
        )));
    }
    Ok(Duration::from_secs(secs))
}

/// Apply a new polling interval from the number point
pub fn set_polling_interval(coordinator: &UpdateCoordinator, secs: u64) -> Result<Duration> {
    let interval = polling_interval(secs)?;
    coordinator.set_refresh_interval(interval)?;
    Ok(interval)
}

// ============================================================================
// Tests
// ============================================================================
