//! Decoded daemon status document

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::ClientError;

/// The most recent successfully decoded `/status` response
///
/// The daemon decides the shape; the bridge only guarantees that the
/// top level is a JSON object. Snapshots are immutable once produced and
/// are shared behind an `Arc` by the coordinator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusSnapshot(Map<String, Value>);

impl StatusSnapshot {
    /// Wrap an already-decoded JSON object
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Decode a response body, rejecting anything that is not a JSON object
    pub fn from_slice(body: &[u8]) -> Result<Self, ClientError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| ClientError::Protocol(e.to_string()))?;
        Self::try_from(value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Integer field; floats with no fractional part are accepted too
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        let value = self.get(key)?;
        value.as_i64().or_else(|| {
            value
                .as_f64()
                .filter(|f| f.fract() == 0.0)
                .map(|f| f as i64)
        })
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    /// Current power mode reported by the daemon
    pub fn mode(&self) -> Option<&str> {
        self.get_str("mode")
    }

    /// Top-level keys
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl TryFrom<Value> for StatusSnapshot {
    type Error = ClientError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(ClientError::Protocol(format!(
                "expected a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> StatusSnapshot {
        StatusSnapshot::try_from(json!({
            "mode": "balanced",
            "is_idle": false,
            "game_pid": 4242,
            "uptime_seconds": 120.0,
            "power": { "battery_percent": 87 }
        }))
        .unwrap()
    }

    #[test]
    fn test_typed_accessors() {
        let snapshot = sample();

        assert_eq!(snapshot.mode(), Some("balanced"));
        assert_eq!(snapshot.get_bool("is_idle"), Some(false));
        assert_eq!(snapshot.get_i64("game_pid"), Some(4242));
        assert_eq!(snapshot.get_i64("uptime_seconds"), Some(120));
        assert_eq!(snapshot.get_f64("uptime_seconds"), Some(120.0));
        assert_eq!(snapshot.get_str("missing"), None);
        assert!(snapshot.get("power").unwrap().is_object());
    }

    #[test]
    fn test_keys() {
        let snapshot = sample();
        let keys: Vec<&str> = snapshot.keys().collect();
        assert_eq!(keys.len(), 5);
        assert!(keys.contains(&"uptime_seconds"));
    }

    #[test]
    fn test_rejects_non_object() {
        let err = StatusSnapshot::try_from(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)));
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_from_slice_malformed() {
        let err = StatusSnapshot::from_slice(b"{\"mode\": ").unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)));
    }

    #[test]
    fn test_serializes_transparently() {
        let snapshot = StatusSnapshot::from_slice(br#"{"mode":"performance"}"#).unwrap();
        assert_eq!(
            serde_json::to_string(&snapshot).unwrap(),
            r#"{"mode":"performance"}"#
        );
    }
}
