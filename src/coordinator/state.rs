//! Coordinator state and refresh events

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::client::StatusSnapshot;
use crate::error::ErrorKind;

/// What caused a refresh cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshTrigger {
    /// The eager first refresh performed by `start()`
    Startup,
    /// A timer tick
    Scheduled,
    /// `request_refresh()`, including the one issued after a mode write
    Requested,
}

impl RefreshTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Scheduled => "scheduled",
            Self::Requested => "requested",
        }
    }
}

/// Shared coordinator state
///
/// Written only by the refresh routine; readers get a consistent copy
/// through the watch channel.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CoordinatorState {
    /// Last successfully decoded snapshot, kept across failures
    pub last_snapshot: Option<Arc<StatusSnapshot>>,

    /// Classified failure of the most recent cycle, cleared on success
    pub last_error: Option<ErrorKind>,

    /// Display form of the most recent failure
    pub last_error_message: Option<String>,

    /// True exactly while a fetch is in flight
    pub is_refreshing: bool,

    /// When the last successful refresh completed
    pub last_success_at: Option<DateTime<Utc>>,

    /// When the last refresh attempt started
    pub last_attempt_at: Option<DateTime<Utc>>,

    /// Completed refresh cycles, successful or not
    pub refresh_count: u64,
}

impl CoordinatorState {
    /// Whether the most recent cycle succeeded
    pub fn last_update_success(&self) -> bool {
        self.last_snapshot.is_some() && self.last_error.is_none()
    }
}

/// Published once per completed refresh cycle
#[derive(Debug, Clone, Serialize)]
pub struct RefreshEvent {
    pub trigger: RefreshTrigger,

    /// `None` on success
    pub error: Option<ErrorKind>,

    pub completed_at: DateTime<Utc>,

    pub elapsed_ms: u64,
}

impl RefreshEvent {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_empty() {
        let state = CoordinatorState::default();
        assert!(state.last_snapshot.is_none());
        assert!(state.last_error.is_none());
        assert!(!state.is_refreshing);
        assert!(!state.last_update_success());
    }

    #[test]
    fn test_last_update_success() {
        let mut state = CoordinatorState {
            last_snapshot: Some(Arc::new(StatusSnapshot::default())),
            ..Default::default()
        };
        assert!(state.last_update_success());

        state.last_error = Some(ErrorKind::Connection);
        assert!(!state.last_update_success());
    }

    #[test]
    fn test_event_serialization() {
        let event = RefreshEvent {
            trigger: RefreshTrigger::Scheduled,
            error: Some(ErrorKind::Authentication),
            completed_at: Utc::now(),
            elapsed_ms: 12,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"trigger\":\"scheduled\""));
        assert!(json.contains("\"error\":\"authentication\""));
        assert!(!event.is_success());
    }
}
