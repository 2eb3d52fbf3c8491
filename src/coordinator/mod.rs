//! Update coordinator for the power daemon
//!
//! Keeps one authoritative [`StatusSnapshot`] fresh by polling the daemon
//! on a fixed cadence, and shares it with any number of readers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │            UpdateCoordinator             │
//! │                                          │
//! │  start() ── first refresh (must succeed) │
//! │     │                                    │
//! │     ▼                                    │
//! │  ┌────────────────────────────────────┐  │
//! │  │          refresh task              │  │
//! │  │  select! { stop | request | tick } │  │
//! │  │        └─> refresh() ──┐           │  │
//! │  └────────────────────────┼───────────┘  │
//! │                           ▼              │
//! │  watch<CoordinatorState>  broadcast<Ev>  │
//! │        │                      │          │
//! │  current_snapshot()    listeners/subscribe│
//! └──────────────────────────────────────────┘
//! ```
//!
//! Only the refresh task (and `start()`, before the task exists) ever runs
//! a fetch, so refreshes are single-flight. Refresh requests arriving while
//! a fetch is in flight collapse into one pending permit, which yields at
//! most one follow-up refresh.
//!
//! # Usage
//!
//! ```ignore
//! use powerd_bridge::coordinator::UpdateCoordinator;
//!
//! let coordinator = UpdateCoordinator::from_config(&config)?;
//! coordinator.start().await?;
//! if let Some(snapshot) = coordinator.current_snapshot() {
//!     println!("mode: {:?}", snapshot.mode());
//! }
//! coordinator.set_mode("performance").await?;
//! coordinator.stop().await;
//! ```

pub mod state;

use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::client::{ClientError, StatusClient, StatusSnapshot, StatusSource};
use crate::config::BridgeConfig;
use crate::error::{Error, ErrorKind, Result};

pub use state::{CoordinatorState, RefreshEvent, RefreshTrigger};

/// Default polling cadence
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Deadline used when `now + interval` does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

// ============================================================================
// Listeners
// ============================================================================

/// Handle returned by [`UpdateCoordinator::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&RefreshEvent) + Send + Sync>;

// ============================================================================
// Shared State
// ============================================================================

struct Shared {
    source: Arc<dyn StatusSource>,
    state: watch::Sender<CoordinatorState>,
    interval: watch::Sender<Duration>,
    refresh_requested: Notify,
    running: AtomicBool,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener_id: AtomicU64,
    events: broadcast::Sender<RefreshEvent>,
}

impl Shared {
    fn current_interval(&self) -> Duration {
        *self.interval.borrow()
    }

    /// One refresh cycle; the only writer of `CoordinatorState`
    async fn refresh(&self, trigger: RefreshTrigger) -> std::result::Result<(), ClientError> {
        self.state.send_modify(|s| {
            s.is_refreshing = true;
            s.last_attempt_at = Some(Utc::now());
        });

        let start = Instant::now();
        let result = self.source.fetch_status().await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let error = match &result {
            Ok(_) => None,
            Err(e) => Some(e.kind()),
        };

        let was_failing = self.state.borrow().last_error.is_some();

        let outcome = match result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.state.send_modify(|s| {
                    s.last_snapshot = Some(snapshot);
                    s.last_error = None;
                    s.last_error_message = None;
                    s.last_success_at = Some(Utc::now());
                    s.is_refreshing = false;
                    s.refresh_count += 1;
                });

                if was_failing {
                    tracing::info!(trigger = trigger.as_str(), "Daemon connection recovered");
                } else {
                    tracing::debug!(
                        trigger = trigger.as_str(),
                        elapsed_ms,
                        "Refreshed daemon status"
                    );
                }
                Ok(())
            }
            Err(err) => {
                let message = err.to_string();
                tracing::warn!(
                    trigger = trigger.as_str(),
                    kind = %err.kind(),
                    error = %message,
                    "Failed to refresh daemon status"
                );
                self.state.send_modify(|s| {
                    s.last_error = Some(err.kind());
                    s.last_error_message = Some(message);
                    s.is_refreshing = false;
                    s.refresh_count += 1;
                });
                Err(err)
            }
        };

        self.publish(RefreshEvent {
            trigger,
            error,
            completed_at: Utc::now(),
            elapsed_ms,
        });

        outcome
    }

    fn publish(&self, event: RefreshEvent) {
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(&event);
        }

        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

struct RefreshTask {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

fn next_deadline(interval: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(interval).unwrap_or_else(|| now + FAR_FUTURE)
}

async fn run_refresh_loop(shared: Arc<Shared>, mut stop_rx: watch::Receiver<bool>) {
    let mut next_tick = next_deadline(shared.current_interval());

    loop {
        let trigger = tokio::select! {
            biased;
            _ = stop_rx.changed() => break,
            _ = shared.refresh_requested.notified() => RefreshTrigger::Requested,
            _ = tokio::time::sleep_until(next_tick) => RefreshTrigger::Scheduled,
        };

        // Failures are recorded in the state; the next tick is the retry
        let _ = shared.refresh(trigger).await;
        next_tick = next_deadline(shared.current_interval());
    }

    tracing::debug!("Refresh loop exited");
}

// ============================================================================
// Update Coordinator
// ============================================================================

/// Periodic, single-flight refresher of the daemon status
pub struct UpdateCoordinator {
    shared: Arc<Shared>,
    task: tokio::sync::Mutex<Option<RefreshTask>>,
}

impl UpdateCoordinator {
    /// Create a stopped coordinator polling `source` every `interval`
    ///
    /// A zero interval falls back to [`DEFAULT_REFRESH_INTERVAL`].
    pub fn new(source: Arc<dyn StatusSource>, interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            DEFAULT_REFRESH_INTERVAL
        } else {
            interval
        };

        let (state, _) = watch::channel(CoordinatorState::default());
        let (interval, _) = watch::channel(interval);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            shared: Arc::new(Shared {
                source,
                state,
                interval,
                refresh_requested: Notify::new(),
                running: AtomicBool::new(false),
                listeners: Mutex::new(Vec::new()),
                next_listener_id: AtomicU64::new(1),
                events,
            }),
            task: tokio::sync::Mutex::new(None),
        }
    }

    /// Build the HTTP client and endpoint from configuration
    pub fn from_config(config: &BridgeConfig) -> Result<Self> {
        let client = StatusClient::new(config.request_timeout())?;
        let source = client.bind(config.endpoint());
        Ok(Self::new(Arc::new(source), config.scan_interval()))
    }

    /// Perform the first refresh and begin the periodic schedule
    ///
    /// # Errors
    ///
    /// Returns the first refresh's error, leaving the coordinator stopped,
    /// or `Error::AlreadyRunning` if it was already started.
    pub async fn start(&self) -> Result<()> {
        let mut task = self.task.lock().await;
        if task.is_some() {
            return Err(Error::AlreadyRunning);
        }

        self.shared.refresh(RefreshTrigger::Startup).await?;

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run_refresh_loop(Arc::clone(&self.shared), stop_rx));
        *task = Some(RefreshTask { stop_tx, handle });
        self.shared.running.store(true, Ordering::SeqCst);

        tracing::info!(
            interval_secs = self.refresh_interval().as_secs_f64(),
            "Update coordinator started"
        );
        Ok(())
    }

    /// Cancel the schedule and wait for the refresh task to exit
    ///
    /// An in-flight fetch runs to completion or timeout; no refresh starts
    /// after this returns.
    pub async fn stop(&self) {
        let Some(task) = self.task.lock().await.take() else {
            return;
        };

        self.shared.running.store(false, Ordering::SeqCst);
        let _ = task.stop_tx.send(true);

        if let Err(e) = task.handle.await {
            tracing::warn!(error = %e, "Refresh task ended abnormally");
        }
        tracing::info!("Update coordinator stopped");
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------
    // Readers
    // ------------------------------------------------------------------

    /// Latest cached snapshot; never blocks on the network
    pub fn current_snapshot(&self) -> Option<Arc<StatusSnapshot>> {
        self.shared.state.borrow().last_snapshot.clone()
    }

    pub fn last_error(&self) -> Option<ErrorKind> {
        self.shared.state.borrow().last_error
    }

    pub fn is_refreshing(&self) -> bool {
        self.shared.state.borrow().is_refreshing
    }

    /// Copy of the full state
    pub fn state(&self) -> CoordinatorState {
        self.shared.state.borrow().clone()
    }

    /// Receiver that observes every state change, including in-flight flags
    pub fn watch_state(&self) -> watch::Receiver<CoordinatorState> {
        self.shared.state.subscribe()
    }

    pub fn refresh_interval(&self) -> Duration {
        self.shared.current_interval()
    }

    // ------------------------------------------------------------------
    // Mutators
    // ------------------------------------------------------------------

    /// Ask for a refresh as soon as possible
    ///
    /// Requests made while a refresh is in flight coalesce into a single
    /// follow-up refresh. Ignored while the coordinator is stopped.
    pub fn request_refresh(&self) {
        if !self.is_running() {
            tracing::debug!("Refresh requested while stopped; ignoring");
            return;
        }
        self.shared.refresh_requested.notify_one();
    }

    /// Switch the daemon's power mode, then refresh on success
    ///
    /// # Errors
    ///
    /// The daemon error is returned as-is and no refresh is requested.
    pub async fn set_mode(&self, mode: &str) -> Result<()> {
        match self.shared.source.set_mode(mode).await {
            Ok(()) => {
                self.request_refresh();
                Ok(())
            }
            Err(err) => {
                tracing::error!(mode = %mode, error = %err, "Failed to set mode");
                Err(err.into())
            }
        }
    }

    /// Change the cadence used from the next scheduled tick onward
    pub fn set_refresh_interval(&self, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            return Err(Error::InvalidInterval(
                "interval must be greater than zero".to_string(),
            ));
        }

        self.shared.interval.send_replace(interval);
        tracing::info!(interval_secs = interval.as_secs_f64(), "Refresh interval updated");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    /// Register a callback invoked once per completed refresh cycle
    ///
    /// Callbacks run on the refresh task and must not block.
    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&RefreshEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.shared.next_listener_id.fetch_add(1, Ordering::Relaxed));
        let listener: Listener = Arc::new(listener);
        self.shared
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    /// Unregister a callback; returns false if it was not registered
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .shared
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Async alternative to listeners
    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.shared.events.subscribe()
    }
}

impl std::fmt::Debug for UpdateCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateCoordinator")
            .field("running", &self.is_running())
            .field("interval", &self.refresh_interval())
            .field("state", &*self.shared.state.borrow())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
