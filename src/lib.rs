//! powerd-bridge - Framework Power Daemon bridge
//!
//! Polls the power daemon's local HTTP API, keeps the latest status
//! snapshot available to any number of readers, and proxies power mode
//! writes back to the daemon.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration loading and validation
//! - [`client`] - Single-shot HTTP calls against the daemon
//! - [`coordinator`] - Periodic single-flight refresh of the status snapshot
//! - [`entities`] - Projection of snapshots into named points
//! - [`error`] - Error classification and the crate-wide error type
//!
//! # Example
//!
//! ```no_run
//! use powerd_bridge::config::BridgeConfig;
//! use powerd_bridge::coordinator::UpdateCoordinator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = BridgeConfig::from_env();
//!     config.validate()?;
//!
//!     let coordinator = UpdateCoordinator::from_config(&config)?;
//!     coordinator.start().await?;
//!     println!("{:?}", coordinator.current_snapshot());
//!     coordinator.stop().await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod coordinator;
pub mod entities;
pub mod error;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::client::{DaemonEndpoint, StatusClient, StatusSnapshot, StatusSource};
    pub use crate::config::BridgeConfig;
    pub use crate::coordinator::{CoordinatorState, RefreshEvent, UpdateCoordinator};
    pub use crate::entities::{EntityRegistry, Point};
    pub use crate::error::{Error, ErrorKind, Result};
}

pub use client::{DaemonEndpoint, StatusClient, StatusSnapshot};
pub use coordinator::UpdateCoordinator;
