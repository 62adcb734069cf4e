//! Services module - the mining client seam and its collaborators.
//!
//! The real drops client (login, channel watching, drop claiming) lives outside
//! this crate. This module defines the boundary the application shell talks to:
//!
//! - [`MinerClient`]: async operations submitted to the background loop
//!   (`login`, `start`, `stop`) plus a running indicator
//! - [`MinerEvents`]: one typed callback per domain event, invoked by the
//!   client from the background thread and implemented by
//!   [`ControllerEvents`](crate::ui::ControllerEvents)
//! - [`Notifier`]: platform notifications; failures are reported, never fatal
//! - [`SimulatedMiner`]: a self-contained client that walks a fake campaign so
//!   the binary runs end to end without network access
//!
//! Nothing here knows about screens or threads. Clients only rely on being
//! polled by a single cooperative scheduler and on the stop signal they are
//! given.

pub mod notify;
pub mod simulated;

pub use notify::{Notifier, TerminalNotifier};
pub use simulated::SimulatedMiner;

use crate::models::{DropInfo, InventoryItem};
use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by a mining client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MinerError {
    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Login rejected: {0}")]
    LoginRejected(String),

    #[error("Nothing to mine: {0}")]
    NothingToMine(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// The mining client driven by the controller.
///
/// All async methods run on the background loop. `start` resolves when the
/// mining run ends (stopped, finished or failed).
#[async_trait]
pub trait MinerClient: Send + Sync {
    async fn login(&self) -> Result<(), MinerError>;
    async fn start(&self) -> Result<(), MinerError>;
    async fn stop(&self) -> Result<(), MinerError>;
    fn is_running(&self) -> bool;
}

/// Domain events raised by a [`MinerClient`] on the background thread.
pub trait MinerEvents: Send + Sync {
    fn on_log(&self, message: String);
    fn on_status(&self, status: String);
    fn on_progress(&self, current: u64, total: u64);
    fn on_channel(&self, channel: String);
    fn on_drop(&self, drop: DropInfo);
    fn on_inventory(&self, inventory: Vec<InventoryItem>);
    fn on_notify(&self, title: String, message: String);
}
