//! Data models for the dropminer application.
//!
//! - [`LogRing`] / [`LogEntry`]: bounded in-memory log history shown on the logs screen
//! - [`UserSettings`]: login token and mining preferences loaded from `settings.yaml`
//! - [`DropInfo`], [`InventoryItem`]: values delivered by the miner client callbacks
//! - [`WorkflowOutcome`]: how a mining run ended, used to keep the controller's
//!   start/stop guard honest
//!
//! Models carry no threading of their own. [`LogRing`] is owned by the UI thread
//! (inside [`AppController`](crate::ui::AppController)); [`UserSettings`] lives
//! behind the [`SettingsStore`](crate::config::SettingsStore) lock.

pub mod log_ring;
pub mod miner;
pub mod settings;

pub use log_ring::{LOG_RING_CAPACITY, LogEntry, LogRing};
pub use miner::{DropInfo, InventoryItem, WorkflowOutcome};
pub use settings::UserSettings;
