// dropminer - application shell of a Twitch drops miner
//
// This is the library crate containing the bridge, the crash log bootstrap and
// the controller. The binary crate (main.rs) provides the console entry point.

pub mod config;
pub mod context;
pub mod crashlog;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::{ConfigManager, FileSettings, SettingsStore};
pub use context::AppContext;
pub use crashlog::CrashLog;
pub use metrics::Metrics;
pub use models::{LogRing, UserSettings};
pub use ui::{AppController, EventLoopBridge, UiLoop};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
