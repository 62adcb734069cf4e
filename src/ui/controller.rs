// App Controller - Bridges UI actions with the mining client
//
// This module contains the AppController which coordinates between:
// - The screens (ScreenManager, UI thread only)
// - The mining client (futures submitted to the background loop)
// - The settings collaborator
// - The run log
//
// It handles:
// - UI actions -> background submissions (start/stop/login/logout)
// - Mining client events -> UI updates (ControllerEvents)
// - Shutdown (stop the loop, force-save settings)

use crate::config::SettingsStore;
use crate::context::AppContext;
use crate::crashlog::CrashLog;
use crate::logging;
use crate::metrics::Metrics;
use crate::models::{DropInfo, InventoryItem, LogEntry, LogRing, WorkflowOutcome};
use crate::services::{MinerEvents, Notifier};
use crate::ui::bridge::EventLoopBridgeHandle;
use crate::ui::screens::{Screen, ScreenManager};
use std::sync::Arc;
use tracing::Level;

/// Target used for miner log lines in the run log
pub const MINER_LOG_TARGET: &str = "dropminer::miner";

/// Mining workflow as requested by the controller.
///
/// Tracks requests, not the client's actual state. A run returns to
/// `Stopped` when it is stopped from the UI or when its outcome arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiningState {
    Stopped,
    Running { run: u64 },
}

/// Application controller, the root object of the UI loop.
///
/// Lives on the UI thread for the whole process. Every operation returns
/// without waiting for background work; results come back as callbacks
/// posted to the UI loop.
///
/// # Example
/// ```ignore
/// let mut ui_loop = UiLoop::<AppController>::new();
/// let bridge = EventLoopBridge::start(ui_loop.handle(), BridgeConfig::default(), metrics)?;
/// // ... build settings, ControllerEvents, client, AppContext ...
/// let mut controller = AppController::new(ctx, screens);
/// ui_loop.run(&mut controller); // blocks until quit
/// ```
pub struct AppController {
    ctx: AppContext,
    screens: ScreenManager,
    logs: LogRing,
    mining: MiningState,
    next_run: u64,
}

impl AppController {
    /// Create the controller and show the initial screen.
    ///
    /// Shows `home` when a token is stored, `login` otherwise. With auto start
    /// enabled and a token present, mining starts right away.
    pub fn new(ctx: AppContext, screens: ScreenManager) -> Self {
        let mut controller = Self {
            ctx,
            screens,
            logs: LogRing::new(),
            mining: MiningState::Stopped,
            next_run: 0,
        };

        let logged_in = !controller.ctx.settings.oauth_token().is_empty();
        if logged_in {
            controller.show_screen(Screen::Home);
            if controller.ctx.settings.auto_start() {
                tracing::info!("Auto start enabled - starting mining");
                controller.start_mining();
            }
        } else {
            controller.show_screen(Screen::Login);
        }

        tracing::info!("Controller initialized on screen {}", controller.current_screen());
        controller
    }

    pub fn current_screen(&self) -> Screen {
        self.screens.current()
    }

    pub fn mining_state(&self) -> MiningState {
        self.mining
    }

    /// In-memory log history (newest 500 lines)
    pub fn log_history(&self) -> &LogRing {
        &self.logs
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    pub fn screens_mut(&mut self) -> &mut ScreenManager {
        &mut self.screens
    }

    /// Navigate to `screen`; entering the logs screen replays the history
    pub fn show_screen(&mut self, screen: Screen) {
        self.screens.set_current(screen);
        if screen == Screen::Logs {
            self.screens.logs().on_enter(&self.logs);
        }
    }

    /// Request a mining run. No-op while a run is requested.
    pub fn start_mining(&mut self) {
        if let MiningState::Running { run } = self.mining {
            tracing::debug!("Mining run {} already requested - ignoring start", run);
            return;
        }
        if self.ctx.bridge.is_stopped() {
            tracing::warn!("Background loop stopped - cannot start mining");
            return;
        }

        self.next_run += 1;
        let run = self.next_run;
        self.mining = MiningState::Running { run };
        tracing::info!("Starting mining run {}", run);

        let client = Arc::clone(&self.ctx.client);
        let ui = self.ctx.bridge.clone();
        self.ctx.bridge.submit(async move {
            let outcome = match client.start().await {
                Ok(()) => WorkflowOutcome::Finished,
                Err(e) => WorkflowOutcome::Failed(e.to_string()),
            };
            ui.post_to_ui(move |controller: &mut AppController| {
                controller.on_workflow_outcome(run, outcome);
            });
        });
    }

    /// Request the current run to stop. No-op when nothing is running.
    pub fn stop_mining(&mut self) {
        let MiningState::Running { run } = self.mining else {
            tracing::debug!("Mining not running - ignoring stop");
            return;
        };

        self.mining = MiningState::Stopped;
        tracing::info!("Stopping mining run {}", run);

        let client = Arc::clone(&self.ctx.client);
        self.ctx.bridge.submit(async move {
            if let Err(e) = client.stop().await {
                tracing::error!("Failed to stop mining: {}", e);
            }
        });
    }

    /// Store `token`, log in in the background and show the home screen
    /// without waiting for the login to finish.
    pub fn login(&mut self, token: &str) {
        tracing::info!("Login requested");
        self.ctx.settings.set_oauth_token(token);
        self.persist_settings();

        let client = Arc::clone(&self.ctx.client);
        let ui = self.ctx.bridge.clone();
        self.ctx.bridge.submit(async move {
            if let Err(e) = client.login().await {
                let message = e.to_string();
                ui.post_to_ui(move |controller: &mut AppController| {
                    controller.on_login_failed(message);
                });
            }
        });

        self.show_screen(Screen::Home);
    }

    /// Stop mining, forget the token and return to the login screen
    pub fn logout(&mut self) {
        tracing::info!("Logout requested");
        self.stop_mining();
        self.ctx.settings.set_oauth_token("");
        self.persist_settings();
        self.show_screen(Screen::Login);
    }

    /// App is going away (backgrounded for good or closed).
    ///
    /// Stops the background loop, then saves settings synchronously since the
    /// worker thread cannot be relied on during teardown.
    pub fn shutdown(&mut self) {
        tracing::info!("Shutting down controller");
        self.ctx.bridge.stop();

        if let Err(e) = self.ctx.settings.save(true) {
            tracing::error!("Failed to save settings on shutdown: {:#}", e);
        }

        self.ctx.metrics.log_summary();
    }

    /// Save settings on the background loop so the UI never waits on disk
    fn persist_settings(&self) {
        let settings = Arc::clone(&self.ctx.settings);
        self.ctx.bridge.submit(async move {
            if let Err(e) = settings.save(false) {
                tracing::warn!("Failed to save settings: {:#}", e);
            }
        });
    }

    fn on_workflow_outcome(&mut self, run: u64, outcome: WorkflowOutcome) {
        if self.mining == (MiningState::Running { run }) {
            self.mining = MiningState::Stopped;
        } else {
            tracing::debug!("Ignoring outcome of stale mining run {}", run);
        }

        match outcome {
            WorkflowOutcome::Finished => tracing::info!("Mining run {} finished", run),
            WorkflowOutcome::Failed(message) => {
                tracing::error!("Mining run {} failed: {}", run, message);
                self.screens
                    .toaster()
                    .show(&format!("Mining failed: {}", message));
            }
        }
    }

    fn on_login_failed(&mut self, message: String) {
        tracing::error!("Login failed: {}", message);
        self.screens
            .toaster()
            .show(&format!("Login failed: {}", message));
    }

    fn apply_log(&mut self, entry: LogEntry) {
        if self.screens.current() == Screen::Logs {
            self.screens.logs().add_log(&entry.display_line());
        }
        self.logs.push(entry);
    }
}

/// [`MinerEvents`] implementation that fans client events out to the UI.
///
/// Runs on the background thread; every screen update is posted to the UI
/// loop. `on_log` also appends to the run log directly, whatever screen is
/// shown and however full the in-memory history is.
pub struct ControllerEvents {
    bridge: EventLoopBridgeHandle<AppController>,
    crash_log: CrashLog,
    notifier: Arc<dyn Notifier>,
    settings: Arc<dyn SettingsStore>,
    metrics: Arc<Metrics>,
}

impl ControllerEvents {
    pub fn new(
        bridge: EventLoopBridgeHandle<AppController>,
        crash_log: CrashLog,
        notifier: Arc<dyn Notifier>,
        settings: Arc<dyn SettingsStore>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            bridge,
            crash_log,
            notifier,
            settings,
            metrics,
        }
    }
}

impl MinerEvents for ControllerEvents {
    fn on_log(&self, message: String) {
        self.metrics.record_log_line();
        self.crash_log
            .append_line(&logging::format_line(MINER_LOG_TARGET, Level::INFO, &message));

        let entry = LogEntry::new(message);
        self.bridge
            .post_to_ui(move |controller: &mut AppController| controller.apply_log(entry));
    }

    fn on_status(&self, status: String) {
        self.bridge.post_to_ui(move |controller: &mut AppController| {
            controller.screens.home().update_status(&status);
        });
    }

    fn on_progress(&self, current: u64, total: u64) {
        self.bridge.post_to_ui(move |controller: &mut AppController| {
            controller.screens.home().update_progress(current, total);
        });
    }

    fn on_channel(&self, channel: String) {
        self.bridge.post_to_ui(move |controller: &mut AppController| {
            controller.screens.home().update_channel(&channel);
        });
    }

    fn on_drop(&self, drop: DropInfo) {
        self.bridge.post_to_ui(move |controller: &mut AppController| {
            controller.screens.home().update_drop(&drop);
        });
    }

    fn on_inventory(&self, inventory: Vec<InventoryItem>) {
        self.bridge.post_to_ui(move |controller: &mut AppController| {
            controller.screens.inventory().update_inventory(&inventory);
        });
    }

    fn on_notify(&self, title: String, message: String) {
        if self.settings.notifications_enabled() {
            if let Err(e) = self.notifier.notify(&title, &message) {
                self.metrics.record_notification_error();
                tracing::error!("Notification error: {:#}", e);
            }
        }

        let text = format!("{}: {}", title, message);
        self.bridge.post_to_ui(move |controller: &mut AppController| {
            controller.screens.toaster().show(&text);
        });
    }
}
