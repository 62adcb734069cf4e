//! dropminer - console entry point of the drops miner shell
//!
//! # Overview
//!
//! Boots the application in a fixed order:
//! 1. Crash log: resolve the log directory, install the panic hook, write the
//!    start marker. Nothing before this point may fail silently.
//! 2. Settings: load `settings.yaml` through [`ConfigManager`]
//! 3. Logging: tracing subscriber writing through the crash log
//! 4. Background loop ([`EventLoopBridge`]) on its own worker thread
//! 5. Miner client, [`AppContext`] and [`AppController`]
//! 6. UI loop on the main thread (blocks until `quit`, end of input, SIGINT
//!    or SIGTERM)
//! 7. Join the background loop, bounded by the shutdown timeout
//!
//! # Threads
//!
//! - **Main thread**: the UI loop, owner of the controller and the screens
//! - **dropminer-worker**: one current-thread tokio runtime for all domain work
//! - **dropminer-input**: reads stdin and posts commands to the UI loop
//!
//! # Environment
//!
//! - `DROPMINER_LOG_DIR`: preferred run log directory
//! - `DROPMINER_CONFIG_DIR`: settings directory
//! - `DROPMINER_LOG`: tracing filter override

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use dropminer::config::{ConfigManager, FileSettings, SettingsStore};
use dropminer::crashlog::{self, CrashLog, TeeWriter, LOG_DIR_ENV_VAR};
use dropminer::logging::{self, LoggingOptions};
use dropminer::services::{MinerClient, MinerEvents, Notifier, SimulatedMiner, TerminalNotifier};
use dropminer::ui::{console, AppController, BridgeConfig, ControllerEvents, EventLoopBridge, UiLoop};
use dropminer::{AppContext, Metrics, APP_NAME, VERSION};
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

fn main() -> ExitCode {
    let metrics = Arc::new(Metrics::new());

    let preferred = std::env::var(LOG_DIR_ENV_VAR)
        .ok()
        .filter(|dir| !dir.is_empty())
        .map(Utf8PathBuf::from);
    let candidates = crashlog::default_log_candidates(APP_NAME, preferred.as_deref());
    let log_dir = crashlog::resolve_log_directory(&candidates);
    let crash_log = CrashLog::in_directory(&log_dir).with_metrics(Arc::clone(&metrics));

    crashlog::install_panic_hook(crash_log.clone());
    crash_log.write_start_marker();

    match run(crash_log.clone(), log_dir, metrics) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            crash_log.record_fatal_error(&e);
            let mut stderr = TeeWriter::new(crash_log, io::stderr());
            let _ = writeln!(stderr, "Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(crash_log: CrashLog, log_dir: Utf8PathBuf, metrics: Arc<Metrics>) -> Result<()> {
    let config_dir = ConfigManager::default_dir(APP_NAME)?;
    let settings = Arc::new(FileSettings::load(ConfigManager::new(&config_dir)?)?);
    let snapshot = settings.snapshot();

    // Held until exit so the debug log is flushed
    let _log_guard = logging::setup_logging(
        &crash_log,
        &LoggingOptions {
            debug_mode: snapshot.debug_mode,
            console_output: true,
            debug_log_dir: Some(log_dir),
        },
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);
    let settings_path = settings.config_manager().settings_path();
    if settings.loaded_from_disk() {
        tracing::info!("Settings loaded from {}", settings_path);
    } else {
        tracing::warn!("Settings file not found at {}, using defaults", settings_path);
    }

    let mut ui_loop = UiLoop::<AppController>::new();
    let bridge = EventLoopBridge::start(
        ui_loop.handle(),
        BridgeConfig {
            shutdown_timeout: Duration::from_secs(snapshot.shutdown_timeout_secs),
            ..BridgeConfig::default()
        },
        Arc::clone(&metrics),
    )
    .context("Failed to start background loop")?;

    let settings: Arc<dyn SettingsStore> = settings;
    let notifier: Arc<dyn Notifier> = Arc::new(TerminalNotifier);
    let events: Arc<dyn MinerEvents> = Arc::new(ControllerEvents::new(
        bridge.clone_handle(),
        crash_log.clone(),
        notifier,
        Arc::clone(&settings),
        Arc::clone(&metrics),
    ));
    let client: Arc<dyn MinerClient> = Arc::new(
        SimulatedMiner::new(Arc::clone(&settings), events, snapshot.mineable_games())
            .with_stop_signal(bridge.stop_signal()),
    );

    let ctx = AppContext {
        settings,
        client,
        bridge: bridge.clone_handle(),
        crash_log,
        metrics,
    };
    let mut controller = AppController::new(ctx, console::console_screens());

    console::install_interrupt_handler(ui_loop.handle())
        .context("Failed to install interrupt handler")?;
    console::spawn_input_reader(ui_loop.handle()).context("Failed to start console input")?;
    println!("{}", console::HELP);

    // Blocks until quit
    ui_loop.run(&mut controller);

    tracing::info!("UI loop finished, waiting for background loop");
    bridge.join();

    tracing::info!("Application shutdown complete");
    Ok(())
}
