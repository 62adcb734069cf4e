use crate::crashlog::{self, CrashLog, TeeWriter};
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use std::fmt;
use std::fs;
use std::io;
use tracing::{Event, Level, Subscriber};
use tracing_appender::rolling;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable that overrides the log filter (e.g. `DROPMINER_LOG=debug`)
pub const LOG_ENV_VAR: &str = "DROPMINER_LOG";

/// Prefix of the daily rotating debug log files
pub const DEBUG_LOG_PREFIX: &str = "dropminer-debug";

/// Options for [`setup_logging`]
#[derive(Debug, Clone, Default)]
pub struct LoggingOptions {
    /// Use debug level and enable the rotating debug log
    pub debug_mode: bool,

    /// Mirror the run log on stderr
    pub console_output: bool,

    /// Directory for the rotating debug log (only used in debug mode)
    pub debug_log_dir: Option<Utf8PathBuf>,
}

/// Format a run log line: `<timestamp> - <target> - <LEVEL> - <message>`
pub fn format_line(target: &str, level: Level, message: &str) -> String {
    format!("{} - {} - {} - {}", crashlog::timestamp(), target, level, message)
}

/// Event formatter producing the run log layout (see [`format_line`])
#[derive(Debug, Clone, Copy, Default)]
pub struct RunLogFormat;

impl<S, N> FormatEvent<S, N> for RunLogFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        write!(
            writer,
            "{} - {} - {} - ",
            crashlog::timestamp(),
            metadata.target(),
            metadata.level()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

impl<'a> MakeWriter<'a> for CrashLog {
    type Writer = CrashLog;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Makes [`TeeWriter`]s over stderr that mirror into a [`CrashLog`]
#[derive(Debug, Clone)]
pub struct TeeStderr {
    sink: CrashLog,
}

impl TeeStderr {
    pub fn new(sink: CrashLog) -> Self {
        Self { sink }
    }
}

impl<'a> MakeWriter<'a> for TeeStderr {
    type Writer = TeeWriter<io::Stderr>;

    fn make_writer(&'a self) -> Self::Writer {
        TeeWriter::new(self.sink.clone(), io::stderr())
    }
}

/// Setup logging through the crash log sink.
///
/// Every event is appended to the run log in the [`RunLogFormat`] layout.
/// With `console_output` the same line is also printed on stderr (through a
/// [`TeeWriter`], so it is written to the run log exactly once). In debug mode
/// a verbose daily rotating log is added; when its directory cannot be
/// created the debug log is skipped with a warning and startup continues.
///
/// # Arguments
/// * `sink` - The run log, already resolved by the bootstrap
/// * `options` - Level, console and debug log settings
///
/// # Returns
/// The worker guard of the debug log when one was created (`None` otherwise);
/// it must be held for the duration of the program to keep that log flushed
pub fn setup_logging(
    sink: &CrashLog,
    options: &LoggingOptions,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    // Determine log level based on debug mode, unless overridden
    let default_level = if options.debug_mode { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(default_level));

    let (console_layer, file_layer) = if options.console_output {
        let layer = tracing_subscriber::fmt::layer()
            .event_format(RunLogFormat)
            .with_writer(TeeStderr::new(sink.clone()));
        (Some(layer), None)
    } else {
        let layer = tracing_subscriber::fmt::layer()
            .event_format(RunLogFormat)
            .with_writer(sink.clone());
        (None, Some(layer))
    };

    // The run log directory was resolved without failing; a debug log that
    // cannot be created there is dropped instead of aborting startup
    let mut debug_log_error = None;
    let (debug_layer, guard) = match (&options.debug_log_dir, options.debug_mode) {
        (Some(dir), true) => match fs::create_dir_all(dir) {
            Ok(()) => {
                let file_appender = rolling::daily(dir, DEBUG_LOG_PREFIX);
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

                let layer = tracing_subscriber::fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false) // No ANSI codes in log files
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true);
                (Some(layer), Some(guard))
            }
            Err(e) => {
                debug_log_error = Some(format!("{}: {}", dir, e));
                (None, None)
            }
        },
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .with(debug_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!(
        "Logging initialized: log={}, debug={}, console={}",
        sink.path(),
        options.debug_mode,
        options.console_output
    );

    if let Some(error) = debug_log_error {
        tracing::warn!("Debug log disabled, cannot create directory {}", error);
    }

    Ok(guard)
}
