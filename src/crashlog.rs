// Crash log sink - durable run log that survives panics
//
// Every append opens the file, writes one buffer and closes the file again.
// The panic hook, the stderr tee and the miner log callback can all write
// from different threads without sharing a handle.
//
// Nothing in this module returns an error to its caller: a logger that can
// crash the application it is recording is worse than a missing line.

use crate::metrics::Metrics;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Local;
use std::backtrace::Backtrace;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::panic::PanicHookInfo;
use std::sync::Arc;

/// File name of the run log inside the resolved log directory
pub const LOG_FILE_NAME: &str = "dropminer.log";

/// Environment variable that overrides the preferred log directory
pub const LOG_DIR_ENV_VAR: &str = "DROPMINER_LOG_DIR";

/// Timestamp layout shared by crash headers, start markers and log lines
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time in [`TIMESTAMP_FORMAT`]
pub fn timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Build the ordered list of log directory candidates.
///
/// `preferred` (usually from [`LOG_DIR_ENV_VAR`]) comes first, then the
/// platform data directory, then the cache directory and finally the system
/// temp directory. None of these need any special permission.
pub fn default_log_candidates(app_name: &str, preferred: Option<&Utf8Path>) -> Vec<Utf8PathBuf> {
    let mut candidates = Vec::new();

    if let Some(dir) = preferred {
        candidates.push(dir.to_path_buf());
    }

    for base in [dirs::data_local_dir(), dirs::cache_dir()].into_iter().flatten() {
        if let Ok(base) = Utf8PathBuf::from_path_buf(base) {
            candidates.push(base.join(app_name).join("logs"));
        }
    }

    if let Ok(temp) = Utf8PathBuf::from_path_buf(std::env::temp_dir()) {
        candidates.push(temp.join(app_name));
    }

    candidates
}

/// Return the first candidate directory that exists or can be created.
///
/// Never fails. When no candidate can be created the last one is returned
/// anyway and later appends are silently dropped.
pub fn resolve_log_directory(candidates: &[Utf8PathBuf]) -> Utf8PathBuf {
    for dir in candidates {
        if fs::create_dir_all(dir).is_ok() {
            return dir.clone();
        }
    }

    candidates
        .last()
        .cloned()
        .unwrap_or_else(|| Utf8PathBuf::from("."))
}

/// Handle to the durable run log.
///
/// Cheap to clone; all clones append to the same file.
#[derive(Debug, Clone)]
pub struct CrashLog {
    path: Arc<Utf8PathBuf>,
    metrics: Option<Arc<Metrics>>,
}

impl CrashLog {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
            metrics: None,
        }
    }

    /// Open the run log inside `dir`
    pub fn in_directory(dir: &Utf8Path) -> Self {
        Self::new(dir.join(LOG_FILE_NAME))
    }

    /// Count swallowed write failures in `metrics`
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Append `text` followed by a newline (unless it already ends with one).
    ///
    /// Creates missing parent directories. Never fails and never panics.
    pub fn append_line(&self, text: &str) {
        if text.ends_with('\n') {
            self.append_bytes(text.as_bytes());
        } else {
            let mut line = String::with_capacity(text.len() + 1);
            line.push_str(text);
            line.push('\n');
            self.append_bytes(line.as_bytes());
        }
    }

    /// Append raw bytes in a single write. Never fails and never panics.
    pub fn append_bytes(&self, bytes: &[u8]) {
        if self.try_append(bytes).is_err() {
            if let Some(metrics) = &self.metrics {
                metrics.record_log_write_error();
            }
        }
    }

    fn try_append(&self, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path.as_std_path())?;
        file.write_all(bytes)
    }

    /// Write the `=== START <timestamp> log=<path> ===` marker
    pub fn write_start_marker(&self) {
        self.append_line(&format!("=== START {} log={} ===", timestamp(), self.path));
    }

    /// Record an error that ended `main` without a panic
    pub fn record_fatal_error(&self, error: &anyhow::Error) {
        self.append_line(&format!("\n=== CRASH {} ===\n{:?}\n", timestamp(), error));
    }
}

impl Write for CrashLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append_bytes(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Format a crash block for a panic.
///
/// ```text
///
/// === CRASH 2024-05-01 12:00:00 ===
/// thread 'main' panicked at src/main.rs:10:5:
/// boom
/// <backtrace>
/// ```
pub fn format_crash(info: &PanicHookInfo<'_>, backtrace: &Backtrace) -> String {
    let thread = std::thread::current();
    let name = thread.name().unwrap_or("<unnamed>");
    format!(
        "\n=== CRASH {} ===\nthread '{}' {}\n{}\n",
        timestamp(),
        name,
        info,
        backtrace
    )
}

/// Install a panic hook that records every panic in `sink`.
///
/// The previously installed hook runs afterwards, so the panic still
/// terminates the thread (or the process with `panic = "abort"`).
pub fn install_panic_hook(sink: CrashLog) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let backtrace = Backtrace::force_capture();
        sink.append_line(&format_crash(info, &backtrace));
        previous(info);
    }));
}

/// Writer that mirrors every write into the run log before forwarding it.
///
/// Forwarding errors are swallowed. Used as the console sink of the tracing
/// subscriber so everything printed on stderr also lands in the run log.
#[derive(Debug)]
pub struct TeeWriter<W> {
    sink: CrashLog,
    inner: W,
}

impl<W: Write> TeeWriter<W> {
    pub fn new(sink: CrashLog, inner: W) -> Self {
        Self { sink, inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for TeeWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sink.append_bytes(buf);
        let _ = self.inner.write_all(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = self.inner.flush();
        Ok(())
    }
}

#[cfg(unix)]
impl<W: std::os::fd::AsRawFd> std::os::fd::AsRawFd for TeeWriter<W> {
    fn as_raw_fd(&self) -> std::os::fd::RawFd {
        self.inner.as_raw_fd()
    }
}
