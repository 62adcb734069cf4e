//! Integration test for the logging bootstrap
//!
//! The tracing subscriber is process-wide, so this file holds a single test
//! and runs in its own test binary.

use camino::Utf8PathBuf;
use dropminer::crashlog::{self, CrashLog};
use dropminer::logging::{self, LoggingOptions};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_uncreatable_debug_dir_does_not_abort_startup() {
    let temp_dir = TempDir::new().unwrap();
    let base = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    let blocker = base.join("blocker");
    fs::write(&blocker, "not a directory").unwrap();

    // Both candidates sit under a plain file, so the resolved directory is
    // the last candidate and can never be created
    let debug_dir = blocker.join("fallback");
    let resolved = crashlog::resolve_log_directory(&[blocker.join("primary"), debug_dir.clone()]);
    assert_eq!(resolved, debug_dir);
    assert!(!resolved.exists());

    let run_log_dir = base.join("logs");
    fs::create_dir_all(&run_log_dir).unwrap();
    let sink = CrashLog::in_directory(&run_log_dir);

    let guard = logging::setup_logging(
        &sink,
        &LoggingOptions {
            debug_mode: true,
            console_output: false,
            debug_log_dir: Some(resolved),
        },
    )
    .unwrap();
    assert!(guard.is_none());

    tracing::info!("after bootstrap");

    let contents = fs::read_to_string(sink.path()).unwrap();
    assert!(contents.contains("Debug log disabled, cannot create directory"));
    assert!(contents.contains("after bootstrap"));
}
