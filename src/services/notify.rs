use anyhow::{Context, Result};
use std::io::{self, Write};

/// Platform notification collaborator.
///
/// Callers catch and log failures; a broken notifier must never interrupt the
/// event fan-out.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str) -> Result<()>;
}

/// Rings the terminal bell and prints the notification on stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, title: &str, message: &str) -> Result<()> {
        let mut stderr = io::stderr().lock();
        writeln!(stderr, "\x07[{}] {}", title, message)
            .and_then(|_| stderr.flush())
            .context("Failed to write terminal notification")
    }
}
