// Runtime metrics module
//
// Lightweight counters for the bridge, the UI queue and the run log

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Process-wide runtime metrics
///
/// Uses atomic operations so both the UI thread and the background thread can
/// record without locks. Logged once on shutdown.
#[derive(Debug)]
pub struct Metrics {
    /// Futures submitted to the background loop
    pub tasks_submitted: AtomicU64,

    /// Background tasks that ran to completion
    pub tasks_completed: AtomicU64,

    /// Background tasks that panicked, were cancelled or were rejected
    pub tasks_failed: AtomicU64,

    /// Callbacks posted to the UI thread
    pub ui_posts: AtomicU64,

    /// UI posts that could not be queued because the UI loop is gone
    pub ui_posts_dropped: AtomicU64,

    /// Lines received through the miner log callback
    pub log_lines: AtomicU64,

    /// Appends to the run log that failed and were swallowed
    pub log_write_errors: AtomicU64,

    /// Platform notifications that failed
    pub notification_errors: AtomicU64,

    /// Application start time
    start_time: Instant,
}

impl Metrics {
    /// Create a new Metrics instance
    pub fn new() -> Self {
        Self {
            tasks_submitted: AtomicU64::new(0),
            tasks_completed: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
            ui_posts: AtomicU64::new(0),
            ui_posts_dropped: AtomicU64::new(0),
            log_lines: AtomicU64::new(0),
            log_write_errors: AtomicU64::new(0),
            notification_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_task_submitted(&self) {
        self.tasks_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_task_completed(&self) {
        self.tasks_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_task_failed(&self) {
        self.tasks_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ui_post(&self) {
        self.ui_posts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ui_post_dropped(&self) {
        self.ui_posts_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_log_line(&self) {
        self.log_lines.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_log_write_error(&self) {
        self.log_write_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_notification_error(&self) {
        self.notification_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Tasks submitted but not yet completed or failed
    pub fn tasks_outstanding(&self) -> u64 {
        let submitted = self.tasks_submitted.load(Ordering::Relaxed);
        let finished = self.tasks_completed.load(Ordering::Relaxed)
            + self.tasks_failed.load(Ordering::Relaxed);
        submitted.saturating_sub(finished)
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Runtime Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Background tasks: {} submitted, {} completed, {} failed",
            self.tasks_submitted.load(Ordering::Relaxed),
            self.tasks_completed.load(Ordering::Relaxed),
            self.tasks_failed.load(Ordering::Relaxed)
        );
        tracing::info!(
            "UI posts: {}, dropped: {}",
            self.ui_posts.load(Ordering::Relaxed),
            self.ui_posts_dropped.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Log lines: {}, write errors: {}, notification errors: {}",
            self.log_lines.load(Ordering::Relaxed),
            self.log_write_errors.load(Ordering::Relaxed),
            self.notification_errors.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new();
        assert_eq!(metrics.tasks_submitted.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.ui_posts.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_task_counters() {
        let metrics = Metrics::new();

        metrics.record_task_submitted();
        metrics.record_task_submitted();
        metrics.record_task_submitted();
        metrics.record_task_completed();
        metrics.record_task_failed();

        assert_eq!(metrics.tasks_submitted.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.tasks_outstanding(), 1);
    }

    #[test]
    fn test_outstanding_never_underflows() {
        let metrics = Metrics::new();
        metrics.record_task_completed();
        assert_eq!(metrics.tasks_outstanding(), 0);
    }

    #[test]
    fn test_uptime() {
        let metrics = Metrics::new();
        thread::sleep(Duration::from_millis(10));
        assert!(metrics.uptime().as_millis() >= 10);
    }

    #[test]
    fn test_log_and_ui_counters() {
        let metrics = Metrics::new();

        metrics.record_ui_post();
        metrics.record_ui_post_dropped();
        metrics.record_log_line();
        metrics.record_log_write_error();
        metrics.record_notification_error();

        assert_eq!(metrics.ui_posts.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.ui_posts_dropped.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.log_lines.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.log_write_errors.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.notification_errors.load(Ordering::Relaxed), 1);
    }
}
