// EventLoopBridge - Coordinates between the background tokio loop and the UI loop
//
// Two event loops run side by side:
// 1. The UI loop (UiLoop) on the main thread, executing posted callbacks
// 2. A current-thread tokio runtime on one dedicated worker thread, driving
//    every domain future cooperatively
//
// The bridge provides:
// - Submitting futures to the background loop from any thread (message passing)
// - Posting callbacks back to the UI thread
// - Cooperative shutdown: stop accepting work, drain in-flight tasks, exit

use crate::metrics::Metrics;
use crate::ui::event_loop::UiHandle;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinSet;

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Errors observed through a [`TaskHandle`] or when starting the bridge
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("background loop has stopped")]
    Stopped,

    #[error("background task panicked: {0}")]
    Panicked(String),

    #[error("background task was cancelled")]
    Cancelled,

    #[error("failed to spawn background thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Lifecycle of a submitted task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Submitted,
    Running,
    Completed,
    Failed,
}

impl TaskState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Submitted,
            1 => Self::Running,
            2 => Self::Completed,
            _ => Self::Failed,
        }
    }

    fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Background loop settings
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Name of the worker thread
    pub thread_name: String,

    /// How long `stop` lets in-flight tasks drain before aborting them
    pub shutdown_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            thread_name: "dropminer-worker".to_string(),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

/// Cooperative stop signal for in-flight background work
#[derive(Debug, Clone)]
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the bridge has been asked to stop
    pub async fn stopped(&self) {
        let mut rx = self.rx.clone();
        // A dropped sender means the bridge is gone, which counts as stopped
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

/// Handle to one submitted future.
///
/// Dropping it does not cancel the task.
pub struct TaskHandle<T> {
    state: Arc<AtomicU8>,
    result: oneshot::Receiver<Result<T, BridgeError>>,
}

impl<T> TaskHandle<T> {
    fn rejected() -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(Err(BridgeError::Stopped));
        Self {
            state: Arc::new(AtomicU8::new(TaskState::Failed as u8)),
            result: rx,
        }
    }

    pub fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Block until the task finishes.
    ///
    /// Must not be called on the background thread itself.
    pub fn join(self) -> Result<T, BridgeError> {
        self.result
            .blocking_recv()
            .unwrap_or(Err(BridgeError::Cancelled))
    }

    /// Wait for the task from async code on another runtime
    pub async fn wait(self) -> Result<T, BridgeError> {
        self.result.await.unwrap_or(Err(BridgeError::Cancelled))
    }
}

/// Marks the task failed if it is dropped before reaching a terminal state
struct StateGuard(Arc<AtomicU8>);

impl StateGuard {
    fn set(&self, state: TaskState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

impl Drop for StateGuard {
    fn drop(&mut self) {
        let current = TaskState::from_u8(self.0.load(Ordering::Acquire));
        if !current.is_terminal() {
            self.set(TaskState::Failed);
        }
    }
}

struct Shared {
    jobs: mpsc::UnboundedSender<Job>,
    stop_tx: watch::Sender<bool>,
    metrics: Arc<Metrics>,
}

/// Owns the background worker thread.
///
/// Created once per process with [`EventLoopBridge::start`]. Use
/// [`clone_handle`](Self::clone_handle) to hand out submission handles.
///
/// # Example
/// ```ignore
/// let mut ui_loop = UiLoop::<MyUi>::new();
/// let bridge = EventLoopBridge::start(ui_loop.handle(), BridgeConfig::default(), metrics)?;
///
/// let handle = bridge.clone_handle();
/// bridge.submit(async move {
///     let status = fetch_status().await;
///     handle.post_to_ui(move |ui| ui.set_status(status));
/// });
///
/// ui_loop.run(&mut my_ui);
/// ```
pub struct EventLoopBridge<T> {
    handle: EventLoopBridgeHandle<T>,
    thread: Option<JoinHandle<()>>,
}

impl<T: 'static> EventLoopBridge<T> {
    /// Spawn the worker thread and its scheduler.
    ///
    /// The application has exactly one background loop: `main` calls this
    /// once and hands clones of the handle to everything else. Nothing here
    /// enforces that. Each call starts a separate worker with its own stop
    /// signal, and stopping one leaves the others running, which is what
    /// tests rely on when they build their own instance.
    ///
    /// # Arguments
    /// * `ui` - Handle to the UI loop that `post_to_ui` targets
    /// * `config` - Thread name and drain timeout
    /// * `metrics` - Counters for submitted/finished tasks and UI posts
    pub fn start(
        ui: UiHandle<T>,
        config: BridgeConfig,
        metrics: Arc<Metrics>,
    ) -> Result<Self, BridgeError> {
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel::<Job>();
        let (stop_tx, stop_rx) = watch::channel(false);
        let shutdown_timeout = config.shutdown_timeout;

        let thread = std::thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || run_worker(jobs_rx, stop_rx, shutdown_timeout))?;

        tracing::info!("Background loop started on thread {}", config.thread_name);

        Ok(Self {
            handle: EventLoopBridgeHandle {
                shared: Arc::new(Shared {
                    jobs: jobs_tx,
                    stop_tx,
                    metrics,
                }),
                ui,
            },
            thread: Some(thread),
        })
    }

    /// Lightweight handle that can be cloned into callbacks and tasks
    pub fn clone_handle(&self) -> EventLoopBridgeHandle<T> {
        self.handle.clone()
    }

    /// See [`EventLoopBridgeHandle::submit`]
    pub fn submit<F>(&self, future: F) -> TaskHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.submit(future)
    }

    /// See [`EventLoopBridgeHandle::post_to_ui`]
    pub fn post_to_ui<F>(&self, callback: F)
    where
        F: FnOnce(&mut T) + Send + 'static,
    {
        self.handle.post_to_ui(callback);
    }

    pub fn stop(&self) {
        self.handle.stop();
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.handle.stop_signal()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(|thread| thread.is_finished())
    }

    /// Stop the loop (if not already stopped) and wait for the worker thread.
    ///
    /// Bounded by the configured drain timeout.
    pub fn join(mut self) {
        self.handle.stop();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Background thread panicked during shutdown");
            }
        }
    }
}

impl<T> Drop for EventLoopBridge<T> {
    fn drop(&mut self) {
        let _ = self.handle.shared.stop_tx.send_replace(true);
    }
}

/// Cloneable submission handle for the background loop
pub struct EventLoopBridgeHandle<T> {
    shared: Arc<Shared>,
    ui: UiHandle<T>,
}

// Manual Clone implementation to avoid requiring T: Clone
impl<T> Clone for EventLoopBridgeHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            ui: self.ui.clone(),
        }
    }
}

impl<T: 'static> EventLoopBridgeHandle<T> {
    /// Schedule `future` on the background loop from any thread.
    ///
    /// Returns immediately. After [`stop`](Self::stop) the future is not run
    /// and the handle resolves to [`BridgeError::Stopped`].
    pub fn submit<F>(&self, future: F) -> TaskHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let metrics = Arc::clone(&self.shared.metrics);
        metrics.record_task_submitted();

        if self.is_stopped() {
            tracing::warn!("Task submitted after background loop stopped - rejecting");
            metrics.record_task_failed();
            return TaskHandle::rejected();
        }

        let state = Arc::new(AtomicU8::new(TaskState::Submitted as u8));
        let (result_tx, result_rx) = oneshot::channel();
        let guard = StateGuard(Arc::clone(&state));

        let job: Job = Box::pin(async move {
            guard.set(TaskState::Running);

            // Run as its own task so a panic is reported instead of tearing
            // down the wrapper
            let outcome = match tokio::spawn(future).await {
                Ok(value) => {
                    guard.set(TaskState::Completed);
                    metrics.record_task_completed();
                    Ok(value)
                }
                Err(error) if error.is_panic() => {
                    guard.set(TaskState::Failed);
                    metrics.record_task_failed();
                    Err(BridgeError::Panicked(panic_message(error.into_panic())))
                }
                Err(_) => {
                    guard.set(TaskState::Failed);
                    metrics.record_task_failed();
                    Err(BridgeError::Cancelled)
                }
            };

            let _ = result_tx.send(outcome);
        });

        if self.shared.jobs.send(job).is_err() {
            tracing::warn!("Background loop is gone - task dropped");
            self.shared.metrics.record_task_failed();
        }

        TaskHandle {
            state,
            result: result_rx,
        }
    }

    /// Queue `callback` for the UI thread; never runs it on the caller
    pub fn post_to_ui<F>(&self, callback: F)
    where
        F: FnOnce(&mut T) + Send + 'static,
    {
        self.shared.metrics.record_ui_post();
        if !self.ui.post(callback) {
            self.shared.metrics.record_ui_post_dropped();
            tracing::warn!("Failed to post UI update - UI loop has stopped");
        }
    }

    /// Request the background loop to stop. Idempotent, callable from any thread.
    pub fn stop(&self) {
        let was_stopped = self.shared.stop_tx.send_replace(true);
        if !was_stopped {
            tracing::info!("Background loop stop requested");
        }
    }

    pub fn is_stopped(&self) -> bool {
        *self.shared.stop_tx.borrow()
    }

    pub fn stop_signal(&self) -> StopSignal {
        StopSignal {
            rx: self.shared.stop_tx.subscribe(),
        }
    }

    /// Handle to the UI loop, for tasks that only need to post back
    pub fn ui_handle(&self) -> UiHandle<T> {
        self.ui.clone()
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.shared.metrics
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Body of the worker thread: drive one current-thread runtime until stopped
fn run_worker(
    mut jobs: mpsc::UnboundedReceiver<Job>,
    mut stop_rx: watch::Receiver<bool>,
    shutdown_timeout: Duration,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to build background runtime: {}", e);
            return;
        }
    };

    tracing::debug!("Background loop running");

    runtime.block_on(async move {
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                biased;
                _ = stop_rx.wait_for(|stopped| *stopped) => break,
                job = jobs.recv() => match job {
                    Some(job) => {
                        in_flight.spawn(job);
                    }
                    None => break,
                },
                Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
            }
        }

        // Work queued before the stop request was accepted and still runs
        jobs.close();
        while let Ok(job) = jobs.try_recv() {
            in_flight.spawn(job);
        }

        if !in_flight.is_empty() {
            tracing::debug!("Draining {} background task(s)", in_flight.len());
        }

        let drained = tokio::time::timeout(shutdown_timeout, async {
            while in_flight.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                "{} background task(s) still running after {:?} - aborting",
                in_flight.len(),
                shutdown_timeout
            );
            in_flight.abort_all();
        }
    });

    // Dropping the runtime cancels anything the tasks spawned themselves
    drop(runtime);
    tracing::debug!("Background loop terminated");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::event_loop::UiLoop;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::thread;

    fn start_bridge() -> (UiLoop<Vec<String>>, EventLoopBridge<Vec<String>>) {
        let ui_loop = UiLoop::new();
        let bridge = EventLoopBridge::start(
            ui_loop.handle(),
            BridgeConfig {
                thread_name: "test-worker".to_string(),
                shutdown_timeout: Duration::from_secs(2),
            },
            Arc::new(Metrics::new()),
        )
        .unwrap();
        (ui_loop, bridge)
    }

    #[test]
    fn test_submit_runs_on_worker_thread() {
        let (_ui_loop, bridge) = start_bridge();

        let handle = bridge.submit(async { thread::current().name().map(str::to_string) });

        assert_eq!(handle.join().unwrap().as_deref(), Some("test-worker"));
        bridge.join();
    }

    #[test]
    fn test_all_tasks_share_one_thread() {
        let (_ui_loop, bridge) = start_bridge();

        let handles: Vec<_> = (0..8)
            .map(|_| bridge.submit(async { thread::current().id() }))
            .collect();
        let ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(ids.windows(2).all(|pair| pair[0] == pair[1]));
        assert_ne!(ids[0], thread::current().id());
        bridge.join();
    }

    #[test]
    fn test_task_state_transitions() {
        let (_ui_loop, bridge) = start_bridge();
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let (started_tx, started_rx) = std::sync::mpsc::channel::<()>();

        let handle = bridge.submit(async move {
            let _ = started_tx.send(());
            let _ = release_rx.await;
            7
        });

        started_rx.recv().unwrap();
        assert_eq!(handle.state(), TaskState::Running);

        release_tx.send(()).unwrap();
        assert_eq!(handle.join().unwrap(), 7);
        bridge.join();
    }

    #[test]
    fn test_panicking_task_is_failed() {
        let (_ui_loop, bridge) = start_bridge();

        let handle = bridge.submit(async {
            panic!("task exploded");
        });

        let metrics = Arc::clone(bridge.clone_handle().metrics());
        match handle.join() {
            Err(BridgeError::Panicked(message)) => assert!(message.contains("task exploded")),
            other => panic!("expected panic error, got {:?}", other.map(|_| ())),
        }

        // The loop keeps serving after a task panics
        assert_eq!(bridge.submit(async { 1 }).join().unwrap(), 1);
        assert_eq!(metrics.tasks_failed.load(Ordering::Relaxed), 1);
        bridge.join();
    }

    #[test]
    fn test_submit_after_stop_is_rejected() {
        let (_ui_loop, bridge) = start_bridge();
        let handle = bridge.clone_handle();

        bridge.stop();
        bridge.stop();

        let task = handle.submit(async { 1 });
        assert_eq!(task.state(), TaskState::Failed);
        assert!(matches!(task.join(), Err(BridgeError::Stopped)));
        assert!(handle.is_stopped());
        bridge.join();
    }

    #[test]
    fn test_stop_drains_in_flight_work() {
        let (_ui_loop, bridge) = start_bridge();
        let finished = Arc::new(AtomicBool::new(false));
        let signal = bridge.stop_signal();
        let (started_tx, started_rx) = std::sync::mpsc::channel::<()>();

        let flag = Arc::clone(&finished);
        let task = bridge.submit(async move {
            let _ = started_tx.send(());
            signal.stopped().await;
            // Cleanup after observing the stop signal still completes
            tokio::time::sleep(Duration::from_millis(20)).await;
            flag.store(true, Ordering::SeqCst);
        });

        started_rx.recv().unwrap();
        bridge.stop();
        bridge.join();

        assert!(finished.load(Ordering::SeqCst));
        assert_eq!(task.state(), TaskState::Completed);
    }

    #[test]
    fn test_stuck_task_is_aborted_after_timeout() {
        let ui_loop = UiLoop::<()>::new();
        let bridge = EventLoopBridge::start(
            ui_loop.handle(),
            BridgeConfig {
                thread_name: "stuck-worker".to_string(),
                shutdown_timeout: Duration::from_millis(50),
            },
            Arc::new(Metrics::new()),
        )
        .unwrap();

        let task = bridge.submit(std::future::pending::<()>());
        while task.state() != TaskState::Running {
            thread::sleep(Duration::from_millis(1));
        }

        bridge.join();

        assert_eq!(task.state(), TaskState::Failed);
        assert!(matches!(task.join(), Err(BridgeError::Cancelled)));
    }

    #[test]
    fn test_post_to_ui_runs_on_ui_thread_in_order() {
        let (mut ui_loop, bridge) = start_bridge();
        let handle = bridge.clone_handle();
        let posted = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&posted);
        bridge
            .submit(async move {
                for i in 0..5 {
                    handle.post_to_ui(move |ui: &mut Vec<String>| {
                        ui.push(format!("{} {:?}", i, thread::current().id()));
                    });
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            })
            .join()
            .unwrap();

        // Every post returned before anything ran on the UI side
        assert_eq!(posted.load(Ordering::SeqCst), 5);

        let mut ui = Vec::new();
        assert_eq!(ui_loop.run_pending(&mut ui), 5);

        let me = format!("{:?}", thread::current().id());
        for (i, line) in ui.iter().enumerate() {
            assert_eq!(line, &format!("{} {}", i, me));
        }
        bridge.join();
    }

    #[test]
    fn test_stop_signal_reflects_stop() {
        let (_ui_loop, bridge) = start_bridge();
        let signal = bridge.stop_signal();

        assert!(!signal.is_stopped());
        bridge.stop();
        assert!(signal.is_stopped());
        tokio_test::block_on(signal.stopped());
        bridge.join();
    }

    #[test]
    fn test_separate_instances_stop_independently() {
        let (_first_loop, first) = start_bridge();
        let (_second_loop, second) = start_bridge();

        first.stop();
        assert!(first.clone_handle().is_stopped());
        assert!(!second.clone_handle().is_stopped());
        assert_eq!(second.submit(async { 7 }).join().unwrap(), 7);

        first.join();
        second.join();
    }
}
