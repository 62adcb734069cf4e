// UiLoop - the UI thread's main loop
//
// Callbacks posted from any thread are queued and executed, in the order they
// were posted, on whichever thread drives the loop. The UI root `T` is never
// handed to another thread: callbacks receive `&mut T` only while the loop
// runs them.

use tokio::sync::mpsc;

type UiCallback<T> = Box<dyn FnOnce(&mut T) + Send>;

enum UiMessage<T> {
    Run(UiCallback<T>),
    Quit,
}

/// Main loop executing posted callbacks against the UI root `T`
pub struct UiLoop<T> {
    tx: mpsc::UnboundedSender<UiMessage<T>>,
    rx: mpsc::UnboundedReceiver<UiMessage<T>>,
    quit_requested: bool,
}

impl<T: 'static> UiLoop<T> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            quit_requested: false,
        }
    }

    /// Handle for posting callbacks from any thread
    pub fn handle(&self) -> UiHandle<T> {
        UiHandle {
            tx: self.tx.clone(),
        }
    }

    /// Run until [`UiHandle::quit`] is called.
    ///
    /// Blocks the calling thread, which becomes the UI thread. Must not be
    /// called from inside an async runtime.
    pub fn run(&mut self, root: &mut T) {
        tracing::debug!("UI loop started");

        while !self.quit_requested {
            match self.rx.blocking_recv() {
                Some(UiMessage::Run(callback)) => callback(root),
                Some(UiMessage::Quit) | None => self.quit_requested = true,
            }
        }

        tracing::debug!("UI loop finished");
    }

    /// Run everything queued so far (one idle tick) and return how many
    /// callbacks were executed. Callbacks posted while draining run too.
    pub fn run_pending(&mut self, root: &mut T) -> usize {
        let mut executed = 0;
        while let Ok(message) = self.rx.try_recv() {
            match message {
                UiMessage::Run(callback) => {
                    callback(root);
                    executed += 1;
                }
                UiMessage::Quit => {
                    self.quit_requested = true;
                    break;
                }
            }
        }
        executed
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }
}

impl<T: 'static> Default for UiLoop<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable, thread-safe handle to a [`UiLoop`]
pub struct UiHandle<T> {
    tx: mpsc::UnboundedSender<UiMessage<T>>,
}

// Manual Clone implementation to avoid requiring T: Clone
impl<T> Clone for UiHandle<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T: 'static> UiHandle<T> {
    /// Queue `callback` for the UI thread.
    ///
    /// Never runs the callback on the calling thread, even when called from
    /// the UI thread itself. Returns `false` when the loop no longer exists.
    pub fn post<F>(&self, callback: F) -> bool
    where
        F: FnOnce(&mut T) + Send + 'static,
    {
        self.tx.send(UiMessage::Run(Box::new(callback))).is_ok()
    }

    /// Ask the loop to return from [`UiLoop::run`] after the callbacks
    /// already queued
    pub fn quit(&self) {
        let _ = self.tx.send(UiMessage::Quit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_callbacks_run_in_post_order() {
        let mut ui_loop = UiLoop::<Vec<u32>>::new();
        let handle = ui_loop.handle();
        let mut root = Vec::new();

        for i in 0..10 {
            assert!(handle.post(move |root: &mut Vec<u32>| root.push(i)));
        }

        assert!(root.is_empty());
        assert_eq!(ui_loop.run_pending(&mut root), 10);
        assert_eq!(root, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_post_never_runs_synchronously() {
        let mut ui_loop = UiLoop::<u32>::new();
        let handle = ui_loop.handle();
        let mut root = 0;

        let nested = handle.clone();
        handle.post(move |root: &mut u32| {
            *root += 1;
            nested.post(|root: &mut u32| *root += 10);
        });

        assert_eq!(ui_loop.run_pending(&mut root), 2);
        assert_eq!(root, 11);
    }

    #[test]
    fn test_posts_from_other_threads_run_on_loop_thread() {
        let mut ui_loop = UiLoop::<Vec<thread::ThreadId>>::new();
        let handle = ui_loop.handle();

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let handle = handle.clone();
                thread::spawn(move || {
                    handle.post(|root: &mut Vec<thread::ThreadId>| {
                        root.push(thread::current().id())
                    });
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let mut root = Vec::new();
        ui_loop.run_pending(&mut root);

        assert_eq!(root.len(), 4);
        assert!(root.iter().all(|id| *id == thread::current().id()));
    }

    #[test]
    fn test_run_returns_after_quit() {
        let mut ui_loop = UiLoop::<u32>::new();
        let handle = ui_loop.handle();
        let mut root = 0;

        let poster = thread::spawn(move || {
            handle.post(|root: &mut u32| *root += 1);
            handle.post(|root: &mut u32| *root += 1);
            handle.quit();
        });

        ui_loop.run(&mut root);
        poster.join().unwrap();

        assert_eq!(root, 2);
        assert!(ui_loop.quit_requested());
    }

    #[test]
    fn test_post_after_loop_dropped() {
        let ui_loop = UiLoop::<u32>::new();
        let handle = ui_loop.handle();
        drop(ui_loop);

        assert!(!handle.post(|root: &mut u32| *root += 1));
    }
}
