//! Background worker that drains tasks strictly in submission order.
//!
//! Provides a generic `BackgroundWorker<R>` that processes tasks from a
//! bounded mpsc channel via a `BackgroundRunnable` implementation on one
//! dedicated tokio task. The wrapper's mirror propagation rides on this:
//! one worker, one queue, submission order preserved, no cancellation of
//! in-flight work.

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Trait for task handlers executed by `BackgroundWorker`.
#[async_trait]
pub trait BackgroundRunnable: Send + 'static {
    /// The type of task this runnable processes.
    type Task: Send + 'static;

    /// Process a single task.
    async fn run(&mut self, task: Self::Task);

    /// Called once when the worker is shutting down. Default is a no-op.
    async fn shutdown(&mut self) {}
}

/// Generic background worker that processes tasks via a bounded mpsc channel.
///
/// The worker spawns a tokio task that pulls tasks off the channel one at a
/// time and calls `BackgroundRunnable::run()` for each, so tasks execute
/// strictly in submission order. The worker exits when every sender is
/// dropped or [`stop`](BackgroundWorker::stop) is called, after which
/// `BackgroundRunnable::shutdown()` runs.
pub struct BackgroundWorker<R: BackgroundRunnable> {
    tx: Option<mpsc::Sender<R::Task>>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl<R: BackgroundRunnable> BackgroundWorker<R> {
    /// Start the background worker with the given runnable.
    ///
    /// The channel capacity is fixed at 256; submission applies
    /// backpressure when the queue is full.
    pub fn start(mut runnable: R) -> Self {
        let (tx, mut rx) = mpsc::channel::<R::Task>(256);
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    task = rx.recv() => {
                        match task {
                            Some(t) => runnable.run(t).await,
                            None => break, // Channel closed.
                        }
                    }
                    _ = &mut shutdown_rx => {
                        break;
                    }
                }
            }

            runnable.shutdown().await;
        });

        Self {
            tx: Some(tx),
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    /// Submit a task to the worker.
    ///
    /// Waits for queue capacity when the channel is full.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker has been stopped.
    pub async fn submit(&self, task: R::Task) -> anyhow::Result<()> {
        match &self.tx {
            Some(tx) => tx
                .send(task)
                .await
                .map_err(|_| anyhow::anyhow!("worker channel closed")),
            None => Err(anyhow::anyhow!("worker not running")),
        }
    }

    /// Stop the worker, waiting for the worker task to complete.
    ///
    /// Tasks still queued at stop time are dropped unprocessed.
    pub async fn stop(&mut self) {
        // Signal shutdown.
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        // Close the task channel.
        self.tx.take();
        // Wait for the worker task to finish.
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    use super::*;

    struct RecordingRunnable {
        seen: Arc<Mutex<Vec<u32>>>,
        shutdown_called: Arc<AtomicU32>,
    }

    #[async_trait]
    impl BackgroundRunnable for RecordingRunnable {
        type Task = u32;

        async fn run(&mut self, task: u32) {
            self.seen.lock().unwrap().push(task);
        }

        async fn shutdown(&mut self) {
            self.shutdown_called.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn tasks_run_in_submission_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let shutdown_called = Arc::new(AtomicU32::new(0));

        let mut worker = BackgroundWorker::start(RecordingRunnable {
            seen: seen.clone(),
            shutdown_called: shutdown_called.clone(),
        });

        for task in 0..50 {
            worker.submit(task).await.unwrap();
        }

        // Give the worker time to process tasks.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let observed = seen.lock().unwrap().clone();
        assert_eq!(observed, (0..50).collect::<Vec<u32>>());

        worker.stop().await;
        assert_eq!(shutdown_called.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn submit_after_stop_returns_error() {
        let mut worker = BackgroundWorker::start(RecordingRunnable {
            seen: Arc::new(Mutex::new(Vec::new())),
            shutdown_called: Arc::new(AtomicU32::new(0)),
        });

        worker.stop().await;

        let result = worker.submit(1).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn dropping_the_handle_shuts_the_worker_down() {
        let shutdown_called = Arc::new(AtomicU32::new(0));

        let worker = BackgroundWorker::start(RecordingRunnable {
            seen: Arc::new(Mutex::new(Vec::new())),
            shutdown_called: shutdown_called.clone(),
        });

        drop(worker);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert_eq!(shutdown_called.load(Ordering::SeqCst), 1);
    }
}
