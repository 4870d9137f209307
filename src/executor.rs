//! Bounded pool for fire-and-forget background work.

use futures::future::join_all;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, trace, warn, Instrument};

use crate::lock_unpoisoned as lock;

const LOG_TARGET: &str = "r_playbot::executor";

/// Runs submitted futures on the tokio runtime, at most `workers` at a time.
///
/// Tasks return nothing to the submitter; they report through the transport.
#[derive(Clone)]
pub struct TaskExecutor {
    permits: Arc<Semaphore>,
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
    running: Arc<AtomicUsize>,
}

impl TaskExecutor {
    pub fn new(workers: usize) -> Self {
        info!(target: LOG_TARGET, "Creating task executor with {} workers", workers);
        TaskExecutor {
            permits: Arc::new(Semaphore::new(workers.max(1))),
            handles: Arc::new(Mutex::new(Vec::new())),
            running: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queues `task`. It starts as soon as a worker slot is free.
    pub fn submit<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permits = self.permits.clone();
        let running = self.running.clone();
        let span = tracing::info_span!(target: LOG_TARGET, "task", name);

        let handle = tokio::spawn(
            async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        warn!(target: LOG_TARGET, "Executor closed before task could start.");
                        return;
                    }
                };
                let _running = RunningGuard::enter(running);
                trace!(target: LOG_TARGET, "Task started.");
                task.await;
                trace!(target: LOG_TARGET, "Task finished.");
            }
            .instrument(span),
        );

        let mut handles = lock(&self.handles);
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
        debug!(target: LOG_TARGET, task = name, tracked = handles.len(), "Task submitted.");
    }

    /// Number of tasks currently holding a worker slot.
    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    /// Waits for every task submitted so far. Panicked tasks are logged, not propagated.
    pub async fn wait_idle(&self) {
        loop {
            let pending: Vec<JoinHandle<()>> = std::mem::take(&mut *lock(&self.handles));
            if pending.is_empty() {
                return;
            }
            for result in join_all(pending).await {
                log_join_result(result);
            }
        }
    }

    /// Stops accepting work, waits up to `timeout` for outstanding tasks and aborts the rest.
    #[instrument(skip(self))]
    pub async fn shutdown(&self, timeout: Duration) {
        info!(target: LOG_TARGET, "Shutting down task executor...");
        self.permits.close();

        let mut pending: Vec<JoinHandle<()>> = std::mem::take(&mut *lock(&self.handles));
        let drained = tokio::time::timeout(timeout, async {
            for handle in pending.iter_mut() {
                log_join_result(handle.await);
            }
        })
        .await;

        if drained.is_err() {
            let unfinished = pending.iter().filter(|h| !h.is_finished()).count();
            error!(target: LOG_TARGET, "Timeout after {:?}; aborting {} unfinished tasks.", timeout, unfinished);
            for handle in &pending {
                handle.abort();
            }
        }
        info!(target: LOG_TARGET, "Task executor shutdown complete.");
    }
}

/// Keeps the running count accurate even when a task panics.
struct RunningGuard(Arc<AtomicUsize>);

impl RunningGuard {
    fn enter(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        RunningGuard(counter)
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn log_join_result(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            error!(target: LOG_TARGET, "Background task panicked: {:?}", e);
        } else if e.is_cancelled() {
            info!(target: LOG_TARGET, "Background task was cancelled.");
        } else {
            error!(target: LOG_TARGET, "Background task join error: {:?}", e);
        }
    }
}
