//! Native `ThreadPool` backed by dedicated OS threads.
//!
//! Workers block on a bounded crossbeam channel and exit when the sender is
//! dropped. Each job reports back through a tokio oneshot, so the submitting
//! task suspends without occupying a runtime thread.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::config::ThreadPoolConfig;
use crate::core::task::panic_message;

use super::{PoolCounters, PoolError, PoolStats};

/// A queued job. Returns whether the wrapped closure finished without panicking.
type Job = Box<dyn FnOnce() -> bool + Send + 'static>;

/// Fixed-size pool of named worker threads.
pub struct ThreadPool {
    /// Pool configuration.
    config: ThreadPoolConfig,

    /// Job sender. `None` once shut down, which unblocks idle workers.
    job_tx: Mutex<Option<Sender<Job>>>,

    /// Pool statistics counters.
    counters: Arc<PoolCounters>,

    /// Shutdown flag.
    shutdown: AtomicBool,

    /// Worker thread handles.
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl ThreadPool {
    /// Spawn `config.worker_count` worker threads.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidConfig` if the configuration is invalid
    /// - `PoolError::Internal` if a worker thread cannot be spawned
    pub fn new(config: ThreadPoolConfig) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;

        let (job_tx, job_rx) = bounded::<Job>(config.max_queue_depth);
        let counters = Arc::new(PoolCounters::default());

        let mut workers = Vec::with_capacity(config.worker_count);
        for worker_id in 0..config.worker_count {
            workers.push(spawn_worker(
                worker_id,
                job_rx.clone(),
                Arc::clone(&counters),
                config.thread_stack_size,
            )?);
        }

        info!(
            worker_count = config.worker_count,
            max_queue_depth = config.max_queue_depth,
            "thread pool initialized"
        );

        Ok(Self {
            config,
            job_tx: Mutex::new(Some(job_tx)),
            counters,
            shutdown: AtomicBool::new(false),
            workers: Mutex::new(workers),
        })
    }

    /// Enqueue a closure without waiting for it.
    ///
    /// The returned receiver resolves with the closure's value, or with
    /// `PoolError::Internal` if it panicked.
    ///
    /// # Errors
    ///
    /// - `PoolError::QueueFull` if the job queue is full
    /// - `PoolError::PoolShutdown` if the pool has been shut down
    pub fn submit<F, R>(&self, f: F) -> Result<oneshot::Receiver<Result<R, PoolError>>, PoolError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(PoolError::PoolShutdown);
        }

        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(f))
                .map_err(|payload| PoolError::Internal(panic_message(payload.as_ref())));
            let ok = outcome.is_ok();
            // The receiver may be gone if the caller stopped waiting.
            let _ = tx.send(outcome);
            ok
        });

        let guard = self.job_tx.lock();
        let Some(job_tx) = guard.as_ref() else {
            return Err(PoolError::PoolShutdown);
        };

        // Counted before the send so a fast worker never sees it at zero.
        self.counters.queued_jobs.fetch_add(1, Ordering::Relaxed);
        match job_tx.try_send(job) {
            Ok(()) => {
                self.counters.submitted_jobs.fetch_add(1, Ordering::Relaxed);
                Ok(rx)
            }
            Err(e) => {
                self.counters.queued_jobs.fetch_sub(1, Ordering::Relaxed);
                match e {
                    TrySendError::Full(_) => {
                        warn!(max_queue_depth = self.config.max_queue_depth, "thread pool queue is full");
                        Err(PoolError::QueueFull)
                    }
                    TrySendError::Disconnected(_) => Err(PoolError::PoolShutdown),
                }
            }
        }
    }

    /// Run a closure on a worker thread and await its value.
    ///
    /// # Errors
    ///
    /// Any error from [`ThreadPool::submit`], or `PoolError::Internal` if the
    /// closure panicked or its worker went away.
    pub async fn run<F, R>(&self, f: F) -> Result<R, PoolError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let rx = self.submit(f)?;
        rx.await
            .map_err(|_| PoolError::Internal("worker dropped the job".into()))?
    }

    /// Current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.counters.snapshot(self.config.worker_count)
    }

    /// Whether [`ThreadPool::shutdown`] has been called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Shut down the pool, joining each worker for at most `join_timeout_ms`.
    ///
    /// Workers finish the jobs already queued. Workers that do not exit in
    /// time are detached. Blocking; call from a blocking context.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }

        info!("shutting down thread pool");

        {
            let mut job_tx = self.job_tx.lock();
            *job_tx = None;
        }

        let join_timeout = Duration::from_millis(self.config.join_timeout_ms);
        let mut workers = self.workers.lock();
        let worker_count = workers.len();

        for (idx, worker) in workers.drain(..).enumerate() {
            let (tx, rx) = std::sync::mpsc::channel();
            let joiner = thread::spawn(move || {
                let joined = worker.join();
                let _ = tx.send(joined.is_ok());
            });

            match rx.recv_timeout(join_timeout) {
                Ok(true) => debug!(worker_id = idx, "worker joined"),
                Ok(false) => warn!(worker_id = idx, "worker panicked"),
                Err(_) => {
                    warn!(worker_id = idx, "worker did not exit within timeout, detaching");
                    drop(joiner);
                    continue;
                }
            }
            let _ = joiner.join();
        }

        info!(worker_count, "thread pool shut down");
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        // Close the channel but don't join; explicit shutdown() joins.
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            let mut job_tx = self.job_tx.lock();
            *job_tx = None;
            debug!("thread pool dropped without explicit shutdown, workers detached");
        }
    }
}

fn spawn_worker(
    worker_id: usize,
    job_rx: Receiver<Job>,
    counters: Arc<PoolCounters>,
    stack_size: usize,
) -> Result<JoinHandle<()>, PoolError> {
    thread::Builder::new()
        .name(format!("ts-worker-{worker_id}"))
        .stack_size(stack_size)
        .spawn(move || {
            debug!(worker_id, "worker thread started");

            // recv() fails once the sender is dropped.
            while let Ok(job) = job_rx.recv() {
                counters.queued_jobs.fetch_sub(1, Ordering::Relaxed);
                counters.active_jobs.fetch_add(1, Ordering::Relaxed);

                let ok = job();

                counters.active_jobs.fetch_sub(1, Ordering::Relaxed);
                if ok {
                    counters.completed_jobs.fetch_add(1, Ordering::Relaxed);
                } else {
                    counters.failed_jobs.fetch_add(1, Ordering::Relaxed);
                }
            }

            debug!(worker_id, "worker thread exiting");
        })
        .map_err(|e| PoolError::Internal(format!("failed to spawn worker {worker_id}: {e}")))
}
