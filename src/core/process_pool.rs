//! Bounded pool for running external commands.
//!
//! At most `size` child processes run at once; further callers suspend on the
//! pool's semaphore. Children are killed if the awaiting future is dropped.

use std::process::Output;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::core::thread_pool::{PoolCounters, PoolError, PoolStats};

/// Limits concurrently running child processes.
pub struct ProcessPool {
    size: usize,
    permits: Arc<Semaphore>,
    counters: PoolCounters,
}

impl ProcessPool {
    /// Create a pool allowing `size` concurrent children.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::InvalidConfig` if `size` is zero.
    pub fn new(size: usize) -> Result<Self, PoolError> {
        if size == 0 {
            return Err(PoolError::InvalidConfig(
                "process pool size must be greater than 0".into(),
            ));
        }
        Ok(Self {
            size,
            permits: Arc::new(Semaphore::new(size)),
            counters: PoolCounters::default(),
        })
    }

    /// Run `command` to completion and collect its output.
    ///
    /// # Errors
    ///
    /// - `PoolError::PoolShutdown` once the pool is shut down
    /// - `PoolError::Internal` if the command cannot be launched
    pub async fn run(&self, mut command: Command) -> Result<Output, PoolError> {
        self.counters.submitted_jobs.fetch_add(1, Ordering::Relaxed);
        self.counters.queued_jobs.fetch_add(1, Ordering::Relaxed);
        let permit = self.permits.acquire().await;
        self.counters.queued_jobs.fetch_sub(1, Ordering::Relaxed);
        let _permit = permit.map_err(|_| PoolError::PoolShutdown)?;

        self.counters.active_jobs.fetch_add(1, Ordering::Relaxed);
        debug!(program = ?command.as_std().get_program(), "launching child process");
        let output = command.kill_on_drop(true).output().await;
        self.counters.active_jobs.fetch_sub(1, Ordering::Relaxed);

        match output {
            Ok(output) => {
                self.counters.completed_jobs.fetch_add(1, Ordering::Relaxed);
                Ok(output)
            }
            Err(e) => {
                self.counters.failed_jobs.fetch_add(1, Ordering::Relaxed);
                Err(PoolError::Internal(format!("failed to run command: {e}")))
            }
        }
    }

    /// Current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.counters.snapshot(self.size)
    }

    /// Wait up to `grace` for running children, then refuse new ones.
    pub async fn shutdown(&self, grace: Duration) {
        if self.permits.is_closed() {
            return;
        }
        let size = u32::try_from(self.size).unwrap_or(u32::MAX);
        match tokio::time::timeout(grace, self.permits.acquire_many(size)).await {
            Ok(Ok(all)) => drop(all),
            Ok(Err(_)) => {}
            Err(_) => warn!(
                active = self.counters.active_jobs.load(Ordering::Relaxed),
                "process pool did not drain within grace period"
            ),
        }
        self.permits.close();
        info!("process pool shut down");
    }
}
