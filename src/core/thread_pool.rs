//! Bounded pool of dedicated OS threads for blocking or CPU-bound closures.
//!
//! The scheduler never runs blocking work on its own runtime threads. Callers
//! bridge such work through [`ThreadPool::run`], which suspends only the
//! calling task until a worker thread has produced the result.
//!
//! # Example
//!
//! ```rust,ignore
//! use prometheus_task_scheduler::core::ThreadPool;
//! use prometheus_task_scheduler::config::ThreadPoolConfig;
//!
//! let pool = ThreadPool::new(ThreadPoolConfig::new().with_worker_count(4))?;
//! let digest = pool.run(move || sha256(&bytes)).await?;
//! ```

mod native;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Errors from the thread and process pools.
#[derive(Debug, Clone)]
pub enum PoolError {
    /// The job queue is full; no more jobs can be accepted.
    QueueFull,

    /// The operation timed out.
    Timeout,

    /// The pool has been shut down.
    PoolShutdown,

    /// Configuration validation failed.
    InvalidConfig(String),

    /// Internal error (job panic, spawn failure, lost worker, etc.).
    Internal(String),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueFull => write!(f, "job queue is full"),
            Self::Timeout => write!(f, "operation timed out"),
            Self::PoolShutdown => write!(f, "pool has been shut down"),
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for PoolError {}

/// Statistics about pool utilization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of worker threads or process slots.
    pub worker_count: usize,

    /// Currently executing jobs.
    pub active_jobs: u64,

    /// Jobs waiting for a worker.
    pub queued_jobs: u64,

    /// Jobs that returned normally.
    pub completed_jobs: u64,

    /// Jobs that panicked or failed to launch.
    pub failed_jobs: u64,

    /// Jobs accepted by the pool.
    pub submitted_jobs: u64,
}

/// Lock-free counters shared between a pool and its workers.
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub active_jobs: AtomicU64,
    pub queued_jobs: AtomicU64,
    pub completed_jobs: AtomicU64,
    pub failed_jobs: AtomicU64,
    pub submitted_jobs: AtomicU64,
}

impl PoolCounters {
    /// Get a snapshot of current statistics.
    pub fn snapshot(&self, worker_count: usize) -> PoolStats {
        PoolStats {
            worker_count,
            active_jobs: self.active_jobs.load(Ordering::Relaxed),
            queued_jobs: self.queued_jobs.load(Ordering::Relaxed),
            completed_jobs: self.completed_jobs.load(Ordering::Relaxed),
            failed_jobs: self.failed_jobs.load(Ordering::Relaxed),
            submitted_jobs: self.submitted_jobs.load(Ordering::Relaxed),
        }
    }
}

pub use native::ThreadPool;
