//! Thread pool configuration.

use serde::{Deserialize, Serialize};

/// Configuration for [`crate::core::ThreadPool`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadPoolConfig {
    /// Number of dedicated worker threads.
    pub worker_count: usize,
    /// Maximum jobs waiting for a worker before rejection.
    pub max_queue_depth: usize,
    /// Stack size for each worker thread, in bytes.
    pub thread_stack_size: usize,
    /// How long shutdown waits for each worker to exit, in milliseconds.
    pub join_timeout_ms: u64,
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get(),
            max_queue_depth: 1024,
            thread_stack_size: 2 * 1024 * 1024,
            join_timeout_ms: 2_000,
        }
    }
}

impl ThreadPoolConfig {
    /// One worker per logical CPU, 1024 queued jobs, 2 MiB stacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of worker threads.
    #[must_use]
    pub const fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    /// Set the maximum queue depth.
    #[must_use]
    pub const fn with_max_queue_depth(mut self, depth: usize) -> Self {
        self.max_queue_depth = depth;
        self
    }

    /// Set the worker thread stack size.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = bytes;
        self
    }

    /// Set the per-worker join timeout.
    #[must_use]
    pub const fn with_join_timeout_ms(mut self, ms: u64) -> Self {
        self.join_timeout_ms = ms;
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error string naming the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count == 0 {
            return Err("worker_count must be greater than 0".into());
        }
        if self.max_queue_depth == 0 {
            return Err("max_queue_depth must be greater than 0".into());
        }
        if self.thread_stack_size < 64 * 1024 {
            return Err("thread_stack_size must be at least 64 KiB".into());
        }
        Ok(())
    }
}
