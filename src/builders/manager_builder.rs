//! Builder assembling a [`TaskManager`] from configuration and overrides.

use std::time::Duration;

use crate::config::ManagerConfig;
use crate::core::{SchedulerError, TaskManager};
use crate::runtime::TokioSpawner;

/// Fluent builder for [`TaskManager`].
///
/// ```rust,ignore
/// let manager = ManagerBuilder::from_config(ManagerConfig::from_env()?)
///     .with_max_concurrent_tasks(16)
///     .with_default_timeout(Some(Duration::from_secs(30)))
///     .build::<Vec<u8>>()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManagerBuilder {
    config: ManagerConfig,
    spawner: Option<TokioSpawner>,
}

impl ManagerBuilder {
    /// Start from the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    #[must_use]
    pub const fn from_config(config: ManagerConfig) -> Self {
        Self {
            config,
            spawner: None,
        }
    }

    /// Configuration the manager will be built with.
    #[must_use]
    pub const fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Maximum tasks running at once.
    #[must_use]
    pub fn with_max_concurrent_tasks(mut self, max: usize) -> Self {
        self.config.max_concurrent_tasks = max;
        self
    }

    /// Maximum pending tasks.
    #[must_use]
    pub fn with_max_queue_size(mut self, max: usize) -> Self {
        self.config.max_queue_size = max;
        self
    }

    /// Attempt timeout for tasks that set none.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.default_timeout_ms =
            timeout.map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Worker threads for blocking work.
    #[must_use]
    pub fn with_thread_pool_size(mut self, size: usize) -> Self {
        self.config.thread_pool_size = size;
        self
    }

    /// Concurrent child processes.
    #[must_use]
    pub fn with_process_pool_size(mut self, size: usize) -> Self {
        self.config.process_pool_size = size;
        self
    }

    /// Idle sleep of the scheduler loop.
    #[must_use]
    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Drain bound used by `stop`.
    #[must_use]
    pub fn with_shutdown_grace_ms(mut self, ms: u64) -> Self {
        self.config.shutdown_grace_ms = ms;
        self
    }

    /// Terminal results kept in the history log.
    #[must_use]
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.config.history_capacity = capacity;
        self
    }

    /// Spawn the scheduler on a specific runtime instead of the current one.
    #[must_use]
    pub fn with_spawner(mut self, spawner: TokioSpawner) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Validate the configuration and create the manager.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::InvalidConfig` for invalid settings, or when no
    ///   spawner was given and no tokio runtime is current
    /// - `SchedulerError::Pool` if the thread pool cannot be started
    pub fn build<T>(self) -> Result<TaskManager<T>, SchedulerError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let spawner = match self.spawner {
            Some(spawner) => spawner,
            None => TokioSpawner::try_current()?,
        };
        TaskManager::with_spawner(self.config, spawner)
    }
}
