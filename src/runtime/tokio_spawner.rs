//! Tokio runtime spawner used for the scheduler loop and task activities.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::core::SchedulerError;

/// Spawns futures on a specific tokio runtime.
#[derive(Clone, Debug)]
pub struct TokioSpawner {
    handle: Arc<tokio::runtime::Handle>,
}

impl TokioSpawner {
    /// Create a spawner from a tokio runtime handle.
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self {
            handle: Arc::new(handle),
        }
    }

    /// Use the runtime the caller is running on.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidConfig` when called outside a tokio runtime.
    pub fn try_current() -> Result<Self, SchedulerError> {
        tokio::runtime::Handle::try_current()
            .map(Self::new)
            .map_err(|e| SchedulerError::InvalidConfig(format!("no tokio runtime: {e}")))
    }

    /// Spawn a future and return its join handle.
    pub fn spawn<F>(&self, fut: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(fut)
    }

    /// The underlying runtime handle.
    #[must_use]
    pub fn handle(&self) -> &tokio::runtime::Handle {
        &self.handle
    }
}
