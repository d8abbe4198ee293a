//! Error types for scheduler operations.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::core::task::{TaskFailure, TaskId};
use crate::core::thread_pool::PoolError;

/// Errors produced by the task manager and its coordinators.
#[derive(Debug, Clone, Error)]
pub enum SchedulerError {
    /// Submission rejected because the pending backlog is at capacity.
    #[error("queue full: capacity {capacity} reached")]
    QueueFull {
        /// Configured queue capacity.
        capacity: usize,
    },
    /// The unit of work exceeded its allotted duration.
    #[error("task timed out after {0:?}")]
    TaskTimeout(Duration),
    /// The unit of work returned an error or panicked.
    #[error("execution failure: {0:#}")]
    ExecutionFailure(Arc<anyhow::Error>),
    /// The task reached the cancelled terminal state.
    #[error("task {0} cancelled")]
    Cancelled(TaskId),
    /// The identifier is not known to this manager.
    #[error("unknown task: {0}")]
    UnknownTask(TaskId),
    /// A waiter's deadline elapsed before the task became terminal.
    #[error("timed out waiting for task {0}")]
    WaitTimeout(TaskId),
    /// The manager has been stopped.
    #[error("scheduler is shut down")]
    ShutDown,
    /// The submission is malformed.
    #[error("invalid task: {0}")]
    InvalidTask(String),
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A delegated thread or process pool failed.
    #[error("pool error: {0}")]
    Pool(#[from] PoolError),
}

impl SchedulerError {
    /// Whether a caller-side retry loop should try again after this error.
    ///
    /// Cancellation is terminal and never retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::QueueFull { .. } | Self::TaskTimeout(_) | Self::ExecutionFailure(_)
        )
    }
}

impl From<TaskFailure> for SchedulerError {
    fn from(failure: TaskFailure) -> Self {
        match failure {
            TaskFailure::Timeout(limit) => Self::TaskTimeout(limit),
            TaskFailure::Error(err) => Self::ExecutionFailure(err),
        }
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(SchedulerError::QueueFull { capacity: 1 }.is_retryable());
        assert!(SchedulerError::TaskTimeout(Duration::from_millis(5)).is_retryable());
        assert!(SchedulerError::ExecutionFailure(Arc::new(anyhow::anyhow!("boom"))).is_retryable());
        assert!(!SchedulerError::Cancelled(TaskId::new()).is_retryable());
        assert!(!SchedulerError::ShutDown.is_retryable());
    }

    #[test]
    fn test_failure_conversion() {
        let err: SchedulerError = TaskFailure::Timeout(Duration::from_millis(100)).into();
        assert!(matches!(err, SchedulerError::TaskTimeout(d) if d == Duration::from_millis(100)));

        let err: SchedulerError = TaskFailure::error(anyhow::anyhow!("disk on fire")).into();
        assert_eq!(err.to_string(), "execution failure: disk on fire");
    }
}
