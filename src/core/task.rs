//! Task records, priorities, statuses and results.
//!
//! A [`QueuedTask`] is owned by the pending queue until the scheduler loop
//! dequeues it, then by the execution wrapper. Its [`TaskResult`] lives in the
//! result store for the lifetime of the manager.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::callbacks::TaskCallback;
use crate::core::SchedulerError;
use crate::util::clock::now_ms;

/// Unique task identifier, generated at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Task priority. Higher variants are dequeued first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Background work.
    Low,
    /// Default priority.
    #[default]
    Medium,
    /// Latency-sensitive work.
    High,
    /// Must run before anything else.
    Critical,
}

/// Status of a task in the scheduler lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Queued waiting for a concurrency slot.
    Pending,
    /// Currently executing.
    Running,
    /// Finished successfully.
    Completed,
    /// Failed after exhausting its retries.
    Failed,
    /// Cancelled before or during execution.
    Cancelled,
}

impl TaskStatus {
    /// Terminal statuses never transition again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Classified failure of a single attempt.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskFailure {
    /// The attempt exceeded its timeout.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    /// The unit of work returned an error or panicked.
    #[error("{0:#}")]
    Error(Arc<anyhow::Error>),
}

impl TaskFailure {
    /// Wrap an error returned by a unit of work.
    #[must_use]
    pub fn error(err: anyhow::Error) -> Self {
        Self::Error(Arc::new(err))
    }

    /// Whether the failure was caused by a timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Latest known outcome of a task.
#[derive(Debug, Clone)]
pub struct TaskResult<T> {
    /// Identifier of the task this result belongs to.
    pub task_id: TaskId,
    /// Current status.
    pub status: TaskStatus,
    /// Output value, set when completed.
    pub output: Option<T>,
    /// Failure, set when failed.
    pub error: Option<TaskFailure>,
    /// Start of the last attempt (ms since epoch).
    pub started_at_ms: Option<u128>,
    /// Time the task became terminal (ms since epoch).
    pub finished_at_ms: Option<u128>,
    /// Duration of the last attempt.
    pub execution_time: Option<Duration>,
    /// Number of attempts that were started.
    pub attempts: u32,
}

impl<T> TaskResult<T> {
    pub(crate) const fn pending(task_id: TaskId, attempts: u32) -> Self {
        Self {
            task_id,
            status: TaskStatus::Pending,
            output: None,
            error: None,
            started_at_ms: None,
            finished_at_ms: None,
            execution_time: None,
            attempts,
        }
    }

    pub(crate) fn running(task_id: TaskId, attempts: u32) -> Self {
        Self {
            status: TaskStatus::Running,
            started_at_ms: Some(now_ms()),
            ..Self::pending(task_id, attempts)
        }
    }

    pub(crate) fn cancelled(task_id: TaskId, attempts: u32) -> Self {
        Self {
            status: TaskStatus::Cancelled,
            finished_at_ms: Some(now_ms()),
            ..Self::pending(task_id, attempts)
        }
    }

    /// A synthesized failure for a task whose outcome could not be observed.
    pub(crate) fn unobserved(task_id: TaskId, failure: TaskFailure) -> Self {
        Self {
            status: TaskStatus::Failed,
            error: Some(failure),
            finished_at_ms: Some(now_ms()),
            ..Self::pending(task_id, 0)
        }
    }

    pub(crate) fn settle(self, status: TaskStatus, elapsed: Duration) -> Self {
        Self {
            status,
            finished_at_ms: Some(now_ms()),
            execution_time: Some(elapsed),
            ..self
        }
    }

    pub(crate) fn with_output(mut self, output: T) -> Self {
        self.output = Some(output);
        self
    }

    pub(crate) fn with_error(mut self, failure: TaskFailure) -> Self {
        self.error = Some(failure);
        self
    }

    /// Whether the result is final.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Borrow the output of a completed task.
    #[must_use]
    pub const fn output(&self) -> Option<&T> {
        self.output.as_ref()
    }

    /// Convert a terminal result into the value or error a direct caller expects.
    ///
    /// # Errors
    ///
    /// - `TaskTimeout` / `ExecutionFailure` for failed tasks
    /// - `Cancelled` for cancelled tasks
    /// - `InvalidTask` if the result is not terminal yet
    pub fn into_output(self) -> Result<T, SchedulerError> {
        let id = self.task_id;
        match self.status {
            TaskStatus::Completed => self.output.ok_or_else(|| {
                SchedulerError::ExecutionFailure(Arc::new(anyhow::anyhow!(
                    "completed task {id} has no output"
                )))
            }),
            TaskStatus::Failed => Err(self.error.map_or_else(
                || {
                    SchedulerError::ExecutionFailure(Arc::new(anyhow::anyhow!(
                        "task {id} failed without an error"
                    )))
                },
                SchedulerError::from,
            )),
            TaskStatus::Cancelled => Err(SchedulerError::Cancelled(id)),
            TaskStatus::Pending | TaskStatus::Running => Err(SchedulerError::InvalidTask(
                format!("task {id} has not finished"),
            )),
        }
    }
}

/// A suspendable, cancellable computation. Not re-runnable once started.
pub type UnitOfWork<T> = BoxFuture<'static, anyhow::Result<T>>;

/// Produces a fresh unit of work for every attempt.
pub type WorkFactory<T> = Arc<dyn Fn() -> UnitOfWork<T> + Send + Sync>;

/// The work a task runs: a single-shot future, or a factory for retryable work.
pub enum Work<T> {
    /// Runs at most once.
    Once(Option<UnitOfWork<T>>),
    /// Builds a new future for each attempt.
    Factory(WorkFactory<T>),
}

impl<T> Work<T> {
    /// Wrap a single-shot future.
    pub fn once<F>(fut: F) -> Self
    where
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self::Once(Some(fut.boxed()))
    }

    /// Wrap a factory producing one future per attempt.
    pub fn factory<F, Fut>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self::Factory(Arc::new(move || factory().boxed()))
    }

    /// Whether another attempt can be produced after one has been consumed.
    #[must_use]
    pub const fn is_restartable(&self) -> bool {
        matches!(self, Self::Factory(_))
    }

    /// Take the unit of work for the next attempt, if any remains.
    pub fn next_attempt(&mut self) -> Option<UnitOfWork<T>> {
        match self {
            Self::Once(work) => work.take(),
            Self::Factory(factory) => Some(factory()),
        }
    }
}

/// Per-submission settings.
pub struct TaskOptions<T> {
    /// Queue priority.
    pub priority: Priority,
    /// Attempt timeout; `None` uses the manager default.
    pub timeout: Option<Duration>,
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    /// Delay before a failed attempt is re-queued.
    pub retry_delay: Duration,
    /// Invoked once with the terminal result.
    pub callback: Option<Arc<dyn TaskCallback<T>>>,
}

impl<T> TaskOptions<T> {
    /// Medium priority, manager default timeout, no retries, 1s retry delay.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            priority: Priority::Medium,
            timeout: None,
            max_retries: 0,
            retry_delay: Duration::from_secs(1),
            callback: None,
        }
    }

    /// Set the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the attempt timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the retry budget and the delay before each retry.
    #[must_use]
    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    /// Attach a completion callback.
    #[must_use]
    pub fn with_callback(mut self, callback: Arc<dyn TaskCallback<T>>) -> Self {
        self.callback = Some(callback);
        self
    }
}

impl<T> Default for TaskOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for TaskOptions<T> {
    fn clone(&self) -> Self {
        Self {
            priority: self.priority,
            timeout: self.timeout,
            max_retries: self.max_retries,
            retry_delay: self.retry_delay,
            callback: self.callback.clone(),
        }
    }
}

/// A submitted task waiting in, or dequeued from, the pending queue.
pub struct QueuedTask<T> {
    pub(crate) id: TaskId,
    pub(crate) priority: Priority,
    pub(crate) created_at_ms: u128,
    pub(crate) timeout: Option<Duration>,
    pub(crate) retry_count: u32,
    pub(crate) max_retries: u32,
    pub(crate) retry_delay: Duration,
    pub(crate) callback: Option<Arc<dyn TaskCallback<T>>>,
    pub(crate) work: Work<T>,
    /// Arrival order, assigned by the queue.
    pub(crate) seq: u64,
}

impl<T> QueuedTask<T> {
    /// Build a task record with a fresh identifier.
    ///
    /// `default_timeout` applies when the options carry no timeout.
    #[must_use]
    pub fn new(work: Work<T>, options: TaskOptions<T>, default_timeout: Option<Duration>) -> Self {
        Self {
            id: TaskId::new(),
            priority: options.priority,
            created_at_ms: now_ms(),
            timeout: options.timeout.or(default_timeout),
            retry_count: 0,
            max_retries: options.max_retries,
            retry_delay: options.retry_delay,
            callback: options.callback,
            work,
            seq: 0,
        }
    }

    /// Task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Queue priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Creation timestamp (ms since epoch).
    #[must_use]
    pub const fn created_at_ms(&self) -> u128 {
        self.created_at_ms
    }

    /// Retries consumed so far.
    #[must_use]
    pub const fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Effective attempt timeout.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl<T> fmt::Debug for QueuedTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedTask")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("seq", &self.seq)
            .field("retry_count", &self.retry_count)
            .field("max_retries", &self.max_retries)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".into())
}
