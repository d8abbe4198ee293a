//! Core scheduling abstractions: tasks, the manager, retries and delegated pools.

pub mod callbacks;
pub mod error;
pub mod group;
pub mod manager;
pub mod metrics;
pub mod process_pool;
pub mod retry;
pub mod task;
pub mod thread_pool;

pub use callbacks::{callback_fn, CallbackRegistry, FnCallback, LifecycleEvent, SubscriptionId, TaskCallback};
pub use error::{AppResult, SchedulerError};
pub use group::GroupFailurePolicy;
pub use manager::TaskManager;
pub use metrics::MetricsSnapshot;
pub use process_pool::ProcessPool;
pub use retry::{retry_on_failure, with_timeout, RetryPolicy};
pub use task::{
    Priority, QueuedTask, TaskFailure, TaskId, TaskOptions, TaskResult, TaskStatus, UnitOfWork,
    Work, WorkFactory,
};
pub use thread_pool::{PoolError, PoolStats, ThreadPool};
