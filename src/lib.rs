//! # Prometheus Task Scheduler
//!
//! An in-process, bounded-concurrency, priority-ordered async task scheduler.
//!
//! Callers submit units of work with a priority, an optional timeout and a
//! retry budget. A single scheduler loop moves tasks from the pending queue
//! into execution whenever a concurrency slot is free; each task runs as an
//! independent tokio task and ends in exactly one terminal result.
//!
//! ## Key Features
//!
//! - **Strict priority ordering**: `Critical > High > Medium > Low`, FIFO within a priority
//! - **Bounded concurrency**: a semaphore caps simultaneously running tasks
//! - **Retries**: failed attempts are re-queued at the front after a delay
//! - **Cooperative cancellation**: queued tasks are dropped, running ones stop at their next await
//! - **Groups and batches**: await a set of tasks under a fail-fast or continue policy
//! - **Lifecycle events**: typed subscribers for started/completed/failed/cancelled
//! - **Blocking work bridges**: dedicated OS-thread pool and bounded process pool
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use prometheus_task_scheduler::builders::ManagerBuilder;
//! use prometheus_task_scheduler::core::{LifecycleEvent, Priority, TaskOptions};
//!
//! let manager = ManagerBuilder::new()
//!     .with_max_concurrent_tasks(4)
//!     .build::<String>()?;
//!
//! manager.add_callback(LifecycleEvent::TaskFailed, |result| {
//!     tracing::warn!(task_id = %result.task_id, "task failed");
//!     Ok(())
//! });
//!
//! manager.managed(|m| async move {
//!     let id = m.submit_factory(
//!         || async { fetch_report().await },
//!         TaskOptions::new()
//!             .with_priority(Priority::High)
//!             .with_timeout(Duration::from_secs(10))
//!             .with_retries(2, Duration::from_millis(500)),
//!     )?;
//!     m.wait_for_task(id, None).await
//! }).await??;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions: tasks, the manager, retries and delegated pools.
pub mod core;
/// Configuration models for the manager and its pools.
pub mod config;
/// Builders to construct scheduler components from configuration.
pub mod builders;
/// In-process storage for pending tasks and results.
pub mod infra;
/// Runtime adapters.
pub mod runtime;
/// Shared utilities.
pub mod util;

pub use crate::builders::ManagerBuilder;
pub use crate::config::ManagerConfig;
pub use crate::core::{
    GroupFailurePolicy, LifecycleEvent, Priority, SchedulerError, TaskId, TaskManager,
    TaskOptions, TaskResult, TaskStatus,
};
