//! Tests for error types

use std::sync::Arc;
use std::time::Duration;

use prometheus_task_scheduler::core::{PoolError, SchedulerError, TaskFailure, TaskId};

#[test]
fn test_queue_full_error() {
    let err = SchedulerError::QueueFull { capacity: 10 };
    assert_eq!(format!("{}", err), "queue full: capacity 10 reached");
    assert!(err.is_retryable());
}

#[test]
fn test_shut_down_error() {
    let err = SchedulerError::ShutDown;
    assert_eq!(format!("{}", err), "scheduler is shut down");
    assert!(!err.is_retryable());
}

#[test]
fn test_cancelled_is_not_retryable() {
    let err = SchedulerError::Cancelled(TaskId::new());
    assert!(!err.is_retryable());
    assert!(format!("{}", err).ends_with("cancelled"));
}

#[test]
fn test_execution_failure_keeps_context() {
    let source = anyhow::anyhow!("connection reset").context("fetching report");
    let err = SchedulerError::ExecutionFailure(Arc::new(source));
    assert_eq!(
        format!("{}", err),
        "execution failure: fetching report: connection reset"
    );
    assert!(err.is_retryable());
}

#[test]
fn test_pool_error_conversion() {
    let err: SchedulerError = PoolError::QueueFull.into();
    assert!(matches!(err, SchedulerError::Pool(PoolError::QueueFull)));
    assert_eq!(format!("{}", err), "pool error: job queue is full");
}

#[test]
fn test_task_failure_conversion() {
    let timeout: SchedulerError = TaskFailure::Timeout(Duration::from_millis(250)).into();
    assert!(matches!(timeout, SchedulerError::TaskTimeout(d) if d == Duration::from_millis(250)));

    let failure: SchedulerError = TaskFailure::error(anyhow::anyhow!("bad row")).into();
    assert!(matches!(failure, SchedulerError::ExecutionFailure(_)));
}
