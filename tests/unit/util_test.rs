//! Tests for task identifiers, priorities and options

use std::time::Duration;

use prometheus_task_scheduler::core::{LifecycleEvent, Priority, TaskId, TaskOptions};
use prometheus_task_scheduler::util::{init_tracing, now_ms};

#[test]
fn test_priority_ordering() {
    assert!(Priority::Critical > Priority::High);
    assert!(Priority::High > Priority::Medium);
    assert!(Priority::Medium > Priority::Low);
    assert_eq!(Priority::default(), Priority::Medium);
}

#[test]
fn test_priority_serde_names() {
    assert_eq!(serde_json::to_string(&Priority::Critical).unwrap(), "\"critical\"");
    let parsed: Priority = serde_json::from_str("\"low\"").unwrap();
    assert_eq!(parsed, Priority::Low);
}

#[test]
fn test_task_id_display_matches_uuid() {
    let id = TaskId::new();
    assert_eq!(id.to_string(), id.as_uuid().to_string());
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{id}\""));
}

#[test]
fn test_lifecycle_event_names() {
    let names: Vec<_> = LifecycleEvent::ALL.iter().map(ToString::to_string).collect();
    assert_eq!(
        names,
        vec!["task_started", "task_completed", "task_failed", "task_cancelled"]
    );
}

#[test]
fn test_task_options_defaults() {
    let options = TaskOptions::<()>::new();
    assert_eq!(options.priority, Priority::Medium);
    assert_eq!(options.timeout, None);
    assert_eq!(options.max_retries, 0);
    assert_eq!(options.retry_delay, Duration::from_secs(1));
    assert!(options.callback.is_none());
}

#[test]
fn test_now_ms() {
    let before = now_ms();
    std::thread::sleep(Duration::from_millis(2));
    assert!(now_ms() > before);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    tracing::info!("tracing initialized");
}
