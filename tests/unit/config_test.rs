//! Tests for configuration validation

use std::time::Duration;

use prometheus_task_scheduler::config::{ManagerConfig, ThreadPoolConfig};

#[test]
fn test_manager_config_defaults_are_valid() {
    let config = ManagerConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.max_concurrent_tasks, 100);
    assert_eq!(config.max_queue_size, 1000);
    assert_eq!(config.default_timeout(), Some(Duration::from_secs(300)));
    assert_eq!(config.poll_interval(), Duration::from_millis(10));
    assert_eq!(config.error_backoff(), Duration::from_secs(1));
}

#[test]
fn test_manager_config_invalid_concurrency() {
    let invalid = ManagerConfig {
        max_concurrent_tasks: 0,
        ..ManagerConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_manager_config_invalid_queue_size() {
    let invalid = ManagerConfig {
        max_queue_size: 0,
        ..ManagerConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_manager_config_zero_timeout_rejected() {
    let invalid = ManagerConfig {
        default_timeout_ms: Some(0),
        ..ManagerConfig::default()
    };
    assert!(invalid.validate().is_err());

    let disabled = ManagerConfig {
        default_timeout_ms: None,
        ..ManagerConfig::default()
    };
    assert!(disabled.validate().is_ok());
    assert_eq!(disabled.default_timeout(), None);
}

#[test]
fn test_manager_config_from_json() {
    let config = ManagerConfig::from_json_str(
        r#"{"max_concurrent_tasks": 4, "default_timeout_ms": null, "history_capacity": 50}"#,
    )
    .unwrap();
    assert_eq!(config.max_concurrent_tasks, 4);
    assert_eq!(config.default_timeout_ms, None);
    assert_eq!(config.history_capacity, 50);
    assert_eq!(config.max_queue_size, 1000);

    assert!(ManagerConfig::from_json_str(r#"{"max_queue_size": 0}"#).is_err());
    assert!(ManagerConfig::from_json_str("not json").is_err());
}

#[test]
fn test_manager_config_thread_pool_settings() {
    let config = ManagerConfig {
        thread_pool_size: 3,
        thread_queue_depth: 9,
        ..ManagerConfig::default()
    };
    let pool = config.thread_pool_config();
    assert_eq!(pool.worker_count, 3);
    assert_eq!(pool.max_queue_depth, 9);
}

#[test]
fn test_thread_pool_config_validation() {
    assert!(ThreadPoolConfig::new().validate().is_ok());
    assert!(ThreadPoolConfig::new().with_worker_count(0).validate().is_err());
    assert!(ThreadPoolConfig::new().with_max_queue_depth(0).validate().is_err());
    assert!(ThreadPoolConfig::new()
        .with_thread_stack_size(4096)
        .validate()
        .is_err());
}

#[test]
fn test_thread_pool_config_partial_json() {
    let config: ThreadPoolConfig = serde_json::from_str(r#"{"worker_count": 2}"#).unwrap();
    assert_eq!(config.worker_count, 2);
    assert_eq!(config.max_queue_depth, 1024);
    assert_eq!(config.join_timeout_ms, 2_000);
}
