//! Tests for builders

use std::time::Duration;

use prometheus_task_scheduler::builders::ManagerBuilder;
use prometheus_task_scheduler::config::ManagerConfig;
use prometheus_task_scheduler::core::{SchedulerError, TaskManager, TaskOptions, TaskStatus};
use prometheus_task_scheduler::runtime::TokioSpawner;

#[tokio::test]
async fn test_manager_builder() {
    let manager: TaskManager<String> = ManagerBuilder::new()
        .with_max_concurrent_tasks(2)
        .with_max_queue_size(8)
        .with_default_timeout(Some(Duration::from_secs(1)))
        .with_thread_pool_size(1)
        .with_process_pool_size(1)
        .with_poll_interval_ms(5)
        .with_shutdown_grace_ms(500)
        .build()
        .unwrap();

    assert_eq!(manager.config().max_concurrent_tasks, 2);
    assert_eq!(manager.config().default_timeout_ms, Some(1_000));
    assert!(!manager.is_running());

    manager.start().unwrap();
    let value = manager
        .execute_task(async { Ok("built".to_string()) }, TaskOptions::new())
        .await
        .unwrap();
    assert_eq!(value, "built");
    manager.stop().await;
}

#[tokio::test]
async fn test_builder_from_config() {
    let config = ManagerConfig {
        max_concurrent_tasks: 3,
        thread_pool_size: 1,
        ..ManagerConfig::default()
    };
    let builder = ManagerBuilder::from_config(config.clone());
    assert_eq!(builder.config(), &config);

    let manager = builder.build::<u8>().unwrap();
    assert_eq!(manager.config(), &config);
    manager.stop().await;
}

#[tokio::test]
async fn test_builder_rejects_invalid_settings() {
    let err = ManagerBuilder::new()
        .with_max_queue_size(0)
        .build::<u8>()
        .err()
        .unwrap();
    assert!(matches!(err, SchedulerError::InvalidConfig(_)));

    let err = ManagerBuilder::new()
        .with_process_pool_size(0)
        .build::<u8>()
        .err()
        .unwrap();
    assert!(matches!(err, SchedulerError::InvalidConfig(_)));
}

#[test]
fn test_builder_with_explicit_spawner() {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();

    // Built outside any runtime context.
    let manager = ManagerBuilder::new()
        .with_max_concurrent_tasks(1)
        .with_thread_pool_size(1)
        .with_spawner(TokioSpawner::new(rt.handle().clone()))
        .build::<u32>()
        .unwrap();

    rt.block_on(async {
        manager.start().unwrap();
        let id = manager.submit(async { Ok(11) }, TaskOptions::new()).unwrap();
        let result = manager
            .wait_for_task(id, Some(Duration::from_secs(5)))
            .await
            .unwrap();
        assert_eq!(result.status, TaskStatus::Completed);
        assert_eq!(result.output, Some(11));
        manager.stop().await;
    });
}
