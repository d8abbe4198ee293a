//! Tests for tokio spawner utilities

use prometheus_task_scheduler::runtime::TokioSpawner;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_spawner_spawn() {
    let spawner = TokioSpawner::new(tokio::runtime::Handle::current());

    let (tx, rx) = tokio::sync::oneshot::channel();
    spawner.spawn(async move {
        tx.send(123).unwrap();
    });

    let result = rx.await.expect("oneshot result");
    assert_eq!(result, 123);
}

#[tokio::test]
async fn test_try_current_inside_runtime() {
    let spawner = TokioSpawner::try_current().unwrap();
    let value = spawner.spawn(async { 7 }).await.unwrap();
    assert_eq!(value, 7);
}

#[test]
fn test_try_current_outside_runtime() {
    assert!(TokioSpawner::try_current().is_err());
}

#[test]
fn test_spawner_for_foreign_runtime() {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap();
    let spawner = TokioSpawner::new(rt.handle().clone());

    let handle = spawner.spawn(async { "spawned" });
    assert_eq!(rt.block_on(handle).unwrap(), "spawned");
}
