//! Integration tests for the blocking-work bridges.
//!
//! These tests validate:
//! - Values, panics and streaming results from worker threads
//! - Concurrent submission from many async tasks
//! - Queue depth limits
//! - Graceful shutdown of the thread pool
//! - The bounded process pool

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;

use prometheus_task_scheduler::config::ThreadPoolConfig;
use prometheus_task_scheduler::core::{PoolError, ProcessPool, ThreadPool};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn make_pool(workers: usize, depth: usize) -> Arc<ThreadPool> {
    Arc::new(
        ThreadPool::new(
            ThreadPoolConfig::new()
                .with_worker_count(workers)
                .with_max_queue_depth(depth)
                .with_join_timeout_ms(1_000),
        )
        .unwrap(),
    )
}

async fn shutdown(pool: Arc<ThreadPool>) {
    tokio::task::spawn_blocking(move || pool.shutdown())
        .await
        .unwrap();
}

/// Tracks how many jobs run at once.
#[derive(Clone, Default)]
struct ConcurrencyProbe {
    current: Arc<AtomicU64>,
    peak: Arc<AtomicU64>,
    executed: Arc<AtomicU64>,
}

impl ConcurrencyProbe {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
        self.executed.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// BASIC EXECUTION
// ============================================================================

#[tokio::test]
async fn test_basic_execution() {
    let pool = make_pool(2, 16);

    let sum = pool.run(|| (1..=10).sum::<u32>()).await.unwrap();
    assert_eq!(sum, 55);

    let stats = pool.stats();
    assert_eq!(stats.worker_count, 2);
    assert_eq!(stats.submitted_jobs, 1);
    shutdown(pool).await;
}

#[tokio::test]
async fn test_cpu_bound_job_does_not_block_runtime() {
    let pool = make_pool(1, 4);

    let heavy = {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move {
            pool.run(|| {
                let start = Instant::now();
                let mut acc = 0_u64;
                while start.elapsed() < Duration::from_millis(100) {
                    acc = acc.wrapping_add(1);
                }
                acc
            })
            .await
        })
    };

    // The current-thread runtime keeps making progress while the job spins.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!heavy.is_finished());

    assert!(heavy.await.unwrap().unwrap() > 0);
    shutdown(pool).await;
}

#[tokio::test]
async fn test_panicking_job_reports_internal_error() {
    let pool = make_pool(1, 4);

    let err = pool
        .run(|| -> String { panic!("tokenizer crashed") })
        .await
        .unwrap_err();
    assert!(matches!(err, PoolError::Internal(ref msg) if msg.contains("tokenizer crashed")));
    assert_eq!(err.to_string(), "internal error: tokenizer crashed");

    assert_eq!(pool.run(|| "still alive").await.unwrap(), "still alive");
    shutdown(Arc::clone(&pool)).await;
    let stats = pool.stats();
    assert_eq!(stats.failed_jobs, 1);
    assert_eq!(stats.completed_jobs, 1);
}

// ============================================================================
// STREAMING RESULTS
// ============================================================================

#[tokio::test]
async fn test_streaming_results_through_channel() {
    let pool = make_pool(2, 4);
    let (tx, rx) = flume::unbounded::<String>();

    let producer = pool
        .submit(move || {
            for i in 0..5 {
                std::thread::sleep(Duration::from_millis(5));
                if tx.send(format!("chunk_{i}")).is_err() {
                    return i;
                }
            }
            5
        })
        .unwrap();

    let mut received = Vec::new();
    while let Ok(chunk) = rx.recv_async().await {
        received.push(chunk);
    }

    assert_eq!(producer.await.unwrap().unwrap(), 5);
    assert_eq!(
        received,
        vec!["chunk_0", "chunk_1", "chunk_2", "chunk_3", "chunk_4"]
    );
    shutdown(pool).await;
}

// ============================================================================
// CONCURRENCY
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submission() {
    const WORKERS: usize = 4;
    let pool = make_pool(WORKERS, 128);
    let probe = ConcurrencyProbe::default();

    let mut handles = Vec::new();
    for i in 0..40_u64 {
        let pool = Arc::clone(&pool);
        let probe = probe.clone();
        let pause = rand::rng().random_range(1..10);
        handles.push(tokio::spawn(async move {
            pool.run(move || {
                probe.enter();
                std::thread::sleep(Duration::from_millis(pause));
                probe.exit();
                i * 2
            })
            .await
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.await.unwrap().unwrap(), i as u64 * 2);
    }

    assert_eq!(probe.executed.load(Ordering::SeqCst), 40);
    assert!(probe.peak.load(Ordering::SeqCst) <= WORKERS as u64);
    assert_eq!(pool.stats().completed_jobs, 40);
    shutdown(pool).await;
}

#[tokio::test]
async fn test_queue_depth_limit() {
    let pool = make_pool(1, 1);
    let (release_tx, release_rx) = flume::bounded::<()>(1);

    let blocker = pool
        .submit(move || {
            let _ = release_rx.recv();
        })
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(2);
    while pool.stats().active_jobs == 0 && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(pool.stats().active_jobs, 1);

    let queued = pool.submit(|| 7).unwrap();
    assert!(matches!(pool.submit(|| 8), Err(PoolError::QueueFull)));
    assert_eq!(pool.stats().queued_jobs, 1);

    release_tx.send(()).unwrap();
    blocker.await.unwrap().unwrap();
    assert_eq!(queued.await.unwrap().unwrap(), 7);
    shutdown(pool).await;
}

// ============================================================================
// SHUTDOWN
// ============================================================================

#[tokio::test]
async fn test_shutdown_finishes_queued_jobs() {
    let pool = make_pool(1, 16);

    let receivers: Vec<_> = (0..5_u32)
        .map(|i| {
            pool.submit(move || {
                std::thread::sleep(Duration::from_millis(5));
                i
            })
            .unwrap()
        })
        .collect();

    shutdown(Arc::clone(&pool)).await;
    assert!(pool.is_shutdown());

    for (i, rx) in receivers.into_iter().enumerate() {
        assert_eq!(rx.await.unwrap().unwrap(), i as u32);
    }
    assert!(matches!(pool.run(|| 1).await, Err(PoolError::PoolShutdown)));
}

#[test]
fn test_invalid_config_rejected() {
    let err = ThreadPool::new(ThreadPoolConfig::new().with_worker_count(0))
        .err()
        .unwrap();
    assert!(matches!(err, PoolError::InvalidConfig(_)));

    let err = ThreadPool::new(ThreadPoolConfig::new().with_thread_stack_size(1024))
        .err()
        .unwrap();
    assert!(matches!(err, PoolError::InvalidConfig(_)));
}

// ============================================================================
// PROCESS POOL
// ============================================================================

#[cfg(unix)]
#[tokio::test]
async fn test_process_pool_runs_commands() {
    let pool = ProcessPool::new(2).unwrap();

    let mut commands = Vec::new();
    for word in ["alpha", "beta", "gamma"] {
        let mut cmd = tokio::process::Command::new("echo");
        cmd.arg(word);
        commands.push(pool.run(cmd));
    }
    let outputs = futures::future::join_all(commands).await;

    let words: Vec<String> = outputs
        .into_iter()
        .map(|out| String::from_utf8(out.unwrap().stdout).unwrap().trim().to_string())
        .collect();
    assert_eq!(words, vec!["alpha", "beta", "gamma"]);
    assert_eq!(pool.stats().completed_jobs, 3);

    pool.shutdown(Duration::from_secs(1)).await;
    let err = pool
        .run(tokio::process::Command::new("echo"))
        .await
        .unwrap_err();
    assert!(matches!(err, PoolError::PoolShutdown));
}

#[test]
fn test_process_pool_rejects_zero_slots() {
    assert!(matches!(ProcessPool::new(0), Err(PoolError::InvalidConfig(_))));
}
