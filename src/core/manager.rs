//! The task manager: submission, the scheduler loop, execution and shutdown.
//!
//! # Scheduling model
//!
//! - `submit` places a task in the [`PriorityQueue`] and registers a `Pending`
//!   result. It fails fast with `QueueFull` and leaves no trace on failure.
//! - A single scheduler loop acquires a concurrency permit, pops the next task
//!   and spawns its execution as an independent activity. It never awaits a
//!   task's completion.
//! - The execution wrapper runs one attempt under the task's timeout, then
//!   settles the task or re-queues it at the front for a retry.
//!
//! A task is queued, running, or terminal, never two at once. Moves between
//! the queue and the running set happen under the queue lock (lock order:
//! queue, then running).
//!
//! # Example
//!
//! ```rust,ignore
//! use prometheus_task_scheduler::builders::ManagerBuilder;
//! use prometheus_task_scheduler::core::{Priority, TaskOptions};
//!
//! let manager = ManagerBuilder::new().with_max_concurrent_tasks(8).build::<String>()?;
//! manager.start()?;
//! let id = manager.submit(
//!     async { Ok("done".to_string()) },
//!     TaskOptions::new().with_priority(Priority::High),
//! )?;
//! let result = manager.wait_for_task(id, None).await?;
//! manager.stop().await;
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::process::Output;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::process::Command;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ManagerConfig;
use crate::core::callbacks::{
    callback_fn, invoke_guarded, CallbackRegistry, LifecycleEvent, SubscriptionId, TaskCallback,
};
use crate::core::metrics::{Metrics, MetricsSnapshot};
use crate::core::process_pool::ProcessPool;
use crate::core::task::{
    panic_message, QueuedTask, TaskFailure, TaskId, TaskOptions, TaskResult, TaskStatus,
    UnitOfWork, Work,
};
use crate::core::thread_pool::ThreadPool;
use crate::core::SchedulerError;
use crate::infra::{PriorityQueue, ResultStore};
use crate::runtime::TokioSpawner;

/// Handles of a running scheduler loop.
#[derive(Default)]
struct Lifecycle {
    loop_token: Option<CancellationToken>,
    loop_handle: Option<JoinHandle<()>>,
}

struct Shared<T> {
    config: ManagerConfig,
    queue: Mutex<PriorityQueue<T>>,
    /// Cancellation handles of tasks holding a concurrency permit.
    running: Mutex<HashMap<TaskId, CancellationToken>>,
    results: ResultStore<T>,
    limiter: Arc<Semaphore>,
    callbacks: CallbackRegistry<T>,
    metrics: Metrics,
    thread_pool: Arc<ThreadPool>,
    process_pool: ProcessPool,
    spawner: TokioSpawner,
    lifecycle: Mutex<Lifecycle>,
    /// Wakes an idle scheduler loop after a submission.
    wake: Notify,
    shut_down: AtomicBool,
}

/// Bounded-concurrency, priority-ordered task scheduler.
///
/// Cheap to clone; clones share the same scheduler.
pub struct TaskManager<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for TaskManager<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Outcome of one scheduler loop cycle.
enum Dispatch {
    Spawned,
    Idle,
    Stopped,
}

/// Outcome of one attempt.
enum Attempt<T> {
    Completed(T),
    Failed(TaskFailure),
    Cancelled,
}

impl<T> TaskManager<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a manager on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::InvalidConfig` for an invalid configuration or outside a runtime
    /// - `SchedulerError::Pool` if the thread pool cannot be started
    pub fn new(config: ManagerConfig) -> Result<Self, SchedulerError> {
        Self::with_spawner(config, TokioSpawner::try_current()?)
    }

    /// Create a manager that spawns its activities through `spawner`.
    ///
    /// # Errors
    ///
    /// Same as [`TaskManager::new`].
    pub fn with_spawner(config: ManagerConfig, spawner: TokioSpawner) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::InvalidConfig)?;

        let thread_pool = Arc::new(ThreadPool::new(config.thread_pool_config())?);
        let process_pool = ProcessPool::new(config.process_pool_size)?;

        info!(
            max_concurrent_tasks = config.max_concurrent_tasks,
            max_queue_size = config.max_queue_size,
            default_timeout_ms = ?config.default_timeout_ms,
            "task manager created"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(PriorityQueue::new(config.max_queue_size)),
                running: Mutex::new(HashMap::new()),
                results: ResultStore::new(config.history_capacity),
                limiter: Arc::new(Semaphore::new(config.max_concurrent_tasks)),
                callbacks: CallbackRegistry::new(),
                metrics: Metrics::default(),
                thread_pool,
                process_pool,
                spawner,
                lifecycle: Mutex::new(Lifecycle::default()),
                wake: Notify::new(),
                shut_down: AtomicBool::new(false),
                config,
            }),
        })
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &ManagerConfig {
        &self.shared.config
    }

    // ------------------------------------------------------------------
    // Submission
    // ------------------------------------------------------------------

    /// Queue a single-shot unit of work.
    ///
    /// Single-shot work cannot be retried; use [`TaskManager::submit_factory`]
    /// when `options.max_retries > 0`.
    ///
    /// # Errors
    ///
    /// See [`TaskManager::submit_work`].
    pub fn submit<F>(&self, fut: F, options: TaskOptions<T>) -> Result<TaskId, SchedulerError>
    where
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        self.submit_work(Work::once(fut), options)
    }

    /// Queue work built fresh by `factory` for every attempt.
    ///
    /// # Errors
    ///
    /// See [`TaskManager::submit_work`].
    pub fn submit_factory<F, Fut>(
        &self,
        factory: F,
        options: TaskOptions<T>,
    ) -> Result<TaskId, SchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        self.submit_work(Work::factory(factory), options)
    }

    /// Queue a task. Nothing changes when an error is returned.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::QueueFull` if the backlog is at capacity
    /// - `SchedulerError::InvalidTask` if retries are requested for single-shot work
    /// - `SchedulerError::ShutDown` after [`TaskManager::stop`]
    pub fn submit_work(&self, work: Work<T>, options: TaskOptions<T>) -> Result<TaskId, SchedulerError> {
        if self.shared.shut_down.load(Ordering::Acquire) {
            return Err(SchedulerError::ShutDown);
        }
        if options.max_retries > 0 && !work.is_restartable() {
            return Err(SchedulerError::InvalidTask(
                "retries require a work factory; use submit_factory".into(),
            ));
        }

        let task = QueuedTask::new(work, options, self.shared.config.default_timeout());
        let id = task.id();
        let priority = task.priority();
        {
            let mut queue = self.shared.queue.lock();
            if self.shared.shut_down.load(Ordering::Acquire) {
                return Err(SchedulerError::ShutDown);
            }
            self.shared.results.register(id);
            if let Err(e) = queue.push(task) {
                self.shared.results.forget(id);
                warn!(task_id = %id, priority = ?priority, error = %e, "submission rejected");
                return Err(e);
            }
        }

        self.shared.metrics.record_submitted();
        debug!(task_id = %id, priority = ?priority, "task queued");
        self.shared.wake.notify_one();
        Ok(id)
    }

    /// Submit and wait, returning the value or the final error.
    ///
    /// # Errors
    ///
    /// Submission errors, or the task's final `TaskTimeout`, `ExecutionFailure`
    /// or `Cancelled` outcome.
    pub async fn execute_task<F>(&self, fut: F, options: TaskOptions<T>) -> Result<T, SchedulerError>
    where
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let id = self.submit(fut, options)?;
        self.wait_for_task(id, None).await?.into_output()
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    /// Suspend until the task is terminal.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::UnknownTask` for an id this manager never issued
    /// - `SchedulerError::WaitTimeout` if `timeout` elapses first
    pub async fn wait_for_task(
        &self,
        id: TaskId,
        timeout: Option<Duration>,
    ) -> Result<TaskResult<T>, SchedulerError> {
        self.shared.results.wait(id, timeout).await
    }

    /// Current status of a task, or `None` if unknown.
    #[must_use]
    pub fn task_status(&self, id: TaskId) -> Option<TaskStatus> {
        let stored = self.shared.results.status(id)?;
        if stored.is_terminal() {
            return Some(stored);
        }
        if self.shared.running.lock().contains_key(&id) {
            return Some(TaskStatus::Running);
        }
        Some(stored)
    }

    /// Latest stored result of a task.
    #[must_use]
    pub fn result(&self, id: TaskId) -> Option<TaskResult<T>> {
        self.shared.results.get(id)
    }

    /// Terminal results in the order they were produced.
    #[must_use]
    pub fn history(&self) -> Vec<TaskResult<T>> {
        self.shared.results.history()
    }

    /// Number of pending tasks.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Number of tasks holding a concurrency permit.
    #[must_use]
    pub fn running_len(&self) -> usize {
        self.shared.running.lock().len()
    }

    /// Read-only counters snapshot.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        let running = self.running_len();
        let queued = self.queue_len();
        let completed_results = self.shared.results.count_status(TaskStatus::Completed);
        self.shared.metrics.snapshot(running, queued, completed_results)
    }

    // ------------------------------------------------------------------
    // Callbacks
    // ------------------------------------------------------------------

    /// Register a closure for a lifecycle event.
    pub fn add_callback<F>(&self, event: LifecycleEvent, f: F) -> SubscriptionId
    where
        F: Fn(&TaskResult<T>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.shared.callbacks.subscribe(event, callback_fn(f))
    }

    /// Register a subscriber for a lifecycle event.
    pub fn add_subscriber(
        &self,
        event: LifecycleEvent,
        subscriber: Arc<dyn TaskCallback<T>>,
    ) -> SubscriptionId {
        self.shared.callbacks.subscribe(event, subscriber)
    }

    /// Remove a subscriber. Returns whether it was registered.
    pub fn remove_callback(&self, event: LifecycleEvent, id: SubscriptionId) -> bool {
        self.shared.callbacks.unsubscribe(event, id)
    }

    // ------------------------------------------------------------------
    // Cancellation
    // ------------------------------------------------------------------

    /// Cancel a queued or running task.
    ///
    /// A queued task is removed and becomes `Cancelled` immediately, without
    /// running. A running task is signalled and becomes `Cancelled` at its next
    /// suspension point. Returns `false` if the task is neither.
    pub async fn cancel_task(&self, id: TaskId) -> bool {
        let queued = {
            let mut queue = self.shared.queue.lock();
            let queued = queue.remove(id);
            if queued.is_none() {
                let running = self.shared.running.lock();
                let Some(token) = running.get(&id) else {
                    return false;
                };
                token.cancel();
                debug!(task_id = %id, "cancellation requested for running task");
                return true;
            }
            queued
        };

        if let Some(task) = queued {
            cancel_queued(&self.shared, task).await;
        }
        true
    }

    /// Cancel every running task and drain the queue. Returns how many tasks were affected.
    pub async fn cancel_all_tasks(&self) -> usize {
        let (signalled, drained) = {
            let mut queue = self.shared.queue.lock();
            let running = self.shared.running.lock();
            for token in running.values() {
                token.cancel();
            }
            (running.len(), queue.drain())
        };

        let drained_count = drained.len();
        for task in drained {
            cancel_queued(&self.shared, task).await;
        }
        if signalled + drained_count > 0 {
            info!(running = signalled, queued = drained_count, "cancelled all tasks");
        }
        signalled + drained_count
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Launch the scheduler loop. Calling it again while running is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::ShutDown` after [`TaskManager::stop`].
    pub fn start(&self) -> Result<(), SchedulerError> {
        let mut lifecycle = self.shared.lifecycle.lock();
        if self.shared.shut_down.load(Ordering::Acquire) {
            return Err(SchedulerError::ShutDown);
        }
        if lifecycle.loop_handle.is_some() {
            return Ok(());
        }

        let token = CancellationToken::new();
        let handle = self
            .shared
            .spawner
            .spawn(run_loop(Arc::clone(&self.shared), token.clone()));
        lifecycle.loop_token = Some(token);
        lifecycle.loop_handle = Some(handle);

        info!(
            max_concurrent_tasks = self.shared.config.max_concurrent_tasks,
            "task manager started"
        );
        Ok(())
    }

    /// Whether the scheduler loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.shared.shut_down.load(Ordering::Acquire)
            && self.shared.lifecycle.lock().loop_handle.is_some()
    }

    /// Stop the manager. Terminal and idempotent.
    ///
    /// Stops the loop, cancels running and queued tasks, waits up to
    /// `shutdown_grace_ms` for running tasks to acknowledge, then shuts down
    /// the thread and process pools.
    pub async fn stop(&self) {
        if self.shared.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("stopping task manager");

        let (token, handle) = {
            let mut lifecycle = self.shared.lifecycle.lock();
            (lifecycle.loop_token.take(), lifecycle.loop_handle.take())
        };
        if let Some(token) = token {
            token.cancel();
        }
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "scheduler loop ended abnormally");
            }
        }

        let cancelled = self.cancel_all_tasks().await;

        let grace = self.shared.config.shutdown_grace();
        let slots = u32::try_from(self.shared.config.max_concurrent_tasks).unwrap_or(u32::MAX);
        match tokio::time::timeout(grace, self.shared.limiter.acquire_many(slots)).await {
            Ok(Ok(_all)) => debug!("running tasks drained"),
            Ok(Err(_)) => {}
            Err(_) => warn!(
                still_running = self.running_len(),
                grace_ms = self.shared.config.shutdown_grace_ms,
                "running tasks did not finish within grace period"
            ),
        }
        self.shared.limiter.close();

        let pool = Arc::clone(&self.shared.thread_pool);
        if let Err(e) = tokio::task::spawn_blocking(move || pool.shutdown()).await {
            warn!(error = %e, "thread pool shutdown failed");
        }
        self.shared.process_pool.shutdown(grace).await;

        info!(cancelled, "task manager stopped");
    }

    /// Start the manager, run `f`, and always stop afterwards.
    ///
    /// A panic inside `f` is resumed after the manager has stopped.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::ShutDown` if the manager was already stopped.
    pub async fn managed<F, Fut, R>(&self, f: F) -> Result<R, SchedulerError>
    where
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = R>,
    {
        self.start()?;
        let outcome = AssertUnwindSafe(f(self.clone())).catch_unwind().await;
        self.stop().await;
        match outcome {
            Ok(value) => Ok(value),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    // ------------------------------------------------------------------
    // Blocking work bridges
    // ------------------------------------------------------------------

    /// Run a blocking closure on the dedicated thread pool.
    ///
    /// # Errors
    ///
    /// `SchedulerError::Pool` if the pool is full, shut down, or the closure panicked.
    pub async fn run_in_thread<F, R>(&self, f: F) -> Result<R, SchedulerError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        Ok(self.shared.thread_pool.run(f).await?)
    }

    /// Run an external command through the process pool.
    ///
    /// # Errors
    ///
    /// `SchedulerError::Pool` if the pool is shut down or the command cannot be launched.
    pub async fn run_in_process(&self, command: Command) -> Result<Output, SchedulerError> {
        Ok(self.shared.process_pool.run(command).await?)
    }
}

// ----------------------------------------------------------------------
// Scheduler loop
// ----------------------------------------------------------------------

async fn run_loop<T>(shared: Arc<Shared<T>>, token: CancellationToken)
where
    T: Clone + Send + Sync + 'static,
{
    debug!("scheduler loop running");
    loop {
        let cycle = AssertUnwindSafe(dispatch_next(&shared, &token))
            .catch_unwind()
            .await;
        match cycle {
            Ok(Dispatch::Spawned) => {}
            Ok(Dispatch::Idle) => {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    () = shared.wake.notified() => {}
                    () = tokio::time::sleep(shared.config.poll_interval()) => {}
                }
            }
            Ok(Dispatch::Stopped) => break,
            Err(panic) => {
                error!(
                    panic = %panic_message(panic.as_ref()),
                    backoff_ms = shared.config.error_backoff_ms,
                    "scheduler loop cycle failed"
                );
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    () = tokio::time::sleep(shared.config.error_backoff()) => {}
                }
            }
        }
    }
    debug!("scheduler loop exited");
}

/// Take a permit, pop the next task and spawn its execution.
async fn dispatch_next<T>(shared: &Arc<Shared<T>>, token: &CancellationToken) -> Dispatch
where
    T: Clone + Send + Sync + 'static,
{
    let permit = tokio::select! {
        biased;
        () = token.cancelled() => return Dispatch::Stopped,
        permit = Arc::clone(&shared.limiter).acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => return Dispatch::Stopped,
        },
    };

    let (task, task_token) = {
        let mut queue = shared.queue.lock();
        if shared.shut_down.load(Ordering::Acquire) {
            return Dispatch::Stopped;
        }
        let Some(task) = queue.pop() else {
            return Dispatch::Idle;
        };
        let task_token = CancellationToken::new();
        shared.running.lock().insert(task.id, task_token.clone());
        (task, task_token)
    };

    debug!(
        task_id = %task.id,
        priority = ?task.priority,
        retry_count = task.retry_count,
        "task dispatched"
    );
    shared
        .spawner
        .spawn(execute(Arc::clone(shared), task, task_token, permit));
    Dispatch::Spawned
}

// ----------------------------------------------------------------------
// Execution wrapper
// ----------------------------------------------------------------------

async fn execute<T>(
    shared: Arc<Shared<T>>,
    mut task: QueuedTask<T>,
    token: CancellationToken,
    permit: OwnedSemaphorePermit,
) where
    T: Clone + Send + Sync + 'static,
{
    let id = task.id;
    let attempt = task.retry_count + 1;
    let started = TaskResult::running(id, attempt);
    shared.results.update(started.clone());
    shared
        .callbacks
        .notify(LifecycleEvent::TaskStarted, &started)
        .await;

    let work = task.work.next_attempt();
    let clock = Instant::now();
    let outcome = tokio::select! {
        biased;
        () = token.cancelled() => Attempt::Cancelled,
        outcome = run_attempt(work, task.timeout) => outcome,
    };
    let elapsed = clock.elapsed();

    let result = match outcome {
        Attempt::Completed(value) => {
            debug!(task_id = %id, attempt, elapsed_ms = elapsed_ms(elapsed), "task completed");
            started.settle(TaskStatus::Completed, elapsed).with_output(value)
        }
        Attempt::Cancelled => {
            info!(task_id = %id, attempt, "running task cancelled");
            started.settle(TaskStatus::Cancelled, elapsed)
        }
        Attempt::Failed(failure)
            if task.retry_count < task.max_retries && task.work.is_restartable() =>
        {
            task.retry_count += 1;
            warn!(
                task_id = %id,
                attempt,
                max_retries = task.max_retries,
                delay_ms = elapsed_ms(task.retry_delay),
                error = %failure,
                "task attempt failed, scheduling retry"
            );

            // The permit stays held through the delay.
            let cancelled = tokio::select! {
                biased;
                () = token.cancelled() => true,
                () = tokio::time::sleep(task.retry_delay) => false,
            };
            if !cancelled {
                match requeue(&shared, task, &token) {
                    Ok(()) => {
                        drop(permit);
                        shared.wake.notify_one();
                        return;
                    }
                    Err(returned) => task = returned,
                }
            }
            info!(task_id = %id, "task cancelled while waiting to retry");
            started.settle(TaskStatus::Cancelled, elapsed)
        }
        Attempt::Failed(failure) => {
            warn!(task_id = %id, attempt, error = %failure, "task failed");
            started.settle(TaskStatus::Failed, elapsed).with_error(failure)
        }
    };

    settle(&shared, task.callback.as_ref(), result).await;
    shared.running.lock().remove(&id);
    drop(permit);
}

/// Run one attempt under `limit`, containing errors and panics.
async fn run_attempt<T>(work: Option<UnitOfWork<T>>, limit: Option<Duration>) -> Attempt<T> {
    let Some(work) = work else {
        return Attempt::Failed(TaskFailure::error(anyhow::anyhow!(
            "unit of work was already consumed"
        )));
    };

    let guarded = AssertUnwindSafe(work).catch_unwind();
    let joined = match limit {
        Some(limit) => match tokio::time::timeout(limit, guarded).await {
            Ok(joined) => joined,
            Err(_) => return Attempt::Failed(TaskFailure::Timeout(limit)),
        },
        None => guarded.await,
    };

    match joined {
        Ok(Ok(value)) => Attempt::Completed(value),
        Ok(Err(e)) => Attempt::Failed(TaskFailure::error(e)),
        Err(panic) => Attempt::Failed(TaskFailure::error(anyhow::anyhow!(
            "task panicked: {}",
            panic_message(panic.as_ref())
        ))),
    }
}

/// Move a task from the running set back to the front of the queue.
///
/// Hands the task back if it was cancelled in the meantime.
fn requeue<T>(
    shared: &Shared<T>,
    task: QueuedTask<T>,
    token: &CancellationToken,
) -> Result<(), QueuedTask<T>>
where
    T: Clone + Send + Sync + 'static,
{
    let mut queue = shared.queue.lock();
    if token.is_cancelled() || shared.shut_down.load(Ordering::Acquire) {
        return Err(task);
    }
    shared.running.lock().remove(&task.id);
    shared
        .results
        .update(TaskResult::pending(task.id, task.retry_count));
    debug!(task_id = %task.id, retry_count = task.retry_count, "task re-queued at front");
    queue.push_front(task);
    Ok(())
}

/// Record a terminal result: metrics, store and history, lifecycle event, task callback.
async fn settle<T>(
    shared: &Shared<T>,
    callback: Option<&Arc<dyn TaskCallback<T>>>,
    result: TaskResult<T>,
) where
    T: Clone + Send + Sync + 'static,
{
    if !shared.results.complete(result.clone()) {
        warn!(task_id = %result.task_id, "task already had a terminal result");
        return;
    }

    match result.status {
        TaskStatus::Completed => shared
            .metrics
            .record_completed(result.execution_time.unwrap_or_default()),
        TaskStatus::Failed => shared.metrics.record_failed(),
        TaskStatus::Cancelled => shared.metrics.record_cancelled(),
        TaskStatus::Pending | TaskStatus::Running => {}
    }

    if let Some(event) = LifecycleEvent::for_terminal(result.status) {
        shared.callbacks.notify(event, &result).await;
    }
    if let Some(callback) = callback {
        invoke_guarded(callback.as_ref(), &result, "task_callback").await;
    }
}

async fn cancel_queued<T>(shared: &Shared<T>, task: QueuedTask<T>)
where
    T: Clone + Send + Sync + 'static,
{
    debug!(task_id = %task.id, "queued task cancelled");
    let result = TaskResult::cancelled(task.id, task.retry_count);
    settle(shared, task.callback.as_ref(), result).await;
}

fn elapsed_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
