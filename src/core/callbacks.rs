//! Lifecycle events and best-effort callback fan-out.
//!
//! Subscribers register for one [`LifecycleEvent`] kind and receive the task's
//! [`TaskResult`] when that event fires. A subscriber that errors or panics is
//! logged and skipped; it never interrupts the engine or other subscribers.

use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::core::task::{panic_message, TaskResult, TaskStatus};

/// Lifecycle events a subscriber can register for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// An attempt is about to run.
    TaskStarted,
    /// The task completed successfully.
    TaskCompleted,
    /// The task failed after exhausting its retries.
    TaskFailed,
    /// The task was cancelled.
    TaskCancelled,
}

impl LifecycleEvent {
    /// Every event kind.
    pub const ALL: [Self; 4] = [
        Self::TaskStarted,
        Self::TaskCompleted,
        Self::TaskFailed,
        Self::TaskCancelled,
    ];

    /// Stable name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TaskStarted => "task_started",
            Self::TaskCompleted => "task_completed",
            Self::TaskFailed => "task_failed",
            Self::TaskCancelled => "task_cancelled",
        }
    }

    /// The event that announces a terminal status.
    #[must_use]
    pub const fn for_terminal(status: TaskStatus) -> Option<Self> {
        match status {
            TaskStatus::Completed => Some(Self::TaskCompleted),
            TaskStatus::Failed => Some(Self::TaskFailed),
            TaskStatus::Cancelled => Some(Self::TaskCancelled),
            TaskStatus::Pending | TaskStatus::Running => None,
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives task results for lifecycle events and per-task completion.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use prometheus_task_scheduler::core::{TaskCallback, TaskResult};
///
/// struct Audit;
///
/// #[async_trait]
/// impl TaskCallback<String> for Audit {
///     async fn on_result(&self, result: &TaskResult<String>) -> anyhow::Result<()> {
///         tracing::info!(task_id = %result.task_id, status = ?result.status, "audited");
///         Ok(())
///     }
///
///     fn name(&self) -> &'static str { "audit" }
/// }
/// ```
#[async_trait]
pub trait TaskCallback<T>: Send + Sync + 'static {
    /// Handle a result. Errors are logged by the caller and otherwise ignored.
    async fn on_result(&self, result: &TaskResult<T>) -> anyhow::Result<()>;

    /// Name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Adapter turning a synchronous closure into a [`TaskCallback`].
pub struct FnCallback<F>(F);

#[async_trait]
impl<T, F> TaskCallback<T> for FnCallback<F>
where
    T: Send + Sync + 'static,
    F: Fn(&TaskResult<T>) -> anyhow::Result<()> + Send + Sync + 'static,
{
    async fn on_result(&self, result: &TaskResult<T>) -> anyhow::Result<()> {
        (self.0)(result)
    }

    fn name(&self) -> &'static str {
        "fn_callback"
    }
}

/// Wrap a closure as a shareable callback.
pub fn callback_fn<T, F>(f: F) -> Arc<dyn TaskCallback<T>>
where
    T: Send + Sync + 'static,
    F: Fn(&TaskResult<T>) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(FnCallback(f))
}

/// Handle returned on registration, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Subscribers<T> = Vec<(SubscriptionId, Arc<dyn TaskCallback<T>>)>;

/// Typed subscriber lists, one per [`LifecycleEvent`].
pub struct CallbackRegistry<T> {
    subscribers: RwLock<HashMap<LifecycleEvent, Subscribers<T>>>,
    next_id: AtomicU64,
}

impl<T> CallbackRegistry<T>
where
    T: Send + Sync + 'static,
{
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register a subscriber for one event kind.
    pub fn subscribe(
        &self,
        event: LifecycleEvent,
        callback: Arc<dyn TaskCallback<T>>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .write()
            .entry(event)
            .or_default()
            .push((id, callback));
        id
    }

    /// Remove a subscriber. Returns whether it was registered for `event`.
    pub fn unsubscribe(&self, event: LifecycleEvent, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let Some(list) = subscribers.get_mut(&event) else {
            return false;
        };
        let before = list.len();
        list.retain(|(sub, _)| *sub != id);
        before != list.len()
    }

    /// Number of subscribers for an event kind.
    #[must_use]
    pub fn len(&self, event: LifecycleEvent) -> usize {
        self.subscribers.read().get(&event).map_or(0, Vec::len)
    }

    /// Invoke every subscriber of `event` in registration order.
    pub async fn notify(&self, event: LifecycleEvent, result: &TaskResult<T>) {
        // Snapshot so the lock is not held across subscriber awaits.
        let subscribers: Vec<Arc<dyn TaskCallback<T>>> = self
            .subscribers
            .read()
            .get(&event)
            .map(|list| list.iter().map(|(_, cb)| Arc::clone(cb)).collect())
            .unwrap_or_default();

        for subscriber in subscribers {
            invoke_guarded(subscriber.as_ref(), result, event.as_str()).await;
        }
    }
}

impl<T> Default for CallbackRegistry<T>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Run a callback, logging and swallowing errors and panics.
pub(crate) async fn invoke_guarded<T>(
    callback: &dyn TaskCallback<T>,
    result: &TaskResult<T>,
    context: &str,
) where
    T: Send + Sync + 'static,
{
    match AssertUnwindSafe(callback.on_result(result))
        .catch_unwind()
        .await
    {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(
            task_id = %result.task_id,
            callback = callback.name(),
            context,
            error = %e,
            "callback failed"
        ),
        Err(panic) => error!(
            task_id = %result.task_id,
            callback = callback.name(),
            context,
            panic = %panic_message(panic.as_ref()),
            "callback panicked"
        ),
    }
}
