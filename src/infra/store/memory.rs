//! In-memory result store with per-task notification.
//!
//! Every registered task owns a `watch` channel holding its latest
//! [`TaskResult`]. Waiters subscribe and wait for a terminal value; the
//! channel checks the current value before sleeping, so a result stored
//! between lookup and wait is never missed.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;

use crate::core::task::{TaskId, TaskResult, TaskStatus};
use crate::core::SchedulerError;

/// Latest result per task plus a bounded, append-only history of terminal results.
pub struct ResultStore<T> {
    slots: RwLock<HashMap<TaskId, watch::Sender<TaskResult<T>>>>,
    history: Mutex<VecDeque<TaskResult<T>>>,
    history_capacity: usize,
}

impl<T> ResultStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an empty store keeping at most `history_capacity` history entries.
    #[must_use]
    pub fn new(history_capacity: usize) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            history: Mutex::new(VecDeque::new()),
            history_capacity,
        }
    }

    /// Create a `Pending` slot for a new task.
    pub fn register(&self, id: TaskId) {
        let (tx, _rx) = watch::channel(TaskResult::pending(id, 0));
        self.slots.write().insert(id, tx);
    }

    /// Drop a slot that never became visible (rejected submission).
    pub fn forget(&self, id: TaskId) {
        self.slots.write().remove(&id);
    }

    /// Whether the id was ever registered.
    #[must_use]
    pub fn contains(&self, id: TaskId) -> bool {
        self.slots.read().contains_key(&id)
    }

    /// Replace a non-terminal result. Ignored once the task is terminal.
    pub fn update(&self, result: TaskResult<T>) -> bool {
        debug_assert!(!result.is_terminal());
        let slots = self.slots.read();
        let Some(tx) = slots.get(&result.task_id) else {
            return false;
        };
        tx.send_if_modified(|current| {
            if current.is_terminal() {
                false
            } else {
                *current = result;
                true
            }
        })
    }

    /// Store the terminal result and wake every waiter.
    ///
    /// Returns `false` if the task already had a terminal result, in which
    /// case nothing changes.
    pub fn complete(&self, result: TaskResult<T>) -> bool {
        debug_assert!(result.is_terminal());
        let recorded = result.clone();
        let stored = {
            let slots = self.slots.read();
            let Some(tx) = slots.get(&result.task_id) else {
                return false;
            };
            tx.send_if_modified(|current| {
                if current.is_terminal() {
                    false
                } else {
                    *current = result;
                    true
                }
            })
        };
        if stored {
            let mut history = self.history.lock();
            if history.len() >= self.history_capacity {
                history.pop_front();
            }
            history.push_back(recorded);
        }
        stored
    }

    /// Latest result for a task.
    #[must_use]
    pub fn get(&self, id: TaskId) -> Option<TaskResult<T>> {
        self.slots.read().get(&id).map(|tx| tx.borrow().clone())
    }

    /// Latest status for a task.
    #[must_use]
    pub fn status(&self, id: TaskId) -> Option<TaskStatus> {
        self.slots.read().get(&id).map(|tx| tx.borrow().status)
    }

    /// Number of stored results with the given status.
    #[must_use]
    pub fn count_status(&self, status: TaskStatus) -> usize {
        self.slots
            .read()
            .values()
            .filter(|tx| tx.borrow().status == status)
            .count()
    }

    /// Terminal results in the order they were stored.
    #[must_use]
    pub fn history(&self) -> Vec<TaskResult<T>> {
        self.history.lock().iter().cloned().collect()
    }

    /// Suspend until the task is terminal, or until `timeout` elapses.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::UnknownTask` if the id was never registered
    /// - `SchedulerError::WaitTimeout` if the deadline elapses first
    pub async fn wait(
        &self,
        id: TaskId,
        timeout: Option<Duration>,
    ) -> Result<TaskResult<T>, SchedulerError> {
        let mut rx = self
            .slots
            .read()
            .get(&id)
            .map(watch::Sender::subscribe)
            .ok_or(SchedulerError::UnknownTask(id))?;

        let terminal = async move {
            rx.wait_for(TaskResult::is_terminal)
                .await
                .map(|seen| TaskResult::clone(&seen))
                .map_err(|_| SchedulerError::UnknownTask(id))
        };

        match timeout {
            Some(limit) => tokio::time::timeout(limit, terminal)
                .await
                .map_err(|_| SchedulerError::WaitTimeout(id))?,
            None => terminal.await,
        }
    }
}
