//! In-memory pending queue with priority ordering and a retry front lane.

use std::cmp::Reverse;
use std::collections::{BTreeMap, VecDeque};

use crate::core::task::{Priority, QueuedTask, TaskId};
use crate::core::SchedulerError;

/// Ordering key: highest priority first, then arrival order.
type OrderKey = (Reverse<Priority>, u64);

/// Pending tasks ordered by (priority desc, arrival asc).
///
/// Tasks re-queued for a retry go to a separate front lane that is always
/// served before prioritized entries, most recent retry first.
pub struct PriorityQueue<T> {
    capacity: usize,
    next_seq: u64,
    /// Retried tasks, served first.
    front: VecDeque<QueuedTask<T>>,
    /// O(log n) insert, pop-first and keyed removal.
    ordered: BTreeMap<OrderKey, QueuedTask<T>>,
}

impl<T> PriorityQueue<T> {
    /// Create an empty queue that admits up to `capacity` new submissions.
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            next_seq: 0,
            front: VecDeque::new(),
            ordered: BTreeMap::new(),
        }
    }

    /// Insert a new submission in priority order.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::QueueFull` when the backlog is at capacity.
    /// The queue is left unchanged.
    pub fn push(&mut self, mut task: QueuedTask<T>) -> Result<(), SchedulerError> {
        if self.len() >= self.capacity {
            return Err(SchedulerError::QueueFull {
                capacity: self.capacity,
            });
        }
        task.seq = self.next_seq;
        self.next_seq += 1;
        self.ordered.insert((Reverse(task.priority), task.seq), task);
        Ok(())
    }

    /// Put a retried task at the very front. Never rejected.
    pub fn push_front(&mut self, task: QueuedTask<T>) {
        self.front.push_front(task);
    }

    /// Remove and return the next task to run.
    pub fn pop(&mut self) -> Option<QueuedTask<T>> {
        self.front
            .pop_front()
            .or_else(|| self.ordered.pop_first().map(|(_, task)| task))
    }

    /// Remove a specific pending task.
    pub fn remove(&mut self, id: TaskId) -> Option<QueuedTask<T>> {
        if let Some(pos) = self.front.iter().position(|t| t.id == id) {
            return self.front.remove(pos);
        }
        let key = self
            .ordered
            .iter()
            .find(|(_, t)| t.id == id)
            .map(|(key, _)| *key)?;
        self.ordered.remove(&key)
    }

    /// Whether a task is pending.
    #[must_use]
    pub fn contains(&self, id: TaskId) -> bool {
        self.iter().any(|t| t.id == id)
    }

    /// Remove every pending task, in dequeue order.
    pub fn drain(&mut self) -> Vec<QueuedTask<T>> {
        let mut drained: Vec<_> = self.front.drain(..).collect();
        drained.extend(std::mem::take(&mut self.ordered).into_values());
        drained
    }

    /// Pending tasks in dequeue order.
    pub fn iter(&self) -> impl Iterator<Item = &QueuedTask<T>> {
        self.front.iter().chain(self.ordered.values())
    }

    /// Number of pending tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.front.len() + self.ordered.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}
