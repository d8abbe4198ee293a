//! Scheduler counters and point-in-time snapshots.

use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

/// Point-in-time view of scheduler counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Tasks accepted by `submit`.
    pub total_tasks: u64,
    /// Tasks that reached `Completed`.
    pub completed_tasks: u64,
    /// Tasks that reached `Failed`.
    pub failed_tasks: u64,
    /// Tasks that reached `Cancelled`.
    pub cancelled_tasks: u64,
    /// Tasks holding a concurrency slot right now.
    pub running_tasks: usize,
    /// Tasks waiting in the pending queue.
    pub queued_tasks: usize,
    /// Stored results with status `Completed`.
    pub completed_results: usize,
    /// Running mean of successful attempt durations.
    pub average_execution_time_ms: f64,
}

impl MetricsSnapshot {
    /// Flatten into a string-keyed JSON map.
    #[must_use]
    pub fn to_map(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    total: u64,
    completed: u64,
    failed: u64,
    cancelled: u64,
    average_ms: f64,
}

/// Shared counters updated by the engine.
#[derive(Debug, Default)]
pub(crate) struct Metrics {
    counters: Mutex<Counters>,
}

impl Metrics {
    pub(crate) fn record_submitted(&self) {
        self.counters.lock().total += 1;
    }

    /// Count a completion and fold its duration into the running mean.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn record_completed(&self, elapsed: Duration) {
        let mut c = self.counters.lock();
        c.completed += 1;
        let n = c.completed as f64;
        let sample = elapsed.as_secs_f64() * 1000.0;
        c.average_ms = c.average_ms.mul_add(n - 1.0, sample) / n;
    }

    pub(crate) fn record_failed(&self) {
        self.counters.lock().failed += 1;
    }

    pub(crate) fn record_cancelled(&self) {
        self.counters.lock().cancelled += 1;
    }

    pub(crate) fn snapshot(
        &self,
        running_tasks: usize,
        queued_tasks: usize,
        completed_results: usize,
    ) -> MetricsSnapshot {
        let c = self.counters.lock();
        MetricsSnapshot {
            total_tasks: c.total,
            completed_tasks: c.completed,
            failed_tasks: c.failed,
            cancelled_tasks: c.cancelled,
            running_tasks,
            queued_tasks,
            completed_results,
            average_execution_time_ms: c.average_ms,
        }
    }
}
