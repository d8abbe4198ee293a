//! Group, batch and retrying execution on top of a [`TaskManager`].

use std::future::Future;
use std::time::Duration;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::manager::TaskManager;
use crate::core::retry::RetryPolicy;
use crate::core::task::{
    Priority, TaskFailure, TaskOptions, TaskResult, TaskStatus, UnitOfWork, Work,
};
use crate::core::SchedulerError;

/// How a group reacts to a failed member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupFailurePolicy {
    /// Await every member and return all results.
    #[default]
    ContinueOnFailure,
    /// Stop at the first failed result and cancel the members not yet awaited.
    FailFast,
}

impl<T> TaskManager<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Submit every task, then await them in submission order.
    ///
    /// Under [`GroupFailurePolicy::FailFast`] the call returns at the first
    /// `Failed` result, after cancelling the remaining members. `timeout`
    /// becomes each member's own execution timeout and also bounds each
    /// individual wait; a member that is not terminal in time is reported as
    /// `Failed` with a timeout.
    ///
    /// # Errors
    ///
    /// Returns the submission error if any member is rejected. Members
    /// submitted before it are cancelled.
    pub async fn execute_task_group(
        &self,
        tasks: Vec<(UnitOfWork<T>, Priority)>,
        policy: GroupFailurePolicy,
        timeout: Option<Duration>,
    ) -> Result<Vec<TaskResult<T>>, SchedulerError> {
        let mut ids = Vec::with_capacity(tasks.len());
        for (work, priority) in tasks {
            let mut options = TaskOptions::new().with_priority(priority);
            if let Some(limit) = timeout {
                options = options.with_timeout(limit);
            }
            match self.submit_work(Work::Once(Some(work)), options) {
                Ok(id) => ids.push(id),
                Err(e) => {
                    warn!(submitted = ids.len(), error = %e, "group submission failed, cancelling members");
                    for id in &ids {
                        self.cancel_task(*id).await;
                    }
                    return Err(e);
                }
            }
        }

        let mut results = Vec::with_capacity(ids.len());
        for (idx, id) in ids.iter().enumerate() {
            let result = match self.wait_for_task(*id, timeout).await {
                Ok(result) => result,
                Err(SchedulerError::WaitTimeout(_)) => {
                    warn!(task_id = %id, "group member not finished before deadline");
                    TaskResult::unobserved(*id, TaskFailure::Timeout(timeout.unwrap_or_default()))
                }
                Err(e) => return Err(e),
            };
            let failed = result.status == TaskStatus::Failed;
            results.push(result);

            if failed && policy == GroupFailurePolicy::FailFast {
                let remaining = &ids[idx + 1..];
                debug!(task_id = %id, cancelling = remaining.len(), "group failing fast");
                for rest in remaining {
                    self.cancel_task(*rest).await;
                }
                break;
            }
        }
        Ok(results)
    }

    /// Process `items` in chunks of `batch_size`, one group per chunk, sequentially.
    ///
    /// Results are concatenated in item order.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::InvalidConfig` if `batch_size` is zero
    /// - any submission error from [`TaskManager::execute_task_group`]
    pub async fn execute_batch<I, P, Fut>(
        &self,
        items: Vec<I>,
        processor: P,
        batch_size: usize,
        priority: Priority,
    ) -> Result<Vec<TaskResult<T>>, SchedulerError>
    where
        P: Fn(I) -> Fut,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        if batch_size == 0 {
            return Err(SchedulerError::InvalidConfig(
                "batch_size must be greater than 0".into(),
            ));
        }

        let mut results = Vec::with_capacity(items.len());
        let mut items = items.into_iter().peekable();
        while items.peek().is_some() {
            let group: Vec<_> = items
                .by_ref()
                .take(batch_size)
                .map(|item| (processor(item).boxed(), priority))
                .collect();
            debug!(size = group.len(), "executing batch");
            results.extend(
                self.execute_task_group(group, GroupFailurePolicy::ContinueOnFailure, None)
                    .await?,
            );
        }
        Ok(results)
    }

    /// Run a fresh unit of work from `factory` through the queue until it
    /// succeeds or the policy's retry budget is spent.
    ///
    /// Each attempt is an ordinary queued task, so attempts never jump ahead
    /// of other pending work. `options.max_retries` is ignored.
    ///
    /// # Errors
    ///
    /// The last attempt's error, or the first non-retryable one.
    pub async fn execute_with_retry<F, Fut>(
        &self,
        factory: F,
        policy: &RetryPolicy,
        options: TaskOptions<T>,
    ) -> Result<T, SchedulerError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let options = TaskOptions {
            max_retries: 0,
            ..options
        };
        let mut attempt = 0;
        loop {
            match self.execute_task(factory(), options.clone()).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                    let delay = policy.delay_for(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_retries = policy.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "execution failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
