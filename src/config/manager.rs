//! Task manager configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ThreadPoolConfig;

const ENV_PREFIX: &str = "TASK_SCHEDULER_";

/// Settings for a [`crate::core::TaskManager`].
///
/// Every field has a default, so partial JSON documents are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Maximum tasks running at once.
    pub max_concurrent_tasks: usize,
    /// Maximum pending tasks before `submit` fails with `QueueFull`.
    pub max_queue_size: usize,
    /// Attempt timeout for tasks that set none. `None` disables it.
    pub default_timeout_ms: Option<u64>,
    /// Worker threads in the blocking-work pool.
    pub thread_pool_size: usize,
    /// Jobs the thread pool queues before rejecting.
    pub thread_queue_depth: usize,
    /// Concurrent child processes in the process pool.
    pub process_pool_size: usize,
    /// Idle sleep of the scheduler loop.
    pub poll_interval_ms: u64,
    /// Pause after an unexpected scheduler loop fault.
    pub error_backoff_ms: u64,
    /// Upper bound on the drain of running tasks during `stop`.
    pub shutdown_grace_ms: u64,
    /// Terminal results kept in the history log.
    pub history_capacity: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 100,
            max_queue_size: 1000,
            default_timeout_ms: Some(300_000),
            thread_pool_size: 10,
            thread_queue_depth: 1024,
            process_pool_size: 4,
            poll_interval_ms: 10,
            error_backoff_ms: 1000,
            shutdown_grace_ms: 30_000,
            history_capacity: 10_000,
        }
    }
}

impl ManagerConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default attempt timeout as a `Duration`.
    #[must_use]
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms.map(Duration::from_millis)
    }

    /// Idle sleep of the scheduler loop.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Pause after a scheduler loop fault.
    #[must_use]
    pub const fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }

    /// Drain bound used by `stop`.
    #[must_use]
    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Thread pool settings derived from this configuration.
    #[must_use]
    pub fn thread_pool_config(&self) -> ThreadPoolConfig {
        ThreadPoolConfig::new()
            .with_worker_count(self.thread_pool_size)
            .with_max_queue_depth(self.thread_queue_depth)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error string naming the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_tasks == 0 {
            return Err("max_concurrent_tasks must be greater than 0".into());
        }
        if self.max_concurrent_tasks > tokio::sync::Semaphore::MAX_PERMITS {
            return Err(format!(
                "max_concurrent_tasks must not exceed {}",
                tokio::sync::Semaphore::MAX_PERMITS
            ));
        }
        if u32::try_from(self.max_concurrent_tasks).is_err() {
            return Err("max_concurrent_tasks must fit in u32".into());
        }
        if self.max_queue_size == 0 {
            return Err("max_queue_size must be greater than 0".into());
        }
        if self.default_timeout_ms == Some(0) {
            return Err("default_timeout_ms must be greater than 0 when set".into());
        }
        if self.process_pool_size == 0 {
            return Err("process_pool_size must be greater than 0".into());
        }
        if self.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be greater than 0".into());
        }
        if self.history_capacity == 0 {
            return Err("history_capacity must be greater than 0".into());
        }
        self.thread_pool_config()
            .validate()
            .map_err(|e| format!("thread pool invalid: {e}"))
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns an error string on parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load `TASK_SCHEDULER_*` variables (and a `.env` file, if present) over the defaults.
    ///
    /// `TASK_SCHEDULER_DEFAULT_TIMEOUT_MS=0` disables the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error string if a variable does not parse or the result is invalid.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<V: std::str::FromStr>(
            lookup: &dyn Fn(&str) -> Option<String>,
            name: &str,
            slot: &mut V,
        ) -> Result<(), String>
        where
            V::Err: std::fmt::Display,
        {
            let key = format!("{ENV_PREFIX}{name}");
            if let Some(raw) = lookup(&key) {
                *slot = raw
                    .trim()
                    .parse()
                    .map_err(|e| format!("{key}: invalid value `{raw}`: {e}"))?;
            }
            Ok(())
        }

        let mut cfg = Self::default();
        parse(&lookup, "MAX_CONCURRENT_TASKS", &mut cfg.max_concurrent_tasks)?;
        parse(&lookup, "MAX_QUEUE_SIZE", &mut cfg.max_queue_size)?;
        parse(&lookup, "THREAD_POOL_SIZE", &mut cfg.thread_pool_size)?;
        parse(&lookup, "THREAD_QUEUE_DEPTH", &mut cfg.thread_queue_depth)?;
        parse(&lookup, "PROCESS_POOL_SIZE", &mut cfg.process_pool_size)?;
        parse(&lookup, "POLL_INTERVAL_MS", &mut cfg.poll_interval_ms)?;
        parse(&lookup, "ERROR_BACKOFF_MS", &mut cfg.error_backoff_ms)?;
        parse(&lookup, "SHUTDOWN_GRACE_MS", &mut cfg.shutdown_grace_ms)?;
        parse(&lookup, "HISTORY_CAPACITY", &mut cfg.history_capacity)?;

        let mut timeout_ms = cfg.default_timeout_ms.unwrap_or(0);
        parse(&lookup, "DEFAULT_TIMEOUT_MS", &mut timeout_ms)?;
        cfg.default_timeout_ms = (timeout_ms > 0).then_some(timeout_ms);

        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = ManagerConfig::default();
        assert_eq!(cfg.max_concurrent_tasks, 100);
        assert_eq!(cfg.max_queue_size, 1000);
        assert_eq!(cfg.default_timeout(), Some(Duration::from_secs(300)));
        assert_eq!(cfg.thread_pool_size, 10);
        assert_eq!(cfg.process_pool_size, 4);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg = ManagerConfig::from_json_str(r#"{"max_concurrent_tasks": 4}"#).unwrap();
        assert_eq!(cfg.max_concurrent_tasks, 4);
        assert_eq!(cfg.max_queue_size, 1000);
    }

    #[test]
    fn test_json_rejects_invalid_values() {
        let err = ManagerConfig::from_json_str(r#"{"max_queue_size": 0}"#).unwrap_err();
        assert!(err.contains("max_queue_size"));
        assert!(ManagerConfig::from_json_str("not json").unwrap_err().starts_with("parse error"));
    }

    #[test]
    fn test_env_overrides() {
        let cfg = ManagerConfig::from_lookup(lookup_from(&[
            ("TASK_SCHEDULER_MAX_CONCURRENT_TASKS", "8"),
            ("TASK_SCHEDULER_DEFAULT_TIMEOUT_MS", "0"),
            ("TASK_SCHEDULER_POLL_INTERVAL_MS", " 5 "),
        ]))
        .unwrap();
        assert_eq!(cfg.max_concurrent_tasks, 8);
        assert_eq!(cfg.default_timeout_ms, None);
        assert_eq!(cfg.poll_interval(), Duration::from_millis(5));
    }

    #[test]
    fn test_env_rejects_garbage() {
        let err = ManagerConfig::from_lookup(lookup_from(&[(
            "TASK_SCHEDULER_MAX_QUEUE_SIZE",
            "lots",
        )]))
        .unwrap_err();
        assert!(err.starts_with("TASK_SCHEDULER_MAX_QUEUE_SIZE"));
    }
}
