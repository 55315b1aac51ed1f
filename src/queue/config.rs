use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What happens to tasks still queued when a queue is stopped.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopPolicy {
    /// Run every task accepted before `stop`, then exit.
    #[default]
    Drain,
    /// Drop queued tasks. Waiting callers receive `QueueError::Closed`.
    Discard,
}

/// Per-queue configuration.
///
/// Can be built in code or read from JSON:
///
/// ```
/// use service_queue::{QueueConfig, StopPolicy};
///
/// let config: QueueConfig =
///     serde_json::from_str(r#"{ "stop_policy": "discard", "call_timeout_ms": 250 }"#).unwrap();
/// assert_eq!(config.stop_policy, StopPolicy::Discard);
/// assert_eq!(config.call_timeout().unwrap().as_millis(), 250);
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Queue name. Defaults to the service name.
    pub name: Option<String>,
    pub stop_policy: StopPolicy,
    /// Default bound for `enqueue_and_wait` and `flush`. Unbounded if unset.
    pub call_timeout_ms: Option<u64>,
}

impl QueueConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the queue name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the stop policy.
    pub fn with_stop_policy(mut self, policy: StopPolicy) -> Self {
        self.stop_policy = policy;
        self
    }

    /// Bound every blocking call on this queue. Durations beyond `u64`
    /// milliseconds saturate.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }
}
