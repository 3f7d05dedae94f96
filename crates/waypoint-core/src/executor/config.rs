//! Executor configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default bound on a single handler call.
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(300);

/// What the loop does after a step fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Fail the plan and dispatch nothing after the failed step
    #[default]
    Halt,

    /// Record the failure and keep going; the plan fails once it runs out of
    /// steps
    Continue,
}

/// Tunables for an [`Executor`](super::Executor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    pub failure_policy: FailurePolicy,
    /// `None` waits on a handler indefinitely
    pub handler_timeout: Option<Duration>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Halt,
            handler_timeout: Some(DEFAULT_HANDLER_TIMEOUT),
        }
    }
}

impl ExecutorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_handler_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.handler_timeout = timeout;
        self
    }
}
