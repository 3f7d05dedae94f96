//! Session message log entries.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Plan, Step};

/// Source tag for notices recorded by the executor itself.
pub const EXECUTOR_SOURCE: &str = "Plan_Executor";

/// A message recorded against a plan: executor notices and handler output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentMessage {
    pub id: String,
    pub tenant_id: String,
    pub session_id: String,
    pub user_id: String,
    pub plan_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    /// Agent name or [`EXECUTOR_SOURCE`]
    pub source: String,
    pub content: String,
    pub created_at: Timestamp,
}

impl AgentMessage {
    /// Creates a message scoped to a plan.
    pub fn for_plan(plan: &Plan, source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id: plan.tenant_id.clone(),
            session_id: plan.session_id.clone(),
            user_id: plan.user_id.clone(),
            plan_id: plan.id.clone(),
            step_id: None,
            source: source.into(),
            content: content.into(),
            created_at: Timestamp::now(),
        }
    }

    /// Creates a message scoped to one step of a plan.
    pub fn for_step(
        plan: &Plan,
        step: &Step,
        source: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            step_id: Some(step.id.clone()),
            ..Self::for_plan(plan, source, content)
        }
    }
}
