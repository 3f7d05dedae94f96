//! Step model definition and related functionality.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AgentType, StepStatus};

/// Represents an individual step within a plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Step {
    /// Unique identifier for the step
    pub id: String,

    /// ID of the parent plan
    pub plan_id: String,

    /// Role the step is assigned to
    pub agent_type: AgentType,

    /// Instruction text handed to the handler
    pub action: String,

    /// Current status of the step
    #[serde(default)]
    pub status: StepStatus,

    /// Handler output once completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,

    /// Failure description once failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Free-text comment left with a human decision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_feedback: Option<String>,
}

impl Step {
    /// Creates a planned step with a fresh id.
    pub fn planned(plan_id: &str, agent_type: AgentType, action: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            plan_id: plan_id.to_string(),
            agent_type,
            action: action.into(),
            status: StepStatus::Planned,
            result: None,
            error: None,
            human_feedback: None,
        }
    }

    /// Whether the step needs no further work from the executor.
    ///
    /// An approved human step is resolved: approval is its outcome.
    pub fn is_resolved(&self) -> bool {
        self.status.is_terminal()
            || (self.agent_type.is_human() && self.status == StepStatus::Approved)
    }

    /// Whether the executor may select this step next.
    pub fn is_runnable(&self) -> bool {
        match self.status {
            StepStatus::Planned => true,
            StepStatus::Approved => !self.agent_type.is_human(),
            _ => false,
        }
    }
}
