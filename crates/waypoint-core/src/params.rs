//! Parameter structures for engine operations
//!
//! These structures are shared by every caller of the engine (a chat backend,
//! an HTTP layer, tests) and carry no interface-specific attributes beyond
//! serde and JSON schema derives, so an outer surface can accept them
//! directly as request bodies.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Objective submitted to the planner.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InputTask {
    /// Session the objective was submitted in
    pub session_id: String,

    /// Natural-language objective to decompose into steps
    pub description: String,
}

/// A human decision on a step.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HumanFeedback {
    /// Plan the step belongs to
    pub plan_id: String,

    /// Step the decision applies to
    pub step_id: String,

    /// Whether the step was approved
    pub approved: bool,

    /// Optional comment recorded on the step
    #[serde(default)]
    pub human_feedback: Option<String>,
}

impl HumanFeedback {
    pub fn approve(plan_id: impl Into<String>, step_id: impl Into<String>) -> Self {
        Self {
            plan_id: plan_id.into(),
            step_id: step_id.into(),
            approved: true,
            human_feedback: None,
        }
    }

    pub fn reject(plan_id: impl Into<String>, step_id: impl Into<String>) -> Self {
        Self {
            approved: false,
            ..Self::approve(plan_id, step_id)
        }
    }

    /// Attaches a comment to the decision.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.human_feedback = Some(comment.into());
        self
    }
}

/// The user's answer to a planner's clarification request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HumanClarification {
    /// Plan that asked for clarification
    pub plan_id: String,

    /// The answer, stored verbatim on the plan
    pub human_clarification: String,
}

/// Key of a plan document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PlanRef {
    /// Partition the plan is stored under
    pub tenant_id: String,

    /// ID of the plan
    pub plan_id: String,
}

impl PlanRef {
    pub fn new(tenant_id: impl Into<String>, plan_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            plan_id: plan_id.into(),
        }
    }
}

/// Parameters for listing a tenant's plans.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListPlans {
    /// Partition to list
    pub tenant_id: String,

    /// Restrict to one session
    #[serde(default)]
    pub session_id: Option<String>,
}
