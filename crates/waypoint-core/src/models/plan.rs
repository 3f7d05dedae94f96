//! Plan model definition and related functionality.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{PlanStatus, Step, StepStatus};

/// Outcome of step selection, see [`Plan::next_step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NextStep<'a> {
    /// `Planned`, or `Approved` for a non-human step
    Runnable(&'a Step),
    /// `Pending` or `InProgress`: nothing may be dispatched yet
    Blocked(&'a Step),
    /// Every step is resolved
    Done,
}

/// Represents a complete plan with metadata and steps.
///
/// A plan is persisted as one document; every mutation rewrites it whole.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    /// Unique identifier for the plan
    pub id: String,

    /// Partition the plan belongs to
    pub tenant_id: String,

    /// Session that produced the plan
    pub session_id: String,

    /// User that submitted the objective
    pub user_id: String,

    /// Objective the plan was produced for
    pub initial_request: String,

    /// Planner's restatement of the goal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Question the planner needs the user to answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_clarification_request: Option<String>,

    /// The user's answer to `human_clarification_request`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_clarification_response: Option<String>,

    /// Overall status of the plan
    #[serde(default)]
    pub status: PlanStatus,

    /// Steps in creation order, which is also execution order
    #[serde(default)]
    pub steps: Vec<Step>,

    /// Timestamp when the plan was created (UTC)
    pub created_at: Timestamp,

    /// Timestamp when the plan was last modified (UTC)
    pub updated_at: Timestamp,

    /// Document version used for conditional replace
    #[serde(default = "initial_version")]
    pub version: u64,
}

fn initial_version() -> u64 {
    1
}

impl Plan {
    /// Creates an in-progress plan with no steps and a fresh id.
    pub fn new(
        tenant_id: impl Into<String>,
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        initial_request: impl Into<String>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.into(),
            session_id: session_id.into(),
            user_id: user_id.into(),
            initial_request: initial_request.into(),
            summary: None,
            human_clarification_request: None,
            human_clarification_response: None,
            status: PlanStatus::InProgress,
            steps: Vec::new(),
            created_at: now,
            updated_at: now,
            version: initial_version(),
        }
    }

    /// Looks up a step by id.
    pub fn step(&self, step_id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    /// Selects what the executor should look at next: the first unresolved
    /// step in creation order. A later step is never offered while an
    /// earlier one is unresolved.
    pub fn next_step(&self) -> NextStep<'_> {
        match self.steps.iter().find(|s| !s.is_resolved()) {
            Some(step) if step.is_runnable() => NextStep::Runnable(step),
            Some(step) => NextStep::Blocked(step),
            None => NextStep::Done,
        }
    }

    /// The first `Failed` or `Rejected` step, if any.
    pub fn first_failed_step(&self) -> Option<&Step> {
        self.steps
            .iter()
            .find(|s| matches!(s.status, StepStatus::Failed | StepStatus::Rejected))
    }

    /// Moves `updated_at` forward without ever letting it go backwards.
    pub(crate) fn touch(&mut self) {
        self.updated_at = Timestamp::now().max(self.updated_at);
    }
}
