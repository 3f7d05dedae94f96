//! Result of driving a plan.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::PlanStatus;

/// Where a call into the executor left the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// Every step resolved; the plan is `Completed`
    Completed,

    /// Suspended on a human gate
    AwaitingHuman { step_id: String },

    /// A step failed; the plan is `Failed`
    Failed { step_id: String, error: String },

    /// A human rejected a step; the plan is `Failed`
    Rejected { step_id: String },

    /// The plan was already terminal; nothing was dispatched
    AlreadyTerminal { status: PlanStatus },

    /// No runnable step, but a step is still pending or in progress
    Stalled { step_id: String },
}

impl ExecutionOutcome {
    /// Whether the plan can make further progress through the executor.
    pub fn is_suspended(&self) -> bool {
        matches!(self, Self::AwaitingHuman { .. } | Self::Stalled { .. })
    }
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::AwaitingHuman { step_id } => write!(f, "awaiting human input on step {step_id}"),
            Self::Failed { step_id, error } => write!(f, "step {step_id} failed: {error}"),
            Self::Rejected { step_id } => write!(f, "step {step_id} was rejected"),
            Self::AlreadyTerminal { status } => write!(f, "plan already {status}"),
            Self::Stalled { step_id } => write!(f, "stalled on step {step_id}"),
        }
    }
}
