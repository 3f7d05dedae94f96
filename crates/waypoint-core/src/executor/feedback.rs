//! Resuming a plan after a human decision.

use log::{info, warn};

use super::{ExecutionOutcome, Executor};
use crate::{
    error::{EngineError, Result},
    models::StepStatus,
    params::HumanFeedback,
};

impl Executor {
    /// Acts on a recorded human decision.
    ///
    /// An approval resumes the loop from where it paused; the step must
    /// already be `Approved` (see [`crate::handlers::HumanHandler::record_feedback`]).
    /// A rejection marks the step `Rejected` if it is not already, fails the
    /// plan and dispatches nothing.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::PlanNotFound` / `EngineError::StepNotFound` if
    /// the target is absent, and `EngineError::Validation` for an approval of
    /// a step that is not `Approved`
    pub async fn handle_human_feedback(&self, feedback: &HumanFeedback) -> Result<ExecutionOutcome> {
        let key = self.plan_ref(&feedback.plan_id);
        let plan = self.load_plan(&feedback.plan_id).await?;
        let mut step = plan
            .step(&feedback.step_id)
            .cloned()
            .ok_or_else(|| EngineError::StepNotFound {
                plan_id: feedback.plan_id.clone(),
                step_id: feedback.step_id.clone(),
            })?;

        if plan.status.is_terminal() {
            warn!(
                "Ignoring feedback on step {}: plan {} is already {}",
                step.id, plan.id, plan.status
            );
            return Ok(ExecutionOutcome::AlreadyTerminal {
                status: plan.status,
            });
        }

        if feedback.approved {
            if step.status != StepStatus::Approved {
                return Err(EngineError::validation("approved").with_reason(format!(
                    "step {} is {}, record the approval before resuming",
                    step.id, step.status
                )));
            }
            info!("Step {} of plan {} approved, resuming", step.id, plan.id);
            return self.run(&plan.id).await;
        }

        info!("Step {} of plan {} rejected, halting", step.id, plan.id);
        if step.status != StepStatus::Rejected {
            step.status = StepStatus::Rejected;
            if feedback.human_feedback.is_some() {
                step.human_feedback = feedback.human_feedback.clone();
            }
            self.repository.update_step(&key, &step).await?;
        }

        self.close_unsuccessful(&plan, &step).await
    }
}
