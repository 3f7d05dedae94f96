//! Human handler: the human gate.
//!
//! The executor never invokes a human step; it suspends on it. The only
//! legitimate entry point is a recorded decision, written by
//! [`HumanHandler::record_feedback`] and then handed to
//! [`crate::executor::Executor::handle_human_feedback`].

use std::sync::Arc;

use async_trait::async_trait;
use log::info;

use super::{Handler, HandlerContext, HandlerFactory};
use crate::{
    error::{EngineError, Result},
    models::{AgentType, Plan, Step, StepStatus},
    params::{HumanClarification, HumanFeedback, PlanRef},
    repository::PlanRepository,
};

/// Proxy for the human user.
pub struct HumanHandler {
    repository: PlanRepository,
    tenant_id: String,
}

impl HumanHandler {
    pub fn new(repository: PlanRepository, tenant_id: impl Into<String>) -> Self {
        Self {
            repository,
            tenant_id: tenant_id.into(),
        }
    }

    /// Records a human decision on a step: `Approved` or `Rejected`, plus
    /// the optional comment.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::PlanNotFound` / `EngineError::StepNotFound` if
    /// the target is absent and `EngineError::Validation` if the step or the
    /// plan can no longer change
    pub async fn record_feedback(&self, feedback: &HumanFeedback) -> Result<Step> {
        let key = PlanRef::new(&self.tenant_id, &feedback.plan_id);
        let plan = self
            .repository
            .get_plan(&key)
            .await?
            .ok_or_else(|| EngineError::PlanNotFound {
                id: feedback.plan_id.clone(),
            })?;
        let mut step = plan
            .step(&feedback.step_id)
            .cloned()
            .ok_or_else(|| EngineError::StepNotFound {
                plan_id: feedback.plan_id.clone(),
                step_id: feedback.step_id.clone(),
            })?;

        step.status = if feedback.approved {
            StepStatus::Approved
        } else {
            StepStatus::Rejected
        };
        if feedback.human_feedback.is_some() {
            step.human_feedback = feedback.human_feedback.clone();
        }

        self.repository.update_step(&key, &step).await?;
        info!("Step {} of plan {} is now {}", step.id, plan.id, step.status);
        Ok(step)
    }

    /// Records the user's answer to the plan's clarification request.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::PlanNotFound` if the plan is absent and
    /// `EngineError::Validation` if the plan is terminal
    pub async fn record_clarification(&self, clarification: &HumanClarification) -> Result<Plan> {
        let key = PlanRef::new(&self.tenant_id, &clarification.plan_id);
        let plan = self
            .repository
            .set_clarification_response(&key, &clarification.human_clarification)
            .await?;

        info!("Clarification recorded on plan {}", plan.id);
        Ok(plan)
    }
}

#[async_trait]
impl Handler for HumanHandler {
    fn agent_type(&self) -> AgentType {
        AgentType::Human
    }

    async fn execute(&self, _step: &Step) -> Result<String> {
        Err(EngineError::UnsupportedOperation {
            agent: AgentType::Human,
            operation: "execute",
        })
    }
}

/// Builds a [`HumanHandler`] bound to the session's tenant.
pub struct HumanFactory {
    repository: PlanRepository,
}

impl HumanFactory {
    pub fn new(repository: PlanRepository) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl HandlerFactory for HumanFactory {
    async fn create(&self, context: &HandlerContext) -> anyhow::Result<Arc<dyn Handler>> {
        Ok(Arc::new(HumanHandler::new(
            self.repository.clone(),
            &context.session.tenant_id,
        )))
    }
}
