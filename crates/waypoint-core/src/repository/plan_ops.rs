//! Plan operations for the PlanRepository.

use log::debug;

use super::PlanRepository;
use crate::{
    error::{EngineError, Result},
    models::{Plan, PlanStatus},
    params::{ListPlans, PlanRef},
};

impl PlanRepository {
    /// Persists a brand-new plan document, steps included.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::AlreadyExists` if the `(tenant_id, id)` key is
    /// already taken
    pub async fn create_plan(&self, plan: &Plan) -> Result<Plan> {
        let plan = plan.clone();

        self.blocking(move |db| {
            db.insert_plan(&plan)?;
            debug!(
                "Created plan {} for tenant {} with {} steps",
                plan.id,
                plan.tenant_id,
                plan.steps.len()
            );
            Ok(plan)
        })
        .await
    }

    /// Retrieves a plan by its key. A missing plan is `Ok(None)`, not an
    /// error.
    pub async fn get_plan(&self, params: &PlanRef) -> Result<Option<Plan>> {
        let PlanRef { tenant_id, plan_id } = params.clone();

        self.blocking(move |db| db.get_plan(&tenant_id, &plan_id))
            .await
    }

    /// Returns the stored document text exactly as last written.
    pub async fn get_plan_document(&self, params: &PlanRef) -> Result<Option<String>> {
        let PlanRef { tenant_id, plan_id } = params.clone();

        self.blocking(move |db| db.get_plan_document(&tenant_id, &plan_id))
            .await
    }

    /// Lists a tenant's plans, newest first.
    pub async fn list_plans(&self, params: &ListPlans) -> Result<Vec<Plan>> {
        let ListPlans {
            tenant_id,
            session_id,
        } = params.clone();

        self.blocking(move |db| db.list_plans(&tenant_id, session_id.as_deref()))
            .await
    }

    /// Sets the plan's overall status.
    ///
    /// A terminal plan only accepts its own status again, which is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::PlanNotFound` if the plan does not exist and
    /// `EngineError::Validation` if the plan is already terminal with a
    /// different status
    pub async fn update_plan_status(&self, params: &PlanRef, status: PlanStatus) -> Result<Plan> {
        let (plan, _) = self
            .modify_plan(&params.tenant_id, &params.plan_id, move |plan| {
                if plan.status == status {
                    return Ok(false);
                }
                if plan.status.is_terminal() {
                    return Err(EngineError::validation("status").with_reason(format!(
                        "plan {} is already {} and cannot become {status}",
                        plan.id, plan.status
                    )));
                }
                plan.status = status;
                Ok(true)
            })
            .await?;

        debug!("Plan {} status is now {}", plan.id, plan.status);
        Ok(plan)
    }

    /// Stores the user's answer to the planner's clarification request,
    /// replacing any earlier answer.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::PlanNotFound` if the plan does not exist and
    /// `EngineError::Validation` if the plan is terminal
    pub async fn set_clarification_response(
        &self,
        params: &PlanRef,
        response: &str,
    ) -> Result<Plan> {
        let response = response.to_string();

        let (plan, _) = self
            .modify_plan(&params.tenant_id, &params.plan_id, move |plan| {
                if plan.status.is_terminal() {
                    return Err(EngineError::validation("human_clarification").with_reason(
                        format!("plan {} is {} and can no longer change", plan.id, plan.status),
                    ));
                }
                if plan.human_clarification_response.as_deref() == Some(response.as_str()) {
                    return Ok(false);
                }
                plan.human_clarification_response = Some(response.clone());
                Ok(true)
            })
            .await?;

        debug!("Recorded clarification on plan {}", plan.id);
        Ok(plan)
    }
}
