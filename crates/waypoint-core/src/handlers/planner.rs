//! Planner: turns an objective into a persisted plan.
//!
//! The planner is not a step handler. It provisions its own remote
//! definition whose instructions embed the JSON schema of
//! [`PlannerResponse`], asks the reasoning backend for a plan, validates the
//! reply and stores the plan with all of its steps as a single document.

use std::sync::Arc;

use anyhow::Context;
use log::{info, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{AgentHandle, ProvisioningBackend, ReasoningBackend};
use crate::{
    error::{EngineError, Result},
    models::{AgentType, Plan, Step},
    params::InputTask,
    registry::SessionContext,
    repository::PlanRepository,
};

/// Structured reply expected from the reasoning backend.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlannerResponse {
    /// The objective, restated
    pub initial_goal: String,

    /// Short summary of the plan and its steps
    #[serde(default)]
    pub summary: Option<String>,

    /// Question for the user when the objective is missing information
    #[serde(default)]
    pub human_clarification_request: Option<String>,

    /// Steps in execution order
    pub steps: Vec<PlannedStep>,
}

/// One step of a [`PlannerResponse`].
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlannedStep {
    /// Agent name, e.g. `Valuation_Agent`
    pub agent: String,

    /// Instruction for that agent
    pub action: String,
}

/// Produces plans for one session.
pub struct PlannerHandler {
    handle: AgentHandle,
    backend: Arc<dyn ReasoningBackend>,
    repository: PlanRepository,
    session: SessionContext,
}

impl PlannerHandler {
    /// Provisions the planner definition and returns a ready planner.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::HandlerCreation` if provisioning fails
    pub async fn create(
        provisioning: &dyn ProvisioningBackend,
        backend: Arc<dyn ReasoningBackend>,
        repository: PlanRepository,
        session: SessionContext,
    ) -> Result<Self> {
        let instructions = instructions()?;
        let handle = provisioning
            .create_or_get(AgentType::Planner.as_str(), &instructions)
            .await
            .with_context(|| format!("provisioning {}", AgentType::Planner))
            .map_err(|e| EngineError::handler_creation(AgentType::Planner, &e))?;

        Ok(Self {
            handle,
            backend,
            repository,
            session,
        })
    }

    /// Asks the backend for a plan, persists it, and returns the plan and its
    /// steps.
    ///
    /// The plan and its steps are written in one document write, so either
    /// the whole plan exists afterwards or nothing does.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Handler` if the backend fails or its reply is
    /// not a usable plan, or a storage error if persisting fails
    pub async fn handle_input_task(&self, task: &InputTask) -> Result<(Plan, Vec<Step>)> {
        info!("Planning objective for session {}: {}", task.session_id, task.description);

        let prompt = format!("Create a plan for this objective: {}", task.description);
        let reply = self
            .backend
            .invoke(&self.handle, &prompt)
            .await
            .map_err(|e| EngineError::handler(AgentType::Planner, &e))?;

        let response = parse_response(&reply)?;
        let plan = self.build_plan(task, &response)?;
        let plan = self.repository.create_plan(&plan).await?;

        info!("Created plan {} with {} steps", plan.id, plan.steps.len());
        let steps = plan.steps.clone();
        Ok((plan, steps))
    }

    fn build_plan(&self, task: &InputTask, response: &PlannerResponse) -> Result<Plan> {
        if response.steps.is_empty() {
            return Err(planner_error("response contains no steps"));
        }

        let mut plan = Plan::new(
            &self.session.tenant_id,
            &task.session_id,
            &self.session.user_id,
            &task.description,
        );
        plan.summary = response
            .summary
            .clone()
            .or_else(|| Some(response.initial_goal.clone()));
        plan.human_clarification_request = response
            .human_clarification_request
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string);

        for (position, planned) in response.steps.iter().enumerate() {
            let agent_type = planned
                .agent
                .parse::<AgentType>()
                .map_err(|e| planner_error(format!("step {position}: {e}")))?;
            if !AgentType::ASSIGNABLE.contains(&agent_type) {
                return Err(planner_error(format!(
                    "step {position}: {agent_type} cannot be assigned steps"
                )));
            }
            if planned.action.trim().is_empty() {
                warn!("Planner produced an empty action for step {position}");
            }
            plan.steps
                .push(Step::planned(&plan.id, agent_type, planned.action.trim()));
        }

        Ok(plan)
    }
}

fn planner_error(message: impl Into<String>) -> EngineError {
    EngineError::Handler {
        agent: AgentType::Planner,
        message: message.into(),
    }
}

/// Parses the backend reply, tolerating a surrounding Markdown code fence.
pub(crate) fn parse_response(reply: &str) -> Result<PlannerResponse> {
    let body = strip_code_fence(reply);
    serde_json::from_str(body)
        .map_err(|e| planner_error(format!("response is not a valid plan: {e}")))
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    match rest.split_once('\n') {
        // Drop the info string (e.g. `json`) on the opening line
        Some((_, body)) => body.trim(),
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()).trim(),
    }
}

/// Instructions the planner definition is provisioned with.
pub fn instructions() -> Result<String> {
    let schema = serde_json::to_string_pretty(&schemars::schema_for!(PlannerResponse))?;
    let agents = AgentType::ASSIGNABLE
        .iter()
        .map(|agent| format!("- {}: {}", agent.as_str(), agent.capability()))
        .collect::<Vec<_>>()
        .join("\n");

    Ok(format!(
        "You are the Planner, an orchestrator for a real estate analysis platform.\n\
         Your job is to create a step-by-step plan to resolve a user's objective.\n\n\
         The agents you can assign tasks to are:\n{agents}\n\n\
         RULES:\n\
         1. Create a concise, logical step-by-step plan.\n\
         2. Assign each step to the most appropriate agent from the list above.\n\
         3. Use {human} for any step that needs the user's input or approval.\n\
         4. If you need more information from the user to create the plan, put a clear \
         question in the `human_clarification_request` field.\n\
         5. The final step should summarize the findings for the user.\n\
         6. Respond ONLY with a JSON object that conforms to this schema:\n{schema}\n",
        human = AgentType::Human.as_str(),
    ))
}
