//! The plan execution loop.
//!
//! An [`Executor`] drives one session's plans to a terminal status. Each
//! pass of [`Executor::run`] re-reads the plan, selects the first unresolved
//! step and either suspends on a human gate or dispatches the step to the
//! session's handler for its agent type:
//!
//! ```text
//! load plan ─▶ terminal? ─▶ AlreadyTerminal
//!     │
//!     ▼
//! rejected or failed (Halt) step? ─▶ plan Failed
//!     │
//!     ▼
//! next step ─▶ none ─▶ plan Completed (or Failed under FailurePolicy::Continue)
//!     │      └▶ blocked ─▶ Stalled
//!     ▼
//! human gate ─▶ notice, AwaitingHuman
//!     │
//!     ▼
//! resolve handler → claim (InProgress) → execute → Completed / Failed
//! ```
//!
//! Handler failures, handler creation failures and timeouts are contained:
//! they are written to the step's `error` and reported through
//! [`ExecutionOutcome`]. Only storage and lookup errors come back as `Err`.

use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::{
    error::{EngineError, Result},
    handlers::Handler,
    models::{AgentMessage, NextStep, Plan, PlanStatus, Step, StepStatus, EXECUTOR_SOURCE},
    params::PlanRef,
    registry::HandlerRegistry,
    repository::PlanRepository,
};

pub mod config;
mod feedback;
pub mod outcome;


pub use config::{ExecutorConfig, FailurePolicy, DEFAULT_HANDLER_TIMEOUT};
pub use outcome::ExecutionOutcome;

/// Result of dispatching one step.
enum Dispatch {
    Completed,
    Failed { step_id: String },
    /// Another loop claimed the step first, or took the claim away
    Lost,
}

/// Sequential, resumable executor for the plans of one session.
pub struct Executor {
    repository: PlanRepository,
    registry: Arc<HandlerRegistry>,
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(repository: PlanRepository, registry: Arc<HandlerRegistry>) -> Self {
        Self {
            repository,
            registry,
            config: ExecutorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn repository(&self) -> &PlanRepository {
        &self.repository
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Announces a freshly created plan and runs it.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::PlanNotFound` if the plan does not exist for the
    /// session's tenant, or a storage error
    pub async fn start(&self, plan_id: &str) -> Result<ExecutionOutcome> {
        let plan = self.load_plan(plan_id).await?;
        info!("Starting plan {} with {} steps", plan.id, plan.steps.len());

        let notice = format!(
            "I have created a plan with {} steps. I will now begin execution.",
            plan.steps.len()
        );
        self.notify(AgentMessage::for_plan(&plan, EXECUTOR_SOURCE, notice))
            .await?;

        self.run(plan_id).await
    }

    /// Runs the plan until it completes, fails or suspends.
    ///
    /// Safe to call again at any time: a suspended plan suspends again and a
    /// terminal plan is reported without dispatching anything.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::PlanNotFound` if the plan does not exist, or a
    /// storage error. Handler failures are never returned as `Err`.
    pub async fn run(&self, plan_id: &str) -> Result<ExecutionOutcome> {
        loop {
            let plan = self.load_plan(plan_id).await?;
            if plan.status.is_terminal() {
                debug!("Plan {} is already {}, nothing to run", plan.id, plan.status);
                return Ok(ExecutionOutcome::AlreadyTerminal {
                    status: plan.status,
                });
            }

            if let Some(step) = self.halting_step(&plan) {
                return self.close_unsuccessful(&plan, step).await;
            }

            let step = match plan.next_step() {
                NextStep::Runnable(step) => step.clone(),
                NextStep::Blocked(step) => {
                    warn!(
                        "Plan {} cannot advance: step {} is {}",
                        plan.id, step.id, step.status
                    );
                    return Ok(ExecutionOutcome::Stalled {
                        step_id: step.id.clone(),
                    });
                }
                NextStep::Done => return self.finish(&plan).await,
            };

            if step.agent_type.is_human() {
                return self.suspend(&plan, &step).await;
            }

            if let Dispatch::Failed { step_id } = self.dispatch(&plan, step).await? {
                if self.config.failure_policy == FailurePolicy::Continue {
                    warn!("Step {step_id} of plan {} failed, continuing", plan.id);
                }
            }
        }
    }

    /// A step whose status ends the plan under the configured policy.
    fn halting_step<'a>(&self, plan: &'a Plan) -> Option<&'a Step> {
        plan.steps.iter().find(|s| match s.status {
            StepStatus::Rejected => true,
            StepStatus::Failed => self.config.failure_policy == FailurePolicy::Halt,
            _ => false,
        })
    }

    /// Resolves the handler, claims the step and executes it.
    async fn dispatch(&self, plan: &Plan, step: Step) -> Result<Dispatch> {
        let key = self.plan_ref(&plan.id);

        let handler = match self.registry.get_or_create(step.agent_type).await {
            Ok(handler) => handler,
            Err(e) => {
                error!("No handler for step {} of plan {}: {e}", step.id, plan.id);
                let failed = self
                    .repository
                    .fail_unclaimed_step(&key, &step.id, &e.to_string())
                    .await?;
                return Ok(match failed {
                    Some(failed) => Dispatch::Failed { step_id: failed.id },
                    None => {
                        debug!("Step {} of plan {} was claimed elsewhere", step.id, plan.id);
                        Dispatch::Lost
                    }
                });
            }
        };

        let Some(mut running) = self.repository.claim_step(&key, &step.id).await? else {
            debug!("Step {} of plan {} was claimed elsewhere", step.id, plan.id);
            return Ok(Dispatch::Lost);
        };

        info!(
            "Executing step {} of plan {} with {}",
            running.id, plan.id, running.agent_type
        );

        match self.execute(handler.as_ref(), &running).await {
            Ok(result) => {
                running.status = StepStatus::Completed;
                running.result = Some(result.clone());
                if !self.repository.settle_step(&key, &running).await? {
                    return Ok(Dispatch::Lost);
                }
                self.notify(AgentMessage::for_step(
                    plan,
                    &running,
                    running.agent_type.as_str(),
                    result,
                ))
                .await?;

                debug!("Step {} of plan {} completed", running.id, plan.id);
                Ok(Dispatch::Completed)
            }
            Err(e) => {
                error!("Step {} of plan {} failed: {e}", running.id, plan.id);
                running.status = StepStatus::Failed;
                running.error = Some(e.to_string());
                if !self.repository.settle_step(&key, &running).await? {
                    return Ok(Dispatch::Lost);
                }
                Ok(Dispatch::Failed {
                    step_id: running.id,
                })
            }
        }
    }

    /// Invokes the handler, bounded by the configured timeout.
    async fn execute(&self, handler: &dyn Handler, step: &Step) -> Result<String> {
        match self.config.handler_timeout {
            Some(limit) => tokio::time::timeout(limit, handler.execute(step))
                .await
                .unwrap_or_else(|_| {
                    Err(EngineError::Handler {
                        agent: step.agent_type,
                        message: format!("timed out after {limit:?}"),
                    })
                }),
            None => handler.execute(step).await,
        }
    }

    /// Suspends on a human gate, leaving the step untouched.
    async fn suspend(&self, plan: &Plan, step: &Step) -> Result<ExecutionOutcome> {
        info!(
            "Plan {} is waiting for human input on step {}",
            plan.id, step.id
        );

        let key = self.plan_ref(&plan.id);
        let already_notified = self
            .repository
            .list_messages(&key)
            .await?
            .iter()
            .any(|m| m.source == EXECUTOR_SOURCE && m.step_id.as_deref() == Some(step.id.as_str()));

        if !already_notified {
            self.notify(AgentMessage::for_step(
                plan,
                step,
                EXECUTOR_SOURCE,
                format!(
                    "Waiting for your feedback on the following step: {}",
                    step.action
                ),
            ))
            .await?;
        }

        Ok(ExecutionOutcome::AwaitingHuman {
            step_id: step.id.clone(),
        })
    }

    /// Closes a plan with no unresolved steps left.
    async fn finish(&self, plan: &Plan) -> Result<ExecutionOutcome> {
        if let Some(step) = plan.first_failed_step() {
            return self.close_unsuccessful(plan, step).await;
        }

        self.repository
            .update_plan_status(&self.plan_ref(&plan.id), PlanStatus::Completed)
            .await?;
        info!("Plan {} completed", plan.id);

        self.notify(AgentMessage::for_plan(
            plan,
            EXECUTOR_SOURCE,
            "All steps have been completed successfully.",
        ))
        .await?;

        Ok(ExecutionOutcome::Completed)
    }

    /// Fails the plan because of `step`, which is `Failed` or `Rejected`.
    async fn close_unsuccessful(
        &self,
        plan: &Plan,
        step: &Step,
    ) -> Result<ExecutionOutcome> {
        self.repository
            .update_plan_status(&self.plan_ref(&plan.id), PlanStatus::Failed)
            .await?;
        warn!("Plan {} failed on step {} ({})", plan.id, step.id, step.status);

        let (notice, outcome) = match step.status {
            StepStatus::Rejected => (
                "Execution halted because a step was rejected by the user.".to_string(),
                ExecutionOutcome::Rejected {
                    step_id: step.id.clone(),
                },
            ),
            _ => {
                let error = step.error.clone().unwrap_or_default();
                let notice = match self.config.failure_policy {
                    FailurePolicy::Halt => {
                        format!("Execution halted because step {} failed: {error}", step.id)
                    }
                    FailurePolicy::Continue => {
                        format!("Execution finished, but step {} failed: {error}", step.id)
                    }
                };
                let outcome = ExecutionOutcome::Failed {
                    step_id: step.id.clone(),
                    error,
                };
                (notice, outcome)
            }
        };

        self.notify(AgentMessage::for_plan(plan, EXECUTOR_SOURCE, notice))
            .await?;
        Ok(outcome)
    }

    async fn load_plan(&self, plan_id: &str) -> Result<Plan> {
        self.repository
            .get_plan(&self.plan_ref(plan_id))
            .await?
            .ok_or_else(|| EngineError::PlanNotFound {
                id: plan_id.to_string(),
            })
    }

    async fn notify(&self, message: AgentMessage) -> Result<()> {
        self.repository.add_message(&message).await
    }

    fn plan_ref(&self, plan_id: &str) -> PlanRef {
        PlanRef::new(&self.registry.session().tenant_id, plan_id)
    }
}
