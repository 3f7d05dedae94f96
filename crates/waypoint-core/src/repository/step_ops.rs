//! Step operations for the PlanRepository.

use log::{debug, info, warn};

use super::PlanRepository;
use crate::{
    error::{EngineError, Result},
    models::{NextStep, Plan, Step, StepStatus},
    params::PlanRef,
};

impl PlanRepository {
    /// Replaces one step of a plan in place and writes the whole plan back.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::PlanNotFound` / `EngineError::StepNotFound` if
    /// the plan or the step id is absent (nothing is written), and
    /// `EngineError::Validation` if the plan is terminal, the step belongs to
    /// another plan, the stored step already reached a terminal status, or
    /// the write would enter or leave `InProgress`. A running step is only
    /// settled by its claim holder through [`PlanRepository::settle_step`].
    pub async fn update_step(&self, params: &PlanRef, updated_step: &Step) -> Result<Plan> {
        let updated = updated_step.clone();

        let (plan, _) = self
            .modify_plan(&params.tenant_id, &params.plan_id, move |plan| {
                apply_step_update(plan, &updated)
            })
            .await?;

        debug!(
            "Step {} of plan {} is now {}",
            updated_step.id, plan.id, updated_step.status
        );
        Ok(plan)
    }

    /// Atomically moves the plan's next runnable step to `InProgress`.
    ///
    /// The claim only succeeds if `step_id` is still the step the plan would
    /// select next. Returns `None` when another caller got there first, the
    /// step is no longer runnable, or the plan is terminal.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::PlanNotFound` / `EngineError::StepNotFound` if
    /// the plan or the step id is absent
    pub async fn claim_step(&self, params: &PlanRef, step_id: &str) -> Result<Option<Step>> {
        let target = step_id.to_string();

        let (plan, claimed) = self
            .modify_plan(&params.tenant_id, &params.plan_id, move |plan| {
                claim_next(plan, &target)
            })
            .await?;

        if !claimed {
            debug!("Step {step_id} of plan {} was not claimable", plan.id);
            return Ok(None);
        }
        info!("Claimed step {step_id} of plan {}", plan.id);
        Ok(plan.step(step_id).cloned())
    }

    /// Writes the outcome of a claimed step.
    ///
    /// `settled` must be `Completed` or `Failed`. The write only happens while
    /// the stored step is still `InProgress` and the plan is not terminal;
    /// returns `false` when the claim was lost in the meantime.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::PlanNotFound` / `EngineError::StepNotFound` if
    /// the plan or the step id is absent, and `EngineError::Validation` for
    /// any other target status
    pub async fn settle_step(&self, params: &PlanRef, settled: &Step) -> Result<bool> {
        if !matches!(settled.status, StepStatus::Completed | StepStatus::Failed) {
            return Err(EngineError::validation("status").with_reason(format!(
                "step {} cannot be settled as {}",
                settled.id, settled.status
            )));
        }
        let outcome = settled.clone();

        let (plan, written) = self
            .modify_plan(&params.tenant_id, &params.plan_id, move |plan| {
                settle_claimed(plan, &outcome)
            })
            .await?;

        if written {
            debug!(
                "Step {} of plan {} settled as {}",
                settled.id, plan.id, settled.status
            );
        } else {
            warn!(
                "Step {} of plan {} is no longer held, outcome dropped",
                settled.id, plan.id
            );
        }
        Ok(written)
    }

    /// Marks a step `Failed` without running it.
    ///
    /// Like [`PlanRepository::claim_step`], this only succeeds while `step_id`
    /// is the plan's next runnable step, so it never touches a step another
    /// caller has claimed. Returns the failed step, or `None` if nothing was
    /// written.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::PlanNotFound` / `EngineError::StepNotFound` if
    /// the plan or the step id is absent
    pub async fn fail_unclaimed_step(
        &self,
        params: &PlanRef,
        step_id: &str,
        error: &str,
    ) -> Result<Option<Step>> {
        let target = step_id.to_string();
        let error = error.to_string();

        let (plan, failed) = self
            .modify_plan(&params.tenant_id, &params.plan_id, move |plan| {
                if !is_next_runnable(plan, &target)? {
                    return Ok(false);
                }
                for step in plan.steps.iter_mut().filter(|s| s.id == target) {
                    step.status = StepStatus::Failed;
                    step.error = Some(error.clone());
                }
                Ok(true)
            })
            .await?;

        if !failed {
            debug!("Step {step_id} of plan {} was not failable", plan.id);
            return Ok(None);
        }
        Ok(plan.step(step_id).cloned())
    }

    /// Retrieves a single step of a plan. `None` if either is absent.
    pub async fn get_step(&self, params: &PlanRef, step_id: &str) -> Result<Option<Step>> {
        Ok(self
            .get_plan(params)
            .await?
            .and_then(|plan| plan.step(step_id).cloned()))
    }
}

fn apply_step_update(plan: &mut Plan, updated: &Step) -> Result<bool> {
    if plan.status.is_terminal() {
        return Err(EngineError::validation("status").with_reason(format!(
            "plan {} is {} and can no longer change",
            plan.id, plan.status
        )));
    }
    if updated.plan_id != plan.id {
        return Err(EngineError::validation("plan_id").with_reason(format!(
            "step {} belongs to plan {}, not {}",
            updated.id, updated.plan_id, plan.id
        )));
    }

    let plan_id = plan.id.clone();
    let slot = plan
        .steps
        .iter_mut()
        .find(|s| s.id == updated.id)
        .ok_or_else(|| EngineError::StepNotFound {
            plan_id,
            step_id: updated.id.clone(),
        })?;

    if *slot == *updated {
        return Ok(false);
    }
    if slot.status.is_terminal() {
        return Err(EngineError::validation("status").with_reason(format!(
            "step {} is {} and can no longer change",
            slot.id, slot.status
        )));
    }
    if slot.status == StepStatus::InProgress || updated.status == StepStatus::InProgress {
        return Err(EngineError::validation("status").with_reason(format!(
            "step {} enters and leaves in_progress only through its claim",
            slot.id
        )));
    }

    *slot = updated.clone();
    Ok(true)
}

/// Whether `step_id` is the step a non-terminal plan would dispatch next.
fn is_next_runnable(plan: &Plan, step_id: &str) -> Result<bool> {
    if plan.step(step_id).is_none() {
        return Err(EngineError::StepNotFound {
            plan_id: plan.id.clone(),
            step_id: step_id.to_string(),
        });
    }
    if plan.status.is_terminal() {
        return Ok(false);
    }
    Ok(matches!(plan.next_step(), NextStep::Runnable(next) if next.id == step_id))
}

fn claim_next(plan: &mut Plan, step_id: &str) -> Result<bool> {
    if !is_next_runnable(plan, step_id)? {
        return Ok(false);
    }

    for step in plan.steps.iter_mut().filter(|s| s.id == step_id) {
        step.status = StepStatus::InProgress;
        step.error = None;
    }
    Ok(true)
}

fn settle_claimed(plan: &mut Plan, settled: &Step) -> Result<bool> {
    let plan_id = plan.id.clone();
    let terminal = plan.status.is_terminal();
    let slot = plan
        .steps
        .iter_mut()
        .find(|s| s.id == settled.id)
        .ok_or_else(|| EngineError::StepNotFound {
            plan_id,
            step_id: settled.id.clone(),
        })?;

    if terminal || slot.status != StepStatus::InProgress {
        return Ok(false);
    }
    *slot = settled.clone();
    Ok(true)
}
