//! Data models for plans, steps and the session message log.
//!
//! A [`Plan`] is the aggregate: it owns its [`Step`]s in creation order and
//! is stored and replaced as a single document. Steps refer back to their
//! plan by id only.
//!
//! # Step lifecycle
//!
//! ```text
//! Pending → Planned → {Approved | Rejected} → InProgress → {Completed | Failed}
//! ```
//!
//! Human steps resolve at `Approved`/`Rejected`; every other step moves
//! `Planned → InProgress → Completed/Failed` once the executor selects it.
//!
//! # Examples
//!
//! ```rust
//! use waypoint_core::models::{AgentType, NextStep, Plan, Step, StepStatus};
//!
//! let mut plan = Plan::new("tenant-a", "session-1", "user-1", "Assess 12 Elm St");
//! plan.steps.push(Step::planned(&plan.id, AgentType::Valuation, "Estimate value"));
//! plan.steps.push(Step::planned(&plan.id, AgentType::Human, "Confirm zoning"));
//!
//! let NextStep::Runnable(next) = plan.next_step() else {
//!     panic!("a fresh plan starts with a runnable step");
//! };
//! assert_eq!(next.agent_type, AgentType::Valuation);
//! assert_eq!(next.status, StepStatus::Planned);
//! ```

pub mod agent;
pub mod message;
pub mod plan;
pub mod status;
pub mod step;


pub use agent::{AgentType, HandlerKind};
pub use message::{AgentMessage, EXECUTOR_SOURCE};
pub use plan::{NextStep, Plan};
pub use status::{PlanStatus, StepStatus};
pub use step::Step;
