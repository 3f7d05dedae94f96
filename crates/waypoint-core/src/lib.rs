//! Core library for the Waypoint plan execution engine.
//!
//! Waypoint turns a user objective into a persisted, ordered plan of steps,
//! each assigned to an agent role, and drives that plan to completion one
//! step at a time. Steps assigned to the human role suspend execution until
//! an explicit decision is recorded.
//!
//! # Architecture
//!
//! - **Models** ([`models`]): plans, steps, agent roles and the session
//!   message log
//! - **Repository** ([`repository`]): whole-document plan storage keyed by
//!   `(tenant_id, plan_id)`, hardened with version-conditional writes
//! - **Handlers** ([`handlers`]): the capability behind each agent role,
//!   plus the planner that produces plans
//! - **Registry** ([`registry`]): one handler per role per session, created
//!   on first use
//! - **Executor** ([`executor`]): the sequential, resumable execution loop
//!
//! The reasoning, retrieval and provisioning backends are traits; callers
//! supply the implementations.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use waypoint_core::{
//!     handlers::{ProvisioningBackend, ReasoningBackend, RetrievalBackend},
//!     params::{HumanFeedback, InputTask},
//!     ExecutionOutcome, Executor, HandlerFactories, HandlerRegistry, HumanHandler,
//!     PlannerHandler, RepositoryBuilder, SessionContext,
//! };
//!
//! # async fn example(
//! #     provisioning: Arc<dyn ProvisioningBackend>,
//! #     reasoning: Arc<dyn ReasoningBackend>,
//! #     retrieval: Arc<dyn RetrievalBackend>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let repository = RepositoryBuilder::new()
//!     .with_database_path("waypoint.db")
//!     .build()
//!     .await?;
//!
//! let session = SessionContext::new("tenant-a", "session-1", "user-1");
//! let factories = HandlerFactories::with_defaults(
//!     Arc::clone(&provisioning),
//!     Arc::clone(&reasoning),
//!     retrieval,
//!     repository.clone(),
//! );
//! let registry = Arc::new(HandlerRegistry::new(session.clone(), Arc::new(factories)));
//! let executor = Executor::new(repository.clone(), registry);
//!
//! let planner = PlannerHandler::create(
//!     provisioning.as_ref(),
//!     reasoning,
//!     repository.clone(),
//!     session.clone(),
//! )
//! .await?;
//! let (plan, _steps) = planner
//!     .handle_input_task(&InputTask {
//!         session_id: session.session_id.clone(),
//!         description: "Assess the purchase of 12 Elm St".to_string(),
//!     })
//!     .await?;
//!
//! if let ExecutionOutcome::AwaitingHuman { step_id } = executor.start(&plan.id).await? {
//!     let feedback = HumanFeedback::approve(&plan.id, &step_id);
//!     HumanHandler::new(repository, &session.tenant_id)
//!         .record_feedback(&feedback)
//!         .await?;
//!     let outcome = executor.handle_human_feedback(&feedback).await?;
//!     println!("Plan {}: {outcome}", plan.id);
//! }
//! # Ok(())
//! # }
//! ```

pub mod db;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod models;
pub mod params;
pub mod registry;
pub mod repository;

// Re-export commonly used types
pub use db::Database;
pub use error::{EngineError, Result};
pub use executor::{ExecutionOutcome, Executor, ExecutorConfig, FailurePolicy};
pub use handlers::{Handler, HandlerFactory, HumanHandler, PlannerHandler};
pub use models::{
    AgentMessage, AgentType, NextStep, Plan, PlanStatus, Step, StepStatus, EXECUTOR_SOURCE,
};
pub use params::{HumanClarification, HumanFeedback, InputTask, ListPlans, PlanRef};
pub use registry::{HandlerFactories, HandlerRegistry, SessionContext};
pub use repository::{PlanRepository, RepositoryBuilder};
