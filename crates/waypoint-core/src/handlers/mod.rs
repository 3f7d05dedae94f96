//! Handlers: the executable capability behind each agent type.
//!
//! Every step-executing role is a value implementing [`Handler`]. Roles do
//! not inherit behavior from a remote SDK type; they hold the handles they
//! need (a provisioned [`AgentHandle`], a backend client) as fields.
//!
//! | Variant | Type | `execute` |
//! |---|---|---|
//! | Specialist | [`SpecialistHandler`] | forwards the action to the reasoning backend |
//! | Retrieval | [`RetrievalHandler`] | returns raw retrieval output verbatim |
//! | Human | [`HumanHandler`] | always [`EngineError::UnsupportedOperation`] |
//! | Planner | [`PlannerHandler`] | not a step handler; see [`PlannerHandler::handle_input_task`] |
//!
//! Handlers are created by a [`HandlerFactory`] registered per agent type in
//! [`crate::registry::HandlerFactories`] and cached per session by
//! [`crate::registry::HandlerRegistry`].
//!
//! [`EngineError::UnsupportedOperation`]: crate::error::EngineError::UnsupportedOperation

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    models::{AgentType, Step},
    registry::SessionContext,
};

pub mod human;
pub mod planner;
pub mod retrieval;
pub mod specialist;

pub use human::{HumanFactory, HumanHandler};
pub use planner::{PlannedStep, PlannerHandler, PlannerResponse};
pub use retrieval::{RetrievalFactory, RetrievalHandler};
pub use specialist::{SpecialistFactory, SpecialistHandler};

/// A step-executing capability.
///
/// Implementations return the step's result text or a typed failure. They
/// never change step status; the executor owns every transition.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Role this handler serves.
    fn agent_type(&self) -> AgentType;

    /// Resolves one step.
    async fn execute(&self, step: &Step) -> Result<String>;
}

/// Remote agent definition returned by the provisioning backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentHandle {
    /// Backend-assigned identifier
    pub id: String,
    /// Role name the definition was provisioned under
    pub name: String,
}

/// Reasoning backend used by specialists and the planner.
///
/// Returns one final string per call. A backend that streams must buffer and
/// concatenate its chunks before returning.
#[async_trait]
pub trait ReasoningBackend: Send + Sync {
    async fn invoke(&self, agent: &AgentHandle, prompt: &str) -> anyhow::Result<String>;
}

/// Document/search backend used by the retrieval handler.
#[async_trait]
pub trait RetrievalBackend: Send + Sync {
    async fn retrieve(&self, query: &str) -> anyhow::Result<String>;
}

/// Remote agent-definition provisioning, idempotent by role name.
#[async_trait]
pub trait ProvisioningBackend: Send + Sync {
    async fn create_or_get(&self, role_name: &str, instructions: &str)
        -> anyhow::Result<AgentHandle>;
}

/// Construction arguments handed to a [`HandlerFactory`].
#[derive(Debug, Clone)]
pub struct HandlerContext {
    pub agent_type: AgentType,
    pub session: SessionContext,
}

/// Role-specific async constructor.
///
/// Called at most once per `(session, agent type)` by the registry; a
/// failure is reported as `EngineError::HandlerCreation` and not cached.
#[async_trait]
pub trait HandlerFactory: Send + Sync {
    async fn create(&self, context: &HandlerContext) -> anyhow::Result<Arc<dyn Handler>>;
}
