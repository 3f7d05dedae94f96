//! Specialist handlers: stateless-per-call reasoning roles.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use log::{debug, info};

use super::{
    AgentHandle, Handler, HandlerContext, HandlerFactory, ProvisioningBackend, ReasoningBackend,
};
use crate::{
    error::{EngineError, Result},
    models::{AgentType, Step},
};

/// Delegates a step's action text to the reasoning backend.
pub struct SpecialistHandler {
    agent_type: AgentType,
    handle: AgentHandle,
    backend: Arc<dyn ReasoningBackend>,
}

impl SpecialistHandler {
    pub fn new(
        agent_type: AgentType,
        handle: AgentHandle,
        backend: Arc<dyn ReasoningBackend>,
    ) -> Self {
        Self {
            agent_type,
            handle,
            backend,
        }
    }

    /// The remote definition this handler talks to.
    pub fn handle(&self) -> &AgentHandle {
        &self.handle
    }
}

#[async_trait]
impl Handler for SpecialistHandler {
    fn agent_type(&self) -> AgentType {
        self.agent_type
    }

    async fn execute(&self, step: &Step) -> Result<String> {
        debug!("{} handling step {}", self.agent_type, step.id);

        let reply = self
            .backend
            .invoke(&self.handle, &step.action)
            .await
            .map_err(|e| EngineError::handler(self.agent_type, &e))?;

        if reply.trim().is_empty() {
            return Err(EngineError::Handler {
                agent: self.agent_type,
                message: "backend returned an empty response".to_string(),
            });
        }

        Ok(reply)
    }
}

/// Provisions the role's remote definition, then builds a
/// [`SpecialistHandler`] around it.
pub struct SpecialistFactory {
    agent_type: AgentType,
    instructions: String,
    provisioning: Arc<dyn ProvisioningBackend>,
    backend: Arc<dyn ReasoningBackend>,
}

impl SpecialistFactory {
    /// Factory using the role's default instructions.
    pub fn new(
        agent_type: AgentType,
        provisioning: Arc<dyn ProvisioningBackend>,
        backend: Arc<dyn ReasoningBackend>,
    ) -> Self {
        Self {
            agent_type,
            instructions: default_instructions(agent_type).to_string(),
            provisioning,
            backend,
        }
    }

    /// Overrides the instructions the definition is provisioned with.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }
}

#[async_trait]
impl HandlerFactory for SpecialistFactory {
    async fn create(&self, context: &HandlerContext) -> anyhow::Result<Arc<dyn Handler>> {
        let handle = self
            .provisioning
            .create_or_get(self.agent_type.as_str(), &self.instructions)
            .await
            .with_context(|| format!("provisioning {}", self.agent_type))?;

        info!(
            "Provisioned {} as {} for session {}",
            self.agent_type, handle.id, context.session.session_id
        );
        Ok(Arc::new(SpecialistHandler::new(
            self.agent_type,
            handle,
            Arc::clone(&self.backend),
        )))
    }
}

/// Role instructions a specialist is provisioned with by default.
pub fn default_instructions(agent_type: AgentType) -> &'static str {
    match agent_type {
        AgentType::Valuation => concat!(
            "You are an expert real estate appraiser. Your sole focus is determining property value. ",
            "You will be given property details and must use your tools to find comparable sales (comps), ",
            "assess the property's current market value, and estimate its After-Repair Value (ARV) if applicable. ",
            "Do not answer questions about zoning, investment strategy, or anything outside of property valuation."
        ),
        AgentType::ZoningCompliance => concat!(
            "You are a zoning and building-code specialist. Answer questions about local laws, permitted uses, ",
            "setbacks, density limits and building codes for a property. ",
            "Do not estimate values or give investment advice."
        ),
        AgentType::InvestmentAnalyst => concat!(
            "You are a real estate investment analyst. Assess financial performance, market trends and ",
            "investment strategy, combining the findings of the other specialists into a clear recommendation."
        ),
        _ => "You are an assistant on a real estate analysis platform.",
    }
}
