//! Retrieval handler: a pass-through to the retrieval backend.

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use super::{Handler, HandlerContext, HandlerFactory, RetrievalBackend};
use crate::{
    error::{EngineError, Result},
    models::{AgentType, Step},
};

/// Runs the step's action as a query and returns the backend output
/// untouched. It never interprets or summarizes.
pub struct RetrievalHandler {
    backend: Arc<dyn RetrievalBackend>,
}

impl RetrievalHandler {
    pub fn new(backend: Arc<dyn RetrievalBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Handler for RetrievalHandler {
    fn agent_type(&self) -> AgentType {
        AgentType::DocumentRetrieval
    }

    async fn execute(&self, step: &Step) -> Result<String> {
        debug!("Retrieving for step {}", step.id);

        self.backend
            .retrieve(&step.action)
            .await
            .map_err(|e| EngineError::handler(AgentType::DocumentRetrieval, &e))
    }
}

/// Builds a [`RetrievalHandler`] over a shared backend.
pub struct RetrievalFactory {
    backend: Arc<dyn RetrievalBackend>,
}

impl RetrievalFactory {
    pub fn new(backend: Arc<dyn RetrievalBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl HandlerFactory for RetrievalFactory {
    async fn create(&self, _context: &HandlerContext) -> anyhow::Result<Arc<dyn Handler>> {
        Ok(Arc::new(RetrievalHandler::new(Arc::clone(&self.backend))))
    }
}
