//! Session-scoped handler cache.
//!
//! A [`HandlerRegistry`] belongs to one session and holds at most one
//! handler per agent type for that session's lifetime. The factory table it
//! draws from ([`HandlerFactories`]) is built once at startup and shared;
//! tests swap in their own factories per role.
//!
//! Creation is single-flight per key: concurrent [`HandlerRegistry::get_or_create`]
//! calls for the same agent type wait on one factory call, while calls for
//! other agent types proceed independently. A failed creation leaves the key
//! empty so the next call retries.

use std::{collections::HashMap, sync::Arc};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OnceCell};

use crate::{
    error::{EngineError, Result},
    handlers::{
        Handler, HandlerContext, HandlerFactory, HumanFactory, ProvisioningBackend,
        ReasoningBackend, RetrievalBackend, RetrievalFactory, SpecialistFactory,
    },
    models::AgentType,
    repository::PlanRepository,
};

/// Identity of the session a registry and its executor serve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub tenant_id: String,
    pub session_id: String,
    pub user_id: String,
}

impl SessionContext {
    pub fn new(
        tenant_id: impl Into<String>,
        session_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            session_id: session_id.into(),
            user_id: user_id.into(),
        }
    }
}

/// Factory table keyed by agent type.
#[derive(Default, Clone)]
pub struct HandlerFactories {
    factories: HashMap<AgentType, Arc<dyn HandlerFactory>>,
}

impl HandlerFactories {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard table: the three specialists, document retrieval and the
    /// human gate.
    pub fn with_defaults(
        provisioning: Arc<dyn ProvisioningBackend>,
        reasoning: Arc<dyn ReasoningBackend>,
        retrieval: Arc<dyn RetrievalBackend>,
        repository: PlanRepository,
    ) -> Self {
        let mut factories = Self::new();
        for agent_type in [
            AgentType::InvestmentAnalyst,
            AgentType::Valuation,
            AgentType::ZoningCompliance,
        ] {
            factories.insert(
                agent_type,
                SpecialistFactory::new(agent_type, Arc::clone(&provisioning), Arc::clone(&reasoning)),
            );
        }
        factories.insert(AgentType::DocumentRetrieval, RetrievalFactory::new(retrieval));
        factories.insert(AgentType::Human, HumanFactory::new(repository));
        factories
    }

    /// Registers (or replaces) the factory for an agent type.
    pub fn register<F>(mut self, agent_type: AgentType, factory: F) -> Self
    where
        F: HandlerFactory + 'static,
    {
        self.insert(agent_type, factory);
        self
    }

    pub fn insert<F>(&mut self, agent_type: AgentType, factory: F)
    where
        F: HandlerFactory + 'static,
    {
        self.factories.insert(agent_type, Arc::new(factory));
    }

    pub fn get(&self, agent_type: AgentType) -> Option<Arc<dyn HandlerFactory>> {
        self.factories.get(&agent_type).cloned()
    }
}

type HandlerCell = Arc<OnceCell<Arc<dyn Handler>>>;

/// Per-session cache of handler instances.
pub struct HandlerRegistry {
    session: SessionContext,
    factories: Arc<HandlerFactories>,
    cells: Mutex<HashMap<AgentType, HandlerCell>>,
}

impl HandlerRegistry {
    pub fn new(session: SessionContext, factories: Arc<HandlerFactories>) -> Self {
        Self {
            session,
            factories,
            cells: Mutex::new(HashMap::new()),
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Returns the session's handler for `agent_type`, creating it on first
    /// use.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::HandlerCreation` if no factory is registered for
    /// the agent type or the factory fails
    pub async fn get_or_create(&self, agent_type: AgentType) -> Result<Arc<dyn Handler>> {
        let cell = {
            let mut cells = self.cells.lock().await;
            Arc::clone(cells.entry(agent_type).or_default())
        };

        if let Some(handler) = cell.get() {
            debug!(
                "Reusing {agent_type} handler for session {}",
                self.session.session_id
            );
            return Ok(Arc::clone(handler));
        }

        let handler = cell
            .get_or_try_init(|| self.create(agent_type))
            .await?;
        Ok(Arc::clone(handler))
    }

    /// Returns the cached handler without creating one.
    pub async fn cached(&self, agent_type: AgentType) -> Option<Arc<dyn Handler>> {
        let cells = self.cells.lock().await;
        cells
            .get(&agent_type)
            .and_then(|cell| cell.get())
            .map(Arc::clone)
    }

    async fn create(&self, agent_type: AgentType) -> Result<Arc<dyn Handler>> {
        let factory = self
            .factories
            .get(agent_type)
            .ok_or_else(|| EngineError::HandlerCreation {
                agent: agent_type,
                message: "no factory registered".to_string(),
            })?;

        let context = HandlerContext {
            agent_type,
            session: self.session.clone(),
        };
        let handler = factory
            .create(&context)
            .await
            .map_err(|e| EngineError::handler_creation(agent_type, &e))?;

        info!(
            "Created {agent_type} handler for session {}",
            self.session.session_id
        );
        Ok(handler)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use async_trait::async_trait;

    use super::*;
    use crate::models::Step;

    struct EchoHandler(AgentType);

    #[async_trait]
    impl Handler for EchoHandler {
        fn agent_type(&self) -> AgentType {
            self.0
        }

        async fn execute(&self, step: &Step) -> Result<String> {
            Ok(step.action.clone())
        }
    }

    /// Counts calls; sleeps to widen the race window; fails the first
    /// `failures` calls.
    struct CountingFactory {
        calls: Arc<AtomicUsize>,
        failures: usize,
    }

    #[async_trait]
    impl HandlerFactory for CountingFactory {
        async fn create(&self, context: &HandlerContext) -> anyhow::Result<Arc<dyn Handler>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if call < self.failures {
                anyhow::bail!("provisioning backend unavailable");
            }
            Ok(Arc::new(EchoHandler(context.agent_type)))
        }
    }

    fn registry_with(agent_type: AgentType, failures: usize) -> (Arc<AtomicUsize>, HandlerRegistry) {
        let calls = Arc::new(AtomicUsize::new(0));
        let factories = HandlerFactories::new().register(
            agent_type,
            CountingFactory {
                calls: Arc::clone(&calls),
                failures,
            },
        );
        let registry = HandlerRegistry::new(
            SessionContext::new("tenant-a", "session-1", "user-1"),
            Arc::new(factories),
        );
        (calls, registry)
    }

    #[tokio::test]
    async fn test_concurrent_get_or_create_runs_factory_once() {
        let (calls, registry) = registry_with(AgentType::Valuation, 0);

        let (first, second) = tokio::join!(
            registry.get_or_create(AgentType::Valuation),
            registry.get_or_create(AgentType::Valuation)
        );
        let first = first.expect("first handler");
        let second = second.expect("second handler");

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_handler_is_reused_within_session() {
        let (calls, registry) = registry_with(AgentType::Valuation, 0);

        let first = registry
            .get_or_create(AgentType::Valuation)
            .await
            .expect("handler");
        let cached = registry
            .cached(AgentType::Valuation)
            .await
            .expect("cached handler");
        let again = registry
            .get_or_create(AgentType::Valuation)
            .await
            .expect("handler");

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &cached));
        assert!(Arc::ptr_eq(&first, &again));
    }

    #[tokio::test]
    async fn test_failed_creation_is_not_cached() {
        let (calls, registry) = registry_with(AgentType::ZoningCompliance, 1);

        let result = registry.get_or_create(AgentType::ZoningCompliance).await;
        assert!(matches!(
            result,
            Err(EngineError::HandlerCreation { agent: AgentType::ZoningCompliance, ref message })
                if message.contains("unavailable")
        ));
        assert!(registry.cached(AgentType::ZoningCompliance).await.is_none());

        let handler = registry
            .get_or_create(AgentType::ZoningCompliance)
            .await
            .expect("retry should succeed");
        assert_eq!(handler.agent_type(), AgentType::ZoningCompliance);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_factory_is_creation_error() {
        let (_calls, registry) = registry_with(AgentType::Valuation, 0);

        let result = registry.get_or_create(AgentType::Human).await;

        assert!(matches!(
            result,
            Err(EngineError::HandlerCreation { agent: AgentType::Human, .. })
        ));
    }

    #[tokio::test]
    async fn test_different_keys_get_different_handlers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let factories = HandlerFactories::new()
            .register(
                AgentType::Valuation,
                CountingFactory {
                    calls: Arc::clone(&calls),
                    failures: 0,
                },
            )
            .register(
                AgentType::InvestmentAnalyst,
                CountingFactory {
                    calls: Arc::clone(&calls),
                    failures: 0,
                },
            );
        let registry = HandlerRegistry::new(
            SessionContext::new("tenant-a", "session-1", "user-1"),
            Arc::new(factories),
        );

        let (valuation, investment) = tokio::join!(
            registry.get_or_create(AgentType::Valuation),
            registry.get_or_create(AgentType::InvestmentAnalyst)
        );

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(valuation.expect("handler").agent_type(), AgentType::Valuation);
        assert_eq!(
            investment.expect("handler").agent_type(),
            AgentType::InvestmentAnalyst
        );
    }
}
