#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use tempfile::TempDir;
use waypoint_core::{
    handlers::{AgentHandle, ProvisioningBackend, ReasoningBackend, RetrievalBackend},
    AgentType, Executor, ExecutorConfig, HandlerFactories, HandlerRegistry, HumanFeedback,
    HumanHandler, Plan, PlanRef, PlanRepository, RepositoryBuilder, SessionContext, Step,
};

pub const TENANT: &str = "tenant-a";
pub const SESSION: &str = "session-1";
pub const USER: &str = "user-1";

/// Routes `log` output through the test harness; `RUST_LOG=debug` to see it.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Helper function to create a test repository
pub async fn create_test_repository() -> (TempDir, PlanRepository) {
    init_logging();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let repository = RepositoryBuilder::new()
        .with_database_path(&db_path)
        .build()
        .await
        .expect("Failed to create repository");
    (temp_dir, repository)
}

pub fn test_session() -> SessionContext {
    SessionContext::new(TENANT, SESSION, USER)
}

/// Reasoning backend with per-role canned replies.
///
/// Roles without a scripted reply answer `"<role> finished: <prompt>"`.
/// Every call is recorded as `(role name, prompt)`.
#[derive(Default)]
pub struct ScriptedReasoning {
    replies: Mutex<HashMap<String, Result<String, String>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedReasoning {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, agent_type: AgentType, text: impl Into<String>) -> Self {
        self.replies
            .lock()
            .expect("replies")
            .insert(agent_type.as_str().to_string(), Ok(text.into()));
        self
    }

    pub fn fail(self, agent_type: AgentType, message: impl Into<String>) -> Self {
        self.replies
            .lock()
            .expect("replies")
            .insert(agent_type.as_str().to_string(), Err(message.into()));
        self
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().expect("calls").clone()
    }

    /// Prompts sent to specialists, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|(role, _)| role != AgentType::Planner.as_str())
            .map(|(_, prompt)| prompt)
            .collect()
    }
}

#[async_trait]
impl ReasoningBackend for ScriptedReasoning {
    async fn invoke(&self, agent: &AgentHandle, prompt: &str) -> anyhow::Result<String> {
        self.calls
            .lock()
            .expect("calls")
            .push((agent.name.clone(), prompt.to_string()));

        let scripted = self.replies.lock().expect("replies").get(&agent.name).cloned();
        match scripted {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Ok(format!("{} finished: {prompt}", agent.name)),
        }
    }
}

/// Provisioning backend that hands out a handle per role and can be told to
/// refuse a role.
#[derive(Default)]
pub struct StubProvisioning {
    refused: Mutex<Vec<String>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl StubProvisioning {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refuse(self, agent_type: AgentType) -> Self {
        self.refused
            .lock()
            .expect("refused")
            .push(agent_type.as_str().to_string());
        self
    }

    /// `(role name, instructions)` per call.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().expect("calls").clone()
    }

    pub fn count_for(&self, agent_type: AgentType) -> usize {
        self.calls()
            .iter()
            .filter(|(role, _)| role == agent_type.as_str())
            .count()
    }
}

#[async_trait]
impl ProvisioningBackend for StubProvisioning {
    async fn create_or_get(
        &self,
        role_name: &str,
        instructions: &str,
    ) -> anyhow::Result<AgentHandle> {
        self.calls
            .lock()
            .expect("calls")
            .push((role_name.to_string(), instructions.to_string()));

        if self.refused.lock().expect("refused").iter().any(|r| r == role_name) {
            anyhow::bail!("quota exceeded for {role_name}");
        }
        Ok(AgentHandle {
            id: format!("asst-{}", role_name.to_lowercase()),
            name: role_name.to_string(),
        })
    }
}

/// Retrieval backend returning a fixed document listing per query.
#[derive(Default)]
pub struct StubRetrieval {
    queries: Mutex<Vec<String>>,
}

impl StubRetrieval {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().expect("queries").clone()
    }
}

#[async_trait]
impl RetrievalBackend for StubRetrieval {
    async fn retrieve(&self, query: &str) -> anyhow::Result<String> {
        self.queries.lock().expect("queries").push(query.to_string());
        Ok(format!("[doc-1] deed.pdf\n[doc-2] survey.pdf\nquery: {query}"))
    }
}

/// A repository, a session's registry with the default handler table over
/// stub backends, and an executor.
pub struct TestEngine {
    _temp_dir: TempDir,
    pub repository: PlanRepository,
    pub reasoning: Arc<ScriptedReasoning>,
    pub provisioning: Arc<StubProvisioning>,
    pub retrieval: Arc<StubRetrieval>,
    pub executor: Executor,
}

impl TestEngine {
    pub async fn new() -> Self {
        Self::build(
            ScriptedReasoning::new(),
            StubProvisioning::new(),
            ExecutorConfig::default(),
        )
        .await
    }

    pub async fn with_reasoning(reasoning: ScriptedReasoning) -> Self {
        Self::build(reasoning, StubProvisioning::new(), ExecutorConfig::default()).await
    }

    pub async fn build(
        reasoning: ScriptedReasoning,
        provisioning: StubProvisioning,
        config: ExecutorConfig,
    ) -> Self {
        let (temp_dir, repository) = create_test_repository().await;
        let reasoning = Arc::new(reasoning);
        let provisioning = Arc::new(provisioning);
        let retrieval = Arc::new(StubRetrieval::new());

        let factories = HandlerFactories::with_defaults(
            provisioning.clone(),
            reasoning.clone(),
            retrieval.clone(),
            repository.clone(),
        );
        let executor = Self::executor_over(&repository, factories).with_config(config);

        Self {
            _temp_dir: temp_dir,
            repository,
            reasoning,
            provisioning,
            retrieval,
            executor,
        }
    }

    /// An executor for the test session over a custom factory table.
    pub fn executor_over(repository: &PlanRepository, factories: HandlerFactories) -> Executor {
        let registry = HandlerRegistry::new(test_session(), Arc::new(factories));
        Executor::new(repository.clone(), Arc::new(registry))
    }

    /// Stores a plan whose steps are `(agent, action)` pairs, all `Planned`.
    pub async fn create_plan(&self, steps: &[(AgentType, &str)]) -> Plan {
        let mut plan = Plan::new(TENANT, SESSION, USER, "Evaluate the purchase of 12 Elm St");
        for (agent_type, action) in steps {
            plan.steps.push(Step::planned(&plan.id, *agent_type, *action));
        }
        self.repository
            .create_plan(&plan)
            .await
            .expect("Failed to create plan")
    }

    pub async fn stored(&self, plan: &Plan) -> Plan {
        self.repository
            .get_plan(&plan_ref(plan))
            .await
            .expect("Failed to get plan")
            .expect("Plan should exist")
    }

    pub async fn document(&self, plan: &Plan) -> String {
        self.repository
            .get_plan_document(&plan_ref(plan))
            .await
            .expect("Failed to get document")
            .expect("Plan should exist")
    }

    /// Records a decision through the human-action endpoint.
    pub async fn record(&self, feedback: &HumanFeedback) -> Step {
        HumanHandler::new(self.repository.clone(), TENANT)
            .record_feedback(feedback)
            .await
            .expect("Failed to record feedback")
    }
}

pub fn plan_ref(plan: &Plan) -> PlanRef {
    PlanRef::new(&plan.tenant_id, &plan.id)
}
