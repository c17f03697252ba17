//! Agent coordination: the facade, strategies, routing, and task records.
//!
//! The `AgentCoordinator` is the single entry point for task execution
//! and for introspecting agent and task state. It owns the agent
//! registry, the task record store, and the workflow registrations. It is
//! constructed once at process start and injected into the HTTP layer -
//! never a hidden global - so tests build isolated instances freely.
//!
//! # Task lifecycle
//! Every submission creates a task record in `pending`, flips it to
//! `processing`, runs the named strategy, and finalizes the record as
//! `completed` or `failed`. A failure is both recorded and returned to
//! the caller: a failed task is never silently lost.

mod combine;
mod registry;
mod routing;
mod strategy;
mod task_store;
mod workflow;

pub use registry::AgentRegistration;
pub use strategy::Strategy;
pub use task_store::{TaskRecord, TaskStatus};
pub use workflow::{WorkflowConfig, WorkflowDescriptor};

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::agents::{
    Agent, AgentContext, AgentResponse, FinancialAgent, MarketAnalysisAgent, PropertyProjectAgent,
};
use crate::datasource::{
    FixtureMarketStats, FixtureMortgageRates, FixtureRentalComps, MarketDataSource,
    MortgageDataSource, RentalDataSource,
};
use crate::llm::LlmClient;
use registry::AgentRegistry;
use task_store::TaskStore;

/// Errors surfaced by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinatorError {
    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("No suitable agent found for this task")]
    NoSuitableAgent,

    #[error("Task input must not be empty")]
    EmptyTask,

    #[error("Agent '{agent_id}' failed: {message}")]
    AgentFailed { agent_id: String, message: String },
}

/// Top-level facade for task execution and agent/task introspection.
pub struct AgentCoordinator {
    registry: RwLock<AgentRegistry>,
    tasks: RwLock<TaskStore>,
    workflows: RwLock<Vec<WorkflowDescriptor>>,
}

impl AgentCoordinator {
    /// Create a coordinator with the standard agent set backed by the
    /// deterministic fixture data sources.
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self::with_sources(
            llm,
            Arc::new(FixtureMortgageRates),
            Arc::new(FixtureMarketStats),
            Arc::new(FixtureRentalComps),
        )
    }

    /// Create a coordinator with the standard agent set and the given
    /// data sources.
    pub fn with_sources(
        llm: Arc<dyn LlmClient>,
        mortgage: Arc<dyn MortgageDataSource>,
        market: Arc<dyn MarketDataSource>,
        rentals: Arc<dyn RentalDataSource>,
    ) -> Self {
        Self::with_agents(vec![
            Arc::new(FinancialAgent::new(Arc::clone(&llm), mortgage)),
            Arc::new(PropertyProjectAgent::new(Arc::clone(&llm))),
            Arc::new(MarketAnalysisAgent::new(llm, market, rentals)),
        ])
    }

    /// Create a coordinator over an explicit agent set. Registration
    /// order becomes the routing tie-break order.
    pub fn with_agents(agents: Vec<Arc<dyn Agent>>) -> Self {
        let mut registry = AgentRegistry::new();
        for agent in agents {
            registry.register(agent);
        }
        Self {
            registry: RwLock::new(registry),
            tasks: RwLock::new(TaskStore::new()),
            workflows: RwLock::new(Vec::new()),
        }
    }

    /// Execute a task with the named strategy.
    ///
    /// The task record is finalized in every path: `completed` with the
    /// combined response, or `failed` with the error that is returned.
    pub async fn execute_task(
        &self,
        task: &str,
        context: AgentContext,
        strategy_name: &str,
    ) -> Result<AgentResponse, CoordinatorError> {
        let task_id = generate_task_id();
        {
            let mut tasks = self.tasks.write().await;
            tasks.insert(TaskRecord::pending(task_id.clone(), task, context.clone()));
            if let Err(e) = tasks.mark_processing(&task_id) {
                tracing::error!("Failed to mark task processing: {}", e);
            }
        }
        tracing::info!(
            "Executing task {} with strategy '{}'",
            task_id,
            strategy_name
        );

        match self.run_strategy(task, &context, strategy_name).await {
            Ok(outcome) => {
                let now = Utc::now();
                {
                    let mut registry = self.registry.write().await;
                    for agent_id in &outcome.used_agents {
                        registry.record_use(agent_id, now);
                    }
                }
                let mut tasks = self.tasks.write().await;
                if let Err(e) = tasks.complete(&task_id, outcome.response.clone()) {
                    tracing::error!("Failed to finalize task {}: {}", task_id, e);
                }
                Ok(outcome.response)
            }
            Err(error) => {
                let mut tasks = self.tasks.write().await;
                if let Err(e) = tasks.fail(&task_id, &error.to_string()) {
                    tracing::error!("Failed to finalize task {}: {}", task_id, e);
                }
                Err(error)
            }
        }
    }

    async fn run_strategy(
        &self,
        task: &str,
        context: &AgentContext,
        strategy_name: &str,
    ) -> Result<strategy::StrategyOutcome, CoordinatorError> {
        if task.trim().is_empty() {
            return Err(CoordinatorError::EmptyTask);
        }
        let strategy = Strategy::parse(strategy_name)
            .ok_or_else(|| CoordinatorError::UnknownStrategy(strategy_name.to_string()))?;

        let snapshots = self.registry.read().await.candidates();
        strategy::run(strategy, &snapshots, task, context).await
    }

    /// Full registry snapshot, registration order.
    pub async fn agent_status(&self) -> Vec<AgentRegistration> {
        self.registry.read().await.snapshot()
    }

    /// Look up one agent registration.
    pub async fn agent(&self, id: &str) -> Option<AgentRegistration> {
        self.registry.read().await.get(id)
    }

    /// Activate an agent. Idempotent; returns false for unknown ids.
    pub async fn activate_agent(&self, id: &str) -> bool {
        self.registry.write().await.set_active(id, true)
    }

    /// Deactivate an agent. Idempotent; returns false for unknown ids.
    pub async fn deactivate_agent(&self, id: &str) -> bool {
        self.registry.write().await.set_active(id, false)
    }

    /// Task records, newest first, optionally capped.
    pub async fn task_history(&self, limit: Option<usize>) -> Vec<TaskRecord> {
        self.tasks.read().await.history(limit)
    }

    /// Look up one task record.
    pub async fn task(&self, id: &str) -> Option<TaskRecord> {
        self.tasks.read().await.get(id)
    }

    /// Register an automated workflow and return its descriptor.
    ///
    /// Registration is declarative: an external scheduler polls these and
    /// submits tasks; no timer runs here.
    pub async fn setup_automated_workflow(&self, config: WorkflowConfig) -> WorkflowDescriptor {
        let descriptor = workflow::build_descriptor(config);
        tracing::info!(
            "Registered workflow {} ({})",
            descriptor.id,
            descriptor.name
        );
        self.workflows.write().await.push(descriptor.clone());
        descriptor
    }

    /// All registered workflows, registration order.
    pub async fn workflows(&self) -> Vec<WorkflowDescriptor> {
        self.workflows.read().await.clone()
    }
}

/// Collision-resistant task id: millisecond timestamp plus random suffix.
fn generate_task_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: u32 = rand::random();
    format!("task_{}_{:08x}", millis, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentError;
    use crate::llm::testing::ScriptedLlm;
    use async_trait::async_trait;
    use std::collections::HashSet;

    struct StubAgent {
        id: &'static str,
        keywords: &'static [&'static str],
        fail: bool,
        tools: &'static [&'static str],
    }

    #[async_trait]
    impl Agent for StubAgent {
        fn id(&self) -> &str {
            self.id
        }
        fn name(&self) -> &str {
            self.id
        }
        fn description(&self) -> &str {
            "stub agent"
        }
        fn keywords(&self) -> &[&str] {
            self.keywords
        }
        async fn execute(
            &self,
            _input: &str,
            context: &AgentContext,
        ) -> Result<AgentResponse, AgentError> {
            if self.fail {
                return Err(AgentError::Internal("stub failure".to_string()));
            }
            let mut response = AgentResponse::new(
                format!("{} saw {} previous", self.id, context.previous_results.len()),
                0.8,
            );
            response.tools_used = self.tools.iter().map(|t| t.to_string()).collect();
            Ok(response)
        }
    }

    fn stub(id: &'static str, keywords: &'static [&'static str]) -> Arc<dyn Agent> {
        Arc::new(StubAgent {
            id,
            keywords,
            fail: false,
            tools: &[],
        })
    }

    fn failing_stub(id: &'static str, keywords: &'static [&'static str]) -> Arc<dyn Agent> {
        Arc::new(StubAgent {
            id,
            keywords,
            fail: true,
            tools: &[],
        })
    }

    fn standard_coordinator() -> AgentCoordinator {
        AgentCoordinator::new(Arc::new(ScriptedLlm::new("Scripted analysis.")))
    }

    #[tokio::test]
    async fn test_registry_snapshot_after_construction() {
        let coordinator = standard_coordinator();
        let status = coordinator.agent_status().await;

        let ids: Vec<&str> = status.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["financial", "property-project", "market-analysis"]);
        for registration in status {
            assert!(registration.is_active);
            assert_eq!(registration.usage_count, 0);
            assert!(registration.last_used.is_none());
        }
    }

    #[tokio::test]
    async fn test_unknown_strategy_records_failed_task() {
        let coordinator = standard_coordinator();
        let result = coordinator
            .execute_task("do something", AgentContext::new("s"), "round-robin")
            .await;

        assert_eq!(
            result.unwrap_err(),
            CoordinatorError::UnknownStrategy("round-robin".to_string())
        );

        let history = coordinator.task_history(None).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, TaskStatus::Failed);
        assert!(history[0].error.as_ref().unwrap().contains("round-robin"));
        assert!(history[0].completed_at.is_some());
    }

    #[tokio::test]
    async fn test_empty_task_records_failed_task() {
        let coordinator = standard_coordinator();
        let result = coordinator
            .execute_task("   ", AgentContext::new("s"), "sequential")
            .await;

        assert_eq!(result.unwrap_err(), CoordinatorError::EmptyTask);
        assert_eq!(
            coordinator.task_history(None).await[0].status,
            TaskStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_deactivated_agent_excluded_from_smart_routing() {
        let coordinator = standard_coordinator();
        assert!(coordinator.deactivate_agent("financial").await);

        // Only financial keywords hit here, and financial is switched off.
        let result = coordinator
            .execute_task(
                "mortgage refinance preapproval",
                AgentContext::new("s"),
                "smart-routing",
            )
            .await;

        assert_eq!(result.unwrap_err(), CoordinatorError::NoSuitableAgent);
        let record = &coordinator.task_history(None).await[0];
        assert_eq!(record.status, TaskStatus::Failed);
        assert!(record.error.as_ref().unwrap().contains("No suitable agent"));
    }

    #[tokio::test]
    async fn test_activate_deactivate_unknown_agent() {
        let coordinator = standard_coordinator();
        assert!(!coordinator.deactivate_agent("nonexistent").await);
        assert!(!coordinator.activate_agent("nonexistent").await);

        // Idempotent on known agents.
        assert!(coordinator.deactivate_agent("financial").await);
        assert!(coordinator.deactivate_agent("financial").await);
        assert!(coordinator.activate_agent("financial").await);
        assert!(coordinator.agent("financial").await.unwrap().is_active);
    }

    #[tokio::test]
    async fn test_smart_routing_mortgage_scenario() {
        let coordinator = standard_coordinator();
        let response = coordinator
            .execute_task(
                "Calculate mortgage qualification for client with $80,000 income",
                AgentContext::new("s"),
                "smart-routing",
            )
            .await
            .unwrap();

        assert!(response
            .tools_used
            .contains(&"mortgage_qualification".to_string()));

        // Usage bookkeeping lands on the selected agent only.
        let financial = coordinator.agent("financial").await.unwrap();
        assert_eq!(financial.usage_count, 1);
        assert!(financial.last_used.is_some());
        let market = coordinator.agent("market-analysis").await.unwrap();
        assert_eq!(market.usage_count, 0);
    }

    #[tokio::test]
    async fn test_sequential_threads_previous_results() {
        let coordinator = AgentCoordinator::with_agents(vec![
            stub("first", &["alpha"]),
            stub("second", &["alpha"]),
        ]);
        let response = coordinator
            .execute_task("alpha task", AgentContext::new("s"), "sequential")
            .await
            .unwrap();

        assert_eq!(
            response.message,
            "Agent 1: first saw 0 previous\n\nAgent 2: second saw 1 previous"
        );
    }

    #[tokio::test]
    async fn test_sequential_skips_failing_agent_silently() {
        let coordinator = AgentCoordinator::with_agents(vec![
            failing_stub("broken", &["alpha"]),
            stub("working", &["alpha"]),
        ]);
        let response = coordinator
            .execute_task("alpha task", AgentContext::new("s"), "sequential")
            .await
            .unwrap();

        // Single surviving response: identity combination, no error.
        assert_eq!(response.message, "working saw 0 previous");

        assert_eq!(coordinator.agent("broken").await.unwrap().usage_count, 0);
        assert_eq!(coordinator.agent("working").await.unwrap().usage_count, 1);
        assert_eq!(
            coordinator.task_history(None).await[0].status,
            TaskStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_parallel_agents_share_context_snapshot() {
        let coordinator = AgentCoordinator::with_agents(vec![
            stub("first", &["alpha"]),
            stub("second", &["alpha"]),
        ]);
        let response = coordinator
            .execute_task("alpha task", AgentContext::new("s"), "parallel")
            .await
            .unwrap();

        // Neither agent sees the other's output.
        assert_eq!(
            response.message,
            "Agent 1: first saw 0 previous\n\nAgent 2: second saw 0 previous"
        );
        assert_eq!(response.confidence, 0.8);
    }

    #[tokio::test]
    async fn test_parallel_drops_failures_from_combination() {
        let coordinator = AgentCoordinator::with_agents(vec![
            failing_stub("broken", &["alpha"]),
            stub("working", &["alpha"]),
        ]);
        let response = coordinator
            .execute_task("alpha task", AgentContext::new("s"), "parallel")
            .await
            .unwrap();

        assert_eq!(response.message, "working saw 0 previous");
    }

    #[tokio::test]
    async fn test_smart_routing_propagates_agent_failure() {
        let coordinator =
            AgentCoordinator::with_agents(vec![failing_stub("broken", &["alpha"])]);
        let result = coordinator
            .execute_task("alpha task", AgentContext::new("s"), "smart-routing")
            .await;

        match result.unwrap_err() {
            CoordinatorError::AgentFailed { agent_id, .. } => assert_eq!(agent_id, "broken"),
            other => panic!("expected AgentFailed, got {:?}", other),
        }
        assert_eq!(
            coordinator.task_history(None).await[0].status,
            TaskStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_no_keyword_hits_fail_open_to_all_agents() {
        let coordinator = standard_coordinator();
        let response = coordinator
            .execute_task("hello there", AgentContext::new("s"), "sequential")
            .await
            .unwrap();

        assert!(response.message.contains("Agent 1:"));
        assert!(response.message.contains("Agent 2:"));
        assert!(response.message.contains("Agent 3:"));
    }

    #[tokio::test]
    async fn test_task_history_newest_first() {
        let coordinator = AgentCoordinator::with_agents(vec![stub("only", &["alpha"])]);
        for input in ["T1", "T2", "T3"] {
            coordinator
                .execute_task(input, AgentContext::new("s"), "sequential")
                .await
                .unwrap();
        }

        let history = coordinator.task_history(None).await;
        let inputs: Vec<&str> = history.iter().map(|r| r.input.as_str()).collect();
        assert_eq!(inputs, vec!["T3", "T2", "T1"]);

        let capped = coordinator.task_history(Some(2)).await;
        assert_eq!(capped.len(), 2);
    }

    #[tokio::test]
    async fn test_completed_task_record_has_result() {
        let coordinator = AgentCoordinator::with_agents(vec![stub("only", &["alpha"])]);
        coordinator
            .execute_task("alpha task", AgentContext::new("s"), "sequential")
            .await
            .unwrap();

        let record = &coordinator.task_history(None).await[0];
        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.agent_id, "coordinator");
        assert!(record.result.is_some());
        assert!(record.error.is_none());
        assert!(record.completed_at.is_some());
        assert!(record.id.starts_with("task_"));
    }

    #[tokio::test]
    async fn test_workflow_registration() {
        let coordinator = standard_coordinator();
        let descriptor = coordinator
            .setup_automated_workflow(WorkflowConfig {
                name: "milestone follow-up".to_string(),
                trigger: "construction milestone".to_string(),
                agent_id: "property-project".to_string(),
                schedule: Some("daily".to_string()),
            })
            .await;

        assert!(descriptor.id.starts_with("workflow_"));
        assert_eq!(coordinator.workflows().await.len(), 1);
    }

    #[test]
    fn test_task_ids_unique() {
        let ids: HashSet<String> = (0..100).map(|_| generate_task_id()).collect();
        assert_eq!(ids.len(), 100);
    }
}
