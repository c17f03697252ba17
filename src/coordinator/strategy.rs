//! Coordination strategies.
//!
//! A strategy maps one task onto one or more agent invocations and
//! combines their outputs:
//!
//! - `sequential`: relevant agents one at a time, each seeing the results
//!   of the agents before it; failures are skipped silently
//! - `parallel`: relevant agents concurrently against the same context
//!   snapshot; failures are dropped from the combination
//! - `smart-routing`: exactly one best-scoring agent; failures propagate
//!
//! Strategies run against registry snapshots so no lock is held across an
//! agent invocation.

use chrono::Utc;
use futures::future::join_all;

use super::combine::combine_responses;
use super::registry::AgentSnapshot;
use super::routing::{self, RoutingCandidate};
use super::CoordinatorError;
use crate::agents::{AgentContext, AgentResponse};

/// Named coordination strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Sequential,
    Parallel,
    SmartRouting,
}

impl Strategy {
    /// Parse a strategy name as used on the wire.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "sequential" => Some(Self::Sequential),
            "parallel" => Some(Self::Parallel),
            "smart-routing" => Some(Self::SmartRouting),
            _ => None,
        }
    }

    /// The wire name of this strategy.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
            Self::SmartRouting => "smart-routing",
        }
    }

    /// All registered strategies.
    pub fn all() -> &'static [Strategy] {
        &[Self::Sequential, Self::Parallel, Self::SmartRouting]
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Result of running one strategy: the combined response plus the ids of
/// agents that completed successfully (for usage bookkeeping).
pub(crate) struct StrategyOutcome {
    pub response: AgentResponse,
    pub used_agents: Vec<String>,
}

fn routing_view(snapshots: &[AgentSnapshot]) -> Vec<RoutingCandidate> {
    snapshots
        .iter()
        .map(|s| RoutingCandidate {
            keywords: s.keywords.clone(),
            is_active: s.is_active,
            last_used: s.last_used,
        })
        .collect()
}

/// Run the named strategy against a registry snapshot.
pub(crate) async fn run(
    strategy: Strategy,
    snapshots: &[AgentSnapshot],
    task: &str,
    context: &AgentContext,
) -> Result<StrategyOutcome, CoordinatorError> {
    match strategy {
        Strategy::Sequential => Ok(run_sequential(snapshots, task, context).await),
        Strategy::Parallel => Ok(run_parallel(snapshots, task, context).await),
        Strategy::SmartRouting => run_smart_routing(snapshots, task, context).await,
    }
}

/// Invoke relevant agents in registry order, threading earlier results to
/// later agents through `previous_results`.
async fn run_sequential(
    snapshots: &[AgentSnapshot],
    task: &str,
    context: &AgentContext,
) -> StrategyOutcome {
    let relevant = routing::relevant_indices(task, &routing_view(snapshots));

    let mut rolling_context = context.clone();
    let mut responses = Vec::new();
    let mut used_agents = Vec::new();

    for &i in &relevant {
        let snapshot = &snapshots[i];
        match snapshot.agent.execute(task, &rolling_context).await {
            Ok(response) => {
                rolling_context.previous_results.push(response.clone());
                used_agents.push(snapshot.id.clone());
                responses.push(response);
            }
            Err(e) => {
                tracing::warn!(
                    "Agent '{}' failed during sequential run, skipping: {}",
                    snapshot.id,
                    e
                );
            }
        }
    }

    StrategyOutcome {
        response: combine_responses(responses),
        used_agents,
    }
}

/// Invoke relevant agents concurrently against the same context snapshot
/// and combine whatever succeeded.
async fn run_parallel(
    snapshots: &[AgentSnapshot],
    task: &str,
    context: &AgentContext,
) -> StrategyOutcome {
    let relevant = routing::relevant_indices(task, &routing_view(snapshots));

    let invocations = relevant.iter().map(|&i| {
        let snapshot = &snapshots[i];
        async move { (snapshot, snapshot.agent.execute(task, context).await) }
    });
    let results = join_all(invocations).await;

    let mut responses = Vec::new();
    let mut used_agents = Vec::new();
    for (snapshot, result) in results {
        match result {
            Ok(response) => {
                used_agents.push(snapshot.id.clone());
                responses.push(response);
            }
            Err(e) => {
                tracing::warn!(
                    "Agent '{}' failed during parallel run, dropping: {}",
                    snapshot.id,
                    e
                );
            }
        }
    }

    StrategyOutcome {
        response: combine_responses(responses),
        used_agents,
    }
}

/// Invoke exactly the best-scoring agent. Unlike the other strategies, a
/// failure here propagates to the coordinator.
async fn run_smart_routing(
    snapshots: &[AgentSnapshot],
    task: &str,
    context: &AgentContext,
) -> Result<StrategyOutcome, CoordinatorError> {
    let view = routing_view(snapshots);
    let relevant = routing::relevant_indices(task, &view);
    let best = routing::select_best(task, &view, &relevant, Utc::now())
        .ok_or(CoordinatorError::NoSuitableAgent)?;

    let snapshot = &snapshots[best];
    tracing::debug!("Smart routing selected agent '{}'", snapshot.id);

    let response = snapshot.agent.execute(task, context).await.map_err(|e| {
        CoordinatorError::AgentFailed {
            agent_id: snapshot.id.clone(),
            message: e.to_string(),
        }
    })?;

    Ok(StrategyOutcome {
        response,
        used_agents: vec![snapshot.id.clone()],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_names() {
        assert_eq!(Strategy::parse("sequential"), Some(Strategy::Sequential));
        assert_eq!(Strategy::parse("parallel"), Some(Strategy::Parallel));
        assert_eq!(
            Strategy::parse("smart-routing"),
            Some(Strategy::SmartRouting)
        );
        assert_eq!(Strategy::parse("round-robin"), None);
    }

    #[test]
    fn test_names_round_trip() {
        for strategy in Strategy::all() {
            assert_eq!(Strategy::parse(strategy.name()), Some(*strategy));
        }
    }
}
