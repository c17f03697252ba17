//! Agents module - domain agent contract and implementations.
//!
//! An agent maps free text plus a context to a structured response. Each
//! agent owns its tools, a fixed system prompt, and a keyword table used
//! by the coordinator for routing.
//!
//! # Agent Types
//! - **FinancialAgent**: mortgage qualification, affordability, refinancing
//! - **PropertyProjectAgent**: demand letters, client emails, project status
//! - **MarketAnalysisAgent**: market statistics, rental comps, investment
//!
//! # Design Principles
//! - Agents are an interface plus a private tool list, not a hierarchy
//! - Classification tables are data, independently testable
//! - Tool failures degrade the response, they never fail the agent

mod classify;
mod financial;
mod market;
mod project;

pub use classify::classify;
pub use financial::FinancialAgent;
pub use market::MarketAnalysisAgent;
pub use project::PropertyProjectAgent;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::ChatMessage;

/// Context passed into every agent invocation.
///
/// Not owned by any entity - the coordinator passes it through, and only
/// the sequential strategy appends to `previous_results` between
/// invocations so later agents can see earlier output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentContext {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
    #[serde(default)]
    pub user_profile: HashMap<String, Value>,
    #[serde(default)]
    pub project_context: HashMap<String, Value>,
    #[serde(default)]
    pub previous_results: Vec<AgentResponse>,
}

impl AgentContext {
    /// Create a context for the given session with everything else empty.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: None,
            conversation_history: Vec::new(),
            user_profile: HashMap::new(),
            project_context: HashMap::new(),
            previous_results: Vec::new(),
        }
    }
}

/// A side-effect record produced during an agent invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentAction {
    #[serde(rename = "type")]
    pub action_type: String,
    pub data: Value,
}

/// Structured output of one agent invocation.
///
/// # Invariants
/// - `confidence` is always present, in [0, 1]
/// - Absent lists are empty sequences, never null, so combination logic
///   never branches on nullability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Natural-language result
    pub message: String,

    /// Side-effect records, in occurrence order
    #[serde(default)]
    pub actions: Vec<AgentAction>,

    /// Names of tools invoked, order-preserving
    #[serde(default)]
    pub tools_used: Vec<String>,

    /// Human-readable follow-up suggestions
    #[serde(default)]
    pub next_steps: Vec<String>,

    /// Confidence in [0, 1]
    pub confidence: f64,

    /// Whether a human should review this result
    #[serde(default)]
    pub needs_human_intervention: bool,

    /// Detailed result data (agent-specific)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Optional visualization payloads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visualizations: Option<Value>,
}

impl AgentResponse {
    /// Create a response with the given message and confidence.
    pub fn new(message: impl Into<String>, confidence: f64) -> Self {
        Self {
            message: message.into(),
            actions: Vec::new(),
            tools_used: Vec::new(),
            next_steps: Vec::new(),
            confidence,
            needs_human_intervention: false,
            data: None,
            visualizations: None,
        }
    }

    /// Add additional data to the response.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Flag the response for human review.
    pub fn with_human_intervention(mut self) -> Self {
        self.needs_human_intervention = true;
        self
    }
}

/// Errors that can occur in agent operations.
///
/// Tool failures and text-generation failures are handled inside
/// `execute` (logged and downgraded); these variants cover what remains.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AgentError {
    #[error("Text generation failed: {0}")]
    TextGeneration(String),

    #[error("Internal agent error: {0}")]
    Internal(String),
}

/// Base trait for all agents.
///
/// # Invariants
/// - `execute()` does not fail under normal tool failure; tool errors are
///   caught, logged, and omitted from the response actions
/// - Only an unrecoverable setup error may surface as `Err`
#[async_trait]
pub trait Agent: Send + Sync {
    /// Stable identifier used as the registry key.
    fn id(&self) -> &str;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Human-readable description of what this agent handles.
    fn description(&self) -> &str;

    /// Routing keywords: a task mentioning any of these is relevant to
    /// this agent. Matched as lower-case substrings.
    fn keywords(&self) -> &[&str];

    /// Execute the agent against free-text input.
    async fn execute(&self, input: &str, context: &AgentContext)
        -> Result<AgentResponse, AgentError>;
}

/// Fallback message used when the text-generation collaborator fails.
///
/// Kept as a shared constant so every agent degrades the same way.
pub(crate) const TEXT_GENERATION_FALLBACK: &str = "I'm sorry, I couldn't generate a full \
    write-up for this request right now. The figures below come from the available data.";

/// Invoke one tool, recording its result into `actions` and `tools_used`.
///
/// A tool error is caught and logged; the invocation is simply omitted
/// from the response. Returns the tool output when it produced data.
pub(crate) async fn run_tool(
    tool: &dyn crate::tools::Tool,
    params: Value,
    actions: &mut Vec<AgentAction>,
    tools_used: &mut Vec<String>,
) -> Option<Value> {
    match tool.execute(params).await {
        Ok(result) => {
            actions.push(AgentAction {
                action_type: "tool_result".to_string(),
                data: serde_json::json!({
                    "tool": tool.name(),
                    "result": result.clone(),
                }),
            });
            tools_used.push(tool.name().to_string());
            Some(result)
        }
        Err(e) => {
            tracing::warn!("Tool '{}' failed, omitting from response: {}", tool.name(), e);
            None
        }
    }
}

/// Build the message list for a text-generation call: the agent's system
/// prompt, then the prior conversation, then the current input.
pub(crate) fn build_messages(
    system_prompt: &str,
    context: &AgentContext,
    input: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(context.conversation_history.len() + 2);
    messages.push(ChatMessage::system(system_prompt));
    messages.extend(context.conversation_history.iter().cloned());
    messages.push(ChatMessage::user(input));
    messages
}
