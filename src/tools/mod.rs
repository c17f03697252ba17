//! Tool system for the agents.
//!
//! Tools are the "hands" of an agent - named units of work that fetch or
//! compute domain data. Each tool is exclusively owned by one agent and
//! invoked based on how the agent classifies the incoming request.
//!
//! Tool failures never surface to callers: the owning agent catches them,
//! logs a warning, and omits the result from its response actions.

use async_trait::async_trait;
use serde_json::Value;

/// Trait for implementing tools.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (within its owning agent).
    fn name(&self) -> &str;

    /// A description of what this tool does.
    fn description(&self) -> &str;

    /// JSON schema for the tool's parameters.
    ///
    /// Documentation-only: parameters are not enforced at the type level.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the given parameters.
    async fn execute(&self, params: Value) -> anyhow::Result<Value>;
}
