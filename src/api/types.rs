//! Request and response types for the HTTP API.

use serde::{Deserialize, Serialize};

use crate::agents::AgentContext;

/// Body of `POST /api/tasks`.
#[derive(Debug, Deserialize)]
pub struct ExecuteTaskRequest {
    /// Free-text task to coordinate.
    pub task: String,
    /// Strategy name; defaults to `sequential`.
    #[serde(default)]
    pub strategy: Option<String>,
    /// Context for the run; a fresh session is created when omitted.
    #[serde(default)]
    pub context: Option<AgentContext>,
}

/// Error payload returned for failed requests.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Result of an activation toggle.
#[derive(Debug, Serialize)]
pub struct ActivationResponse {
    pub id: String,
    pub is_active: bool,
}

/// Query parameters for `GET /api/tasks`.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}
