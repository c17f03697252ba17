//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::agents::{AgentContext, AgentResponse};
use crate::config::Config;
use crate::coordinator::{
    AgentCoordinator, AgentRegistration, CoordinatorError, TaskRecord, WorkflowConfig,
    WorkflowDescriptor,
};
use crate::llm::OpenRouterClient;

use super::types::*;

/// Shared application state.
pub struct AppState {
    /// The coordinator used for task execution
    pub coordinator: Arc<AgentCoordinator>,
    /// Default page size for task history listings
    pub default_history_limit: usize,
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let llm = Arc::new(OpenRouterClient::new(
        config.api_key.clone(),
        config.default_model.clone(),
    ));
    let coordinator = Arc::new(AgentCoordinator::new(llm));

    let state = Arc::new(AppState {
        coordinator,
        default_history_limit: config.task_history_limit,
    });

    let app = Router::new()
        .route("/api/health", get(health))
        .route("/api/tasks", post(execute_task).get(list_tasks))
        .route("/api/tasks/:id", get(get_task))
        .route("/api/agents", get(list_agents))
        .route("/api/agents/:id", get(get_agent))
        .route("/api/agents/:id/activate", post(activate_agent))
        .route("/api/agents/:id/deactivate", post(deactivate_agent))
        .route("/api/workflows", post(register_workflow).get(list_workflows))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn execute_task(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExecuteTaskRequest>,
) -> Result<Json<AgentResponse>, (StatusCode, Json<ErrorResponse>)> {
    let strategy = request.strategy.as_deref().unwrap_or("sequential");
    let context = request
        .context
        .unwrap_or_else(|| AgentContext::new(Uuid::new_v4().to_string()));

    state
        .coordinator
        .execute_task(&request.task, context, strategy)
        .await
        .map(Json)
        .map_err(error_response)
}

fn error_response(error: CoordinatorError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &error {
        CoordinatorError::UnknownStrategy(_) | CoordinatorError::EmptyTask => {
            StatusCode::BAD_REQUEST
        }
        CoordinatorError::NoSuitableAgent => StatusCode::NOT_FOUND,
        CoordinatorError::AgentFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<TaskRecord>> {
    let limit = query.limit.unwrap_or(state.default_history_limit);
    Json(state.coordinator.task_history(Some(limit)).await)
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TaskRecord>, (StatusCode, Json<ErrorResponse>)> {
    state
        .coordinator
        .task(&id)
        .await
        .map(Json)
        .ok_or_else(|| not_found(format!("Task {} not found", id)))
}

async fn list_agents(State(state): State<Arc<AppState>>) -> Json<Vec<AgentRegistration>> {
    Json(state.coordinator.agent_status().await)
}

async fn get_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<AgentRegistration>, (StatusCode, Json<ErrorResponse>)> {
    state
        .coordinator
        .agent(&id)
        .await
        .map(Json)
        .ok_or_else(|| not_found(format!("Agent {} not found", id)))
}

async fn activate_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ActivationResponse>, (StatusCode, Json<ErrorResponse>)> {
    set_agent_active(&state, id, true).await
}

async fn deactivate_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ActivationResponse>, (StatusCode, Json<ErrorResponse>)> {
    set_agent_active(&state, id, false).await
}

async fn set_agent_active(
    state: &AppState,
    id: String,
    active: bool,
) -> Result<Json<ActivationResponse>, (StatusCode, Json<ErrorResponse>)> {
    let known = if active {
        state.coordinator.activate_agent(&id).await
    } else {
        state.coordinator.deactivate_agent(&id).await
    };
    if known {
        Ok(Json(ActivationResponse {
            id,
            is_active: active,
        }))
    } else {
        Err(not_found(format!("Agent {} not found", id)))
    }
}

async fn register_workflow(
    State(state): State<Arc<AppState>>,
    Json(config): Json<WorkflowConfig>,
) -> Json<WorkflowDescriptor> {
    Json(state.coordinator.setup_automated_workflow(config).await)
}

async fn list_workflows(State(state): State<Arc<AppState>>) -> Json<Vec<WorkflowDescriptor>> {
    Json(state.coordinator.workflows().await)
}

fn not_found(message: String) -> (StatusCode, Json<ErrorResponse>) {
    (StatusCode::NOT_FOUND, Json(ErrorResponse { error: message }))
}
