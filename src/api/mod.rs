//! HTTP API for the agent coordinator.
//!
//! ## Endpoints
//!
//! - `POST /api/tasks` - Submit a task for coordination
//! - `GET /api/tasks` - List task history, newest first
//! - `GET /api/tasks/{id}` - Get one task record
//! - `GET /api/agents` - List agent registrations
//! - `GET /api/agents/{id}` - Get one agent registration
//! - `POST /api/agents/{id}/activate` - Activate an agent
//! - `POST /api/agents/{id}/deactivate` - Deactivate an agent
//! - `POST /api/workflows` - Register an automated workflow
//! - `GET /api/workflows` - List registered workflows
//! - `GET /api/health` - Health check

mod routes;
mod types;

pub use routes::serve;
pub use types::*;
