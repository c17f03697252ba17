//! # propdesk
//!
//! Self-hosted coordination service for real-estate AI agents.
//!
//! This library provides:
//! - An agent coordinator that routes free-text tasks to domain agents
//! - Three coordination strategies: sequential, parallel, smart-routing
//! - An in-memory, status-tracked task record store
//! - HTTP APIs for task submission and agent/task introspection
//!
//! ## Architecture
//!
//! ```text
//!        ┌──────────────────────────────────┐
//!        │        AgentCoordinator          │
//!        │  (registry · strategies · tasks) │
//!        └───────┬──────────┬───────────┬───┘
//!                │          │           │
//!                ▼          ▼           ▼
//!        ┌──────────┐ ┌──────────┐ ┌──────────┐
//!        │financial │ │ property │ │  market  │
//!        │  agent   │ │ project  │ │ analysis │
//!        └──────────┘ └──────────┘ └──────────┘
//! ```
//!
//! ## Task Flow
//! 1. Receive a task via API with a strategy name
//! 2. The strategy selects relevant agents by keyword routing
//! 3. Each agent calls the text-generation collaborator and its own tools
//! 4. Responses are combined and the task record is finalized
//!
//! ## Modules
//! - `coordinator`: the coordinator facade, strategies, routing, task store
//! - `agents`: agent contract and the three concrete domain agents
//! - `tools`: tool trait implemented by each agent's domain tools
//! - `datasource`: pluggable domain data sources (deterministic fixtures)
//! - `llm`: text-generation collaborator (OpenRouter)

pub mod agents;
pub mod api;
pub mod config;
pub mod coordinator;
pub mod datasource;
pub mod llm;
pub mod tools;

pub use config::Config;
pub use coordinator::{AgentCoordinator, CoordinatorError, Strategy, TaskRecord, TaskStatus};
