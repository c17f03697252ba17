//! Automated workflow registration.
//!
//! Workflows are declarative: the coordinator records the trigger and the
//! steps it implies, and an external scheduler polls the registrations.
//! No timer or cron runs inside this service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Caller-supplied workflow configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Display name, e.g. "milestone follow-up".
    pub name: String,
    /// What fires the workflow, e.g. "construction milestone reached".
    pub trigger: String,
    /// Agent to run when the trigger fires.
    pub agent_id: String,
    /// Optional recurrence hint for the external scheduler, e.g. "daily".
    #[serde(default)]
    pub schedule: Option<String>,
}

/// Registered workflow: the identifier and the steps the trigger implies.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowDescriptor {
    pub id: String,
    pub name: String,
    pub trigger: String,
    pub agent_id: String,
    pub schedule: Option<String>,
    pub steps: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Expand a configuration into its registered descriptor.
pub(crate) fn build_descriptor(config: WorkflowConfig) -> WorkflowDescriptor {
    let mut steps = vec![
        format!("Watch for trigger '{}'", config.trigger),
        format!("Run agent '{}' with the configured task", config.agent_id),
        "Record the agent response in the task history".to_string(),
    ];
    if let Some(schedule) = &config.schedule {
        steps.push(format!("Repeat on schedule '{}'", schedule));
    }

    WorkflowDescriptor {
        id: format!("workflow_{}", Uuid::new_v4()),
        name: config.name,
        trigger: config.trigger,
        agent_id: config.agent_id,
        schedule: config.schedule,
        steps,
        created_at: Utc::now(),
    }
}
