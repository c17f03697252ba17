//! In-memory task record store (non-persistent).
//!
//! Records are retained for the process lifetime; there is no eviction.
//! Once a record reaches a terminal status it is never modified again.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agents::{AgentContext, AgentResponse};

/// Status of a coordination task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Processing => write!(f, "processing"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A stored, status-tracked representation of one coordination request.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
    pub id: String,
    /// `"coordinator"` for top-level tasks.
    pub agent_id: String,
    /// Original task text.
    pub input: String,
    /// The context used for this run.
    pub context: AgentContext,
    pub status: TaskStatus,
    /// Present iff status is `completed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AgentResponse>,
    /// Present iff status is `failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Present iff status is terminal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    /// Create a pending record for the given input.
    pub fn pending(id: String, input: &str, context: AgentContext) -> Self {
        Self {
            id,
            agent_id: "coordinator".to_string(),
            input: input.to_string(),
            context,
            status: TaskStatus::Pending,
            result: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// In-memory task record store.
///
/// Records are appended in creation order; `history` walks that order in
/// reverse, which is `created_at` descending with a stable tie-break.
#[derive(Default)]
pub struct TaskStore {
    records: Vec<TaskRecord>,
    index: HashMap<String, usize>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new record.
    pub fn insert(&mut self, record: TaskRecord) {
        self.index.insert(record.id.clone(), self.records.len());
        self.records.push(record);
    }

    /// Flip a pending record to processing.
    pub fn mark_processing(&mut self, id: &str) -> Result<(), String> {
        let record = self.get_mut(id)?;
        if record.status.is_terminal() {
            return Err(format!("Task {} already finalized", id));
        }
        record.status = TaskStatus::Processing;
        Ok(())
    }

    /// Finalize a record as completed with its result.
    pub fn complete(&mut self, id: &str, result: AgentResponse) -> Result<(), String> {
        let record = self.get_mut(id)?;
        if record.status.is_terminal() {
            return Err(format!("Task {} already finalized", id));
        }
        record.status = TaskStatus::Completed;
        record.result = Some(result);
        record.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Finalize a record as failed with a human-readable error.
    pub fn fail(&mut self, id: &str, error: &str) -> Result<(), String> {
        let record = self.get_mut(id)?;
        if record.status.is_terminal() {
            return Err(format!("Task {} already finalized", id));
        }
        record.status = TaskStatus::Failed;
        record.error = Some(error.to_string());
        record.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Look up one record by id.
    pub fn get(&self, id: &str) -> Option<TaskRecord> {
        self.index.get(id).map(|&i| self.records[i].clone())
    }

    /// Records newest first, optionally capped.
    pub fn history(&self, limit: Option<usize>) -> Vec<TaskRecord> {
        let iter = self.records.iter().rev().cloned();
        match limit {
            Some(n) => iter.take(n).collect(),
            None => iter.collect(),
        }
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut TaskRecord, String> {
        let i = *self
            .index
            .get(id)
            .ok_or_else(|| format!("Task {} not found", id))?;
        Ok(&mut self.records[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> TaskRecord {
        TaskRecord::pending(id.to_string(), "input", AgentContext::new("s"))
    }

    #[test]
    fn test_created_pending_then_transitions() {
        let mut store = TaskStore::new();
        store.insert(record("t1"));

        let stored = store.get("t1").unwrap();
        assert_eq!(stored.status, TaskStatus::Pending);
        assert!(stored.completed_at.is_none());

        store.mark_processing("t1").unwrap();
        assert_eq!(store.get("t1").unwrap().status, TaskStatus::Processing);

        store
            .complete("t1", AgentResponse::new("done", 0.9))
            .unwrap();
        let done = store.get("t1").unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert!(done.result.is_some());
        assert!(done.error.is_none());
        assert!(done.completed_at.is_some());
    }

    #[test]
    fn test_terminal_records_are_immutable() {
        let mut store = TaskStore::new();
        store.insert(record("t1"));
        store.fail("t1", "boom").unwrap();

        assert!(store.mark_processing("t1").is_err());
        assert!(store.complete("t1", AgentResponse::new("late", 0.5)).is_err());
        assert!(store.fail("t1", "again").is_err());

        let stored = store.get("t1").unwrap();
        assert_eq!(stored.status, TaskStatus::Failed);
        assert_eq!(stored.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_history_is_newest_first() {
        let mut store = TaskStore::new();
        store.insert(record("t1"));
        store.insert(record("t2"));
        store.insert(record("t3"));

        let history = store.history(None);
        let ids: Vec<&str> = history.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["t3", "t2", "t1"]);

        let capped = store.history(Some(2));
        assert_eq!(capped.len(), 2);
        assert_eq!(capped[0].id, "t3");
    }

    #[test]
    fn test_status_display() {
        assert_eq!(format!("{}", TaskStatus::Pending), "pending");
        assert_eq!(format!("{}", TaskStatus::Processing), "processing");
        assert_eq!(format!("{}", TaskStatus::Completed), "completed");
        assert_eq!(format!("{}", TaskStatus::Failed), "failed");
    }
}
