//! Agent registry with activation and usage bookkeeping.
//!
//! Entries keep registration order: routing tie-breaks and status listings
//! are defined in terms of insertion order, so the registry is a `Vec`
//! rather than a map.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::agents::Agent;

/// Registry-visible state of one agent.
#[derive(Debug, Clone, Serialize)]
pub struct AgentRegistration {
    pub id: String,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub last_used: Option<DateTime<Utc>>,
    pub usage_count: u64,
}

/// A point-in-time view of one registry entry, taken before strategy
/// execution so no lock is held across agent invocations.
#[derive(Clone)]
pub struct AgentSnapshot {
    pub id: String,
    pub agent: Arc<dyn Agent>,
    pub keywords: Vec<String>,
    pub is_active: bool,
    pub last_used: Option<DateTime<Utc>>,
}

struct RegistryEntry {
    registration: AgentRegistration,
    agent: Arc<dyn Agent>,
}

/// Insertion-ordered registry of agents.
#[derive(Default)]
pub struct AgentRegistry {
    entries: Vec<RegistryEntry>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent. Agents start active with zero usage. Registering
    /// an id twice replaces the earlier entry in place.
    pub fn register(&mut self, agent: Arc<dyn Agent>) {
        let registration = AgentRegistration {
            id: agent.id().to_string(),
            name: agent.name().to_string(),
            description: agent.description().to_string(),
            is_active: true,
            last_used: None,
            usage_count: 0,
        };
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.registration.id == registration.id)
        {
            entry.registration = registration;
            entry.agent = agent;
        } else {
            self.entries.push(RegistryEntry {
                registration,
                agent,
            });
        }
    }

    /// Full registry snapshot, insertion order.
    pub fn snapshot(&self) -> Vec<AgentRegistration> {
        self.entries
            .iter()
            .map(|e| e.registration.clone())
            .collect()
    }

    /// Look up one registration by id.
    pub fn get(&self, id: &str) -> Option<AgentRegistration> {
        self.entries
            .iter()
            .find(|e| e.registration.id == id)
            .map(|e| e.registration.clone())
    }

    /// Set the activation flag. Idempotent; returns false for unknown ids.
    pub fn set_active(&mut self, id: &str, active: bool) -> bool {
        match self
            .entries
            .iter_mut()
            .find(|e| e.registration.id == id)
        {
            Some(entry) => {
                entry.registration.is_active = active;
                true
            }
            None => false,
        }
    }

    /// Record a successful invocation: bump the counter, stamp `last_used`.
    pub fn record_use(&mut self, id: &str, now: DateTime<Utc>) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.registration.id == id)
        {
            entry.registration.usage_count += 1;
            entry.registration.last_used = Some(now);
        }
    }

    /// Snapshots of every entry (active or not), insertion order.
    pub fn candidates(&self) -> Vec<AgentSnapshot> {
        self.entries
            .iter()
            .map(|e| AgentSnapshot {
                id: e.registration.id.clone(),
                agent: Arc::clone(&e.agent),
                keywords: e.agent.keywords().iter().map(|k| k.to_string()).collect(),
                is_active: e.registration.is_active,
                last_used: e.registration.last_used,
            })
            .collect()
    }
}
