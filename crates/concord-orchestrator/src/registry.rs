//! Agent registry and instance tracking.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use concord_protocols::{AgentDefinition, AutonomyLevel};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::OrchestratorError;

/// A spawned instance of a registered agent type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInstance {
    pub instance_id: Uuid,
    pub agent_type: String,
    /// Autonomy level at spawn time.
    pub autonomy: AutonomyLevel,
    pub spawned_at: DateTime<Utc>,
}

/// Registered agent types and their live instances.
///
/// Mutations are atomic per agent type; there is no registry-wide lock.
pub struct AgentRegistry {
    agents: DashMap<String, AgentDefinition>,
    instances: DashMap<String, Vec<AgentInstance>>,
    max_instances_per_agent: usize,
}

impl AgentRegistry {
    pub fn new(max_instances_per_agent: usize) -> Self {
        Self {
            agents: DashMap::new(),
            instances: DashMap::new(),
            max_instances_per_agent,
        }
    }

    /// Add or replace an agent type. Idempotent per type.
    pub fn register(&self, definition: AgentDefinition) {
        info!(
            agent_type = %definition.agent_type,
            autonomy = ?definition.autonomy,
            "Agent registered"
        );
        self.agents.insert(definition.agent_type.clone(), definition);
    }

    /// Remove an agent type and its instances.
    pub fn unregister(&self, agent_type: &str) -> Option<AgentDefinition> {
        self.instances.remove(agent_type);
        let removed = self.agents.remove(agent_type).map(|(_, def)| def);
        if removed.is_some() {
            info!(agent_type = %agent_type, "Agent unregistered");
        }
        removed
    }

    pub fn get(&self, agent_type: &str) -> Option<AgentDefinition> {
        self.agents.get(agent_type).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, agent_type: &str) -> bool {
        self.agents.contains_key(agent_type)
    }

    /// Registered agents sorted by type.
    pub fn list(&self) -> Vec<AgentDefinition> {
        let mut agents: Vec<_> = self.agents.iter().map(|entry| entry.value().clone()).collect();
        agents.sort_by(|a, b| a.agent_type.cmp(&b.agent_type));
        agents
    }

    /// Change an agent type's autonomy level.
    pub fn set_autonomy(&self, agent_type: &str, autonomy: AutonomyLevel) -> Result<(), OrchestratorError> {
        let mut entry = self
            .agents
            .get_mut(agent_type)
            .ok_or_else(|| OrchestratorError::AgentNotRegistered(agent_type.to_string()))?;
        let previous = entry.autonomy;
        entry.autonomy = autonomy;
        info!(agent_type = %agent_type, from = ?previous, to = ?autonomy, "Autonomy level changed");
        Ok(())
    }

    /// Resolve required agent types in request order, ignoring repeats.
    pub fn select(&self, agent_types: &[String]) -> Result<Vec<AgentDefinition>, OrchestratorError> {
        let mut seen = HashSet::new();
        let mut selected = Vec::with_capacity(agent_types.len());
        for agent_type in agent_types {
            if !seen.insert(agent_type.as_str()) {
                continue;
            }
            let definition = self
                .get(agent_type)
                .ok_or_else(|| OrchestratorError::AgentNotRegistered(agent_type.clone()))?;
            selected.push(definition);
        }
        debug!(count = selected.len(), "Selected agents");
        Ok(selected)
    }

    /// Spawn a new instance of a registered agent type.
    pub fn spawn_instance(&self, agent_type: &str) -> Result<AgentInstance, OrchestratorError> {
        let definition = self
            .get(agent_type)
            .ok_or_else(|| OrchestratorError::AgentNotRegistered(agent_type.to_string()))?;

        let mut live = self.instances.entry(agent_type.to_string()).or_default();
        if live.len() >= self.max_instances_per_agent {
            return Err(OrchestratorError::InstanceLimit {
                agent_type: agent_type.to_string(),
                limit: self.max_instances_per_agent,
            });
        }

        let instance = AgentInstance {
            instance_id: Uuid::new_v4(),
            agent_type: agent_type.to_string(),
            autonomy: definition.autonomy,
            spawned_at: Utc::now(),
        };
        live.push(instance.clone());

        info!(
            agent_type = %agent_type,
            instance_id = %instance.instance_id,
            live = live.len(),
            "Agent instance spawned"
        );
        Ok(instance)
    }

    /// Release a spawned instance. Returns whether it existed.
    pub fn release_instance(&self, agent_type: &str, instance_id: Uuid) -> bool {
        let Some(mut live) = self.instances.get_mut(agent_type) else {
            return false;
        };
        let before = live.len();
        live.retain(|instance| instance.instance_id != instance_id);
        before != live.len()
    }

    /// Live instances of an agent type.
    pub fn instances(&self, agent_type: &str) -> Vec<AgentInstance> {
        self.instances
            .get(agent_type)
            .map(|live| live.value().clone())
            .unwrap_or_default()
    }
}
