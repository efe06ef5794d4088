//! Orchestrator settings.

use serde::{Deserialize, Serialize};

/// Engine settings, usually mapped from the `[orchestrator]` config section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Round budget for collaborative swarms.
    pub swarm_max_rounds: u32,
    /// Token in a swarm round's merged output that ends the swarm.
    pub convergence_marker: String,
    /// Token that makes a competitive result win immediately.
    pub completion_marker: String,
    /// Live instances allowed per agent type.
    pub max_instances_per_agent: usize,
    /// Notification channel for governance violations.
    pub compliance_channel: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            swarm_max_rounds: 5,
            convergence_marker: "COMPLETE".to_string(),
            completion_marker: "FINAL".to_string(),
            max_instances_per_agent: 8,
            compliance_channel: "compliance".to_string(),
        }
    }
}
