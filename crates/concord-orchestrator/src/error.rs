//! Orchestrator errors.

use concord_protocols::{AgentError, PortError};
use thiserror::Error;
use uuid::Uuid;

/// Errors from the orchestration engine.
///
/// Ethics, governance and approval rejections are responses, not errors.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Agent type not registered: {0}")]
    AgentNotRegistered(String),

    #[error("Task {0} names no required agent types")]
    NoRequiredAgents(Uuid),

    #[error("Instance limit reached for agent type {agent_type} ({limit})")]
    InstanceLimit { agent_type: String, limit: usize },

    /// The agent runtime failed.
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    /// A collaborator port failed.
    #[error("Port error: {0}")]
    Port(#[from] PortError),

    #[error("Task {0} was cancelled")]
    Cancelled(Uuid),

    #[error("Invalid coordination pattern: {0}")]
    InvalidPattern(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_limit_display() {
        let err = OrchestratorError::InstanceLimit {
            agent_type: "analyst".to_string(),
            limit: 2,
        };
        assert_eq!(err.to_string(), "Instance limit reached for agent type analyst (2)");
    }

    #[test]
    fn test_from_agent_error() {
        let err: OrchestratorError = AgentError::ExecutionFailed("llm down".to_string()).into();
        assert!(matches!(err, OrchestratorError::Agent(_)));
        assert!(err.to_string().contains("llm down"));
    }
}
