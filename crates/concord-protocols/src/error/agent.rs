//! Agent errors.

use thiserror::Error;

use super::PortError;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Agent not found: {0}")]
    NotFound(String),

    #[error("Agent execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Agent call was cancelled")]
    Cancelled,

    #[error("Port error: {0}")]
    Port(#[from] PortError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_error_not_found() {
        let err = AgentError::NotFound("researcher".to_string());
        assert!(err.to_string().contains("Agent not found"));
        assert!(err.to_string().contains("researcher"));
    }

    #[test]
    fn test_agent_error_timeout() {
        let err = AgentError::Timeout(30);
        assert!(err.to_string().contains("30"));
        assert!(err.to_string().contains("seconds"));
    }

    #[test]
    fn test_agent_error_from_port() {
        let err: AgentError = PortError::Transport("connection reset".to_string()).into();
        assert!(matches!(err, AgentError::Port(_)));
        assert!(err.to_string().contains("connection reset"));
    }
}
