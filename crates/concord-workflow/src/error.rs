//! Workflow errors.

use concord_checkpoint::CheckpointError;
use thiserror::Error;

/// Errors returned by the workflow executor.
///
/// Step failures are not errors: they end in a `Failed` checkpoint and an
/// unsuccessful [`WorkflowExecutionResult`](crate::WorkflowExecutionResult).
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The workflow was never registered.
    #[error("Workflow not found: {0}")]
    NotFound(String),

    /// The workflow has no checkpoints to resume from.
    #[error("Workflow {0} has no checkpoints")]
    NoCheckpoints(String),

    /// Execution observed a cancellation request.
    #[error("Workflow {workflow_id} was cancelled at step {step}")]
    Cancelled { workflow_id: String, step: u32 },

    #[error("Workflow {0} is already running")]
    AlreadyRunning(String),

    /// A checkpoint chain already exists; resume or purge it first.
    #[error("Workflow {0} already has a checkpoint chain; resume or purge it")]
    AlreadyExecuted(String),

    /// Completed workflows are terminal.
    #[error("Workflow {0} already completed")]
    AlreadyCompleted(String),

    #[error("Invalid workflow definition: {0}")]
    InvalidDefinition(String),

    /// Checkpoint persistence failed.
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}

impl WorkflowError {
    /// Whether the caller made a mistake, as opposed to infrastructure failing.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, WorkflowError::Checkpoint(_) | WorkflowError::Cancelled { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkflowError::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors() {
        assert!(WorkflowError::NotFound("wf".to_string()).is_user_error());
        assert!(WorkflowError::NoCheckpoints("wf".to_string()).is_user_error());
        assert!(!WorkflowError::Checkpoint(CheckpointError::Unavailable("db".to_string())).is_user_error());
    }

    #[test]
    fn test_cancelled_display() {
        let err = WorkflowError::Cancelled {
            workflow_id: "wf-9".to_string(),
            step: 2,
        };
        assert!(err.is_cancelled());
        assert!(!err.is_user_error());
        assert_eq!(err.to_string(), "Workflow wf-9 was cancelled at step 2");
    }

    #[test]
    fn test_no_checkpoints_display() {
        let err = WorkflowError::NoCheckpoints("wf-1".to_string());
        assert!(err.to_string().contains("no checkpoints"));
    }
}
