//! Execution results.

use std::collections::{BTreeMap, HashMap};

use concord_checkpoint::{CheckpointStatus, WorkflowCheckpoint};
use serde::Serialize;
use serde_json::Value;

/// What `execute` and `resume` report back.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowExecutionResult {
    pub workflow_id: String,
    pub success: bool,
    /// Steps whose latest checkpoint is `Completed`.
    pub completed_steps: usize,
    /// Steps whose latest checkpoint is `Failed`.
    pub failed_steps: usize,
    /// The full checkpoint chain after this run.
    pub checkpoints: Vec<WorkflowCheckpoint>,
    pub error: Option<String>,
    /// Output of the last completed step.
    pub output: Option<Value>,
    /// Accumulated state at the end of the run.
    pub state: HashMap<String, Value>,
}

impl WorkflowExecutionResult {
    pub(crate) fn from_chain(
        workflow_id: &str,
        checkpoints: Vec<WorkflowCheckpoint>,
        error: Option<String>,
        output: Option<Value>,
        state: HashMap<String, Value>,
    ) -> Self {
        let mut latest: BTreeMap<u32, CheckpointStatus> = BTreeMap::new();
        for cp in &checkpoints {
            latest.insert(cp.step_number, cp.status);
        }
        let count = |status| latest.values().filter(|s| **s == status).count();

        Self {
            workflow_id: workflow_id.to_string(),
            success: error.is_none(),
            completed_steps: count(CheckpointStatus::Completed),
            failed_steps: count(CheckpointStatus::Failed),
            checkpoints,
            error,
            output,
            state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_use_latest_checkpoint_per_step() {
        let chain = vec![
            WorkflowCheckpoint::completed("wf", 0, "a", None, HashMap::new(), 1),
            WorkflowCheckpoint::failed("wf", 1, "b", "boom", 2),
            WorkflowCheckpoint::completed("wf", 1, "b", None, HashMap::new(), 1),
        ];
        let result = WorkflowExecutionResult::from_chain("wf", chain, None, None, HashMap::new());
        assert!(result.success);
        assert_eq!(result.completed_steps, 2);
        assert_eq!(result.failed_steps, 0);
        assert_eq!(result.checkpoints.len(), 3);
    }
}
