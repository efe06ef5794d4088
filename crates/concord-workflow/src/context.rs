//! Step inputs and results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What a step sees when it runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowStepContext {
    pub workflow_id: String,
    pub step_number: u32,
    /// One-based attempt number for this step within the current run.
    pub attempt: u32,
    /// Output of the previous completed step.
    pub previous_output: Option<Value>,
    /// State accumulated from all previously completed steps.
    pub state: HashMap<String, Value>,
}

impl WorkflowStepContext {
    /// Look up an accumulated state value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.state.get(key)
    }

    pub fn is_retry(&self) -> bool {
        self.attempt > 1
    }
}

/// Outcome of one step attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowStepResult {
    pub success: bool,
    pub output: Option<Value>,
    pub error: Option<String>,
    /// Merged into the workflow state when the step completes.
    pub state_updates: HashMap<String, Value>,
}

impl WorkflowStepResult {
    pub fn success(output: Value) -> Self {
        Self {
            success: true,
            output: Some(output),
            ..Default::default()
        }
    }

    /// Success with no output.
    pub fn done() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Add a state update.
    pub fn with_state(mut self, key: impl Into<String>, value: Value) -> Self {
        self.state_updates.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_builders() {
        let result = WorkflowStepResult::success(serde_json::json!({"rows": 3}))
            .with_state("rows", serde_json::json!(3));
        assert!(result.success);
        assert_eq!(result.state_updates["rows"], 3);

        let result = WorkflowStepResult::failure("disk full");
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("disk full"));
        assert!(result.output.is_none());
    }

    #[test]
    fn test_context_retry() {
        let ctx = WorkflowStepContext {
            attempt: 2,
            ..Default::default()
        };
        assert!(ctx.is_retry());
        assert!(ctx.get("missing").is_none());
    }
}
