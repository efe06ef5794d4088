//! Workflow lifecycle status.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a workflow.
///
/// `NotStarted -> Running -> {Completed | Failed | Cancelled}`; `Failed` and
/// `Cancelled` return to `Running` only through an explicit resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    NotStarted,
    Running,
    Completed,
    Failed,
    Cancelled,
    /// Not registered with this executor.
    Unknown,
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowStatus::Completed)
    }

    /// Whether an explicit resume may move this workflow back to `Running`.
    pub fn is_resumable(&self) -> bool {
        matches!(
            self,
            WorkflowStatus::NotStarted | WorkflowStatus::Failed | WorkflowStatus::Cancelled
        )
    }
}
