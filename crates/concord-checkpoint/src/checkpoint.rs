//! Checkpoint data structures and manager.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::CheckpointError;
use crate::recovery::ResumePlan;
use crate::store::CheckpointStore;

/// Terminal outcome of one workflow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStatus {
    Completed,
    Failed,
    Cancelled,
}

impl fmt::Display for CheckpointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CheckpointStatus::Completed => "completed",
            CheckpointStatus::Failed => "failed",
            CheckpointStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A durable record of one step's terminal outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowCheckpoint {
    /// Unique checkpoint ID.
    pub id: Uuid,
    /// Workflow this checkpoint belongs to.
    pub workflow_id: String,
    /// Step number the outcome is for.
    pub step_number: u32,
    /// Step name, for operators.
    #[serde(default)]
    pub step_name: String,
    /// Outcome.
    pub status: CheckpointStatus,
    /// Output snapshot of a completed step.
    #[serde(default)]
    pub output: Option<serde_json::Value>,
    /// State updates the step contributed; replayed on resume.
    #[serde(default)]
    pub state_updates: HashMap<String, serde_json::Value>,
    /// Error message of a failed or cancelled step.
    #[serde(default)]
    pub error: Option<String>,
    /// Number of attempts that produced this outcome.
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

fn default_attempts() -> u32 {
    1
}

impl WorkflowCheckpoint {
    fn new(
        workflow_id: impl Into<String>,
        step_number: u32,
        step_name: impl Into<String>,
        status: CheckpointStatus,
        attempts: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            workflow_id: workflow_id.into(),
            step_number,
            step_name: step_name.into(),
            status,
            output: None,
            state_updates: HashMap::new(),
            error: None,
            attempts,
            created_at: Utc::now(),
        }
    }

    /// Checkpoint for a step that succeeded.
    pub fn completed(
        workflow_id: impl Into<String>,
        step_number: u32,
        step_name: impl Into<String>,
        output: Option<serde_json::Value>,
        state_updates: HashMap<String, serde_json::Value>,
        attempts: u32,
    ) -> Self {
        let mut cp = Self::new(
            workflow_id,
            step_number,
            step_name,
            CheckpointStatus::Completed,
            attempts,
        );
        cp.output = output;
        cp.state_updates = state_updates;
        cp
    }

    /// Checkpoint for a step that exhausted its retries.
    pub fn failed(
        workflow_id: impl Into<String>,
        step_number: u32,
        step_name: impl Into<String>,
        error: impl Into<String>,
        attempts: u32,
    ) -> Self {
        let mut cp = Self::new(
            workflow_id,
            step_number,
            step_name,
            CheckpointStatus::Failed,
            attempts,
        );
        cp.error = Some(error.into());
        cp
    }

    /// Checkpoint for a step that observed cancellation.
    pub fn cancelled(
        workflow_id: impl Into<String>,
        step_number: u32,
        step_name: impl Into<String>,
        attempts: u32,
    ) -> Self {
        let mut cp = Self::new(
            workflow_id,
            step_number,
            step_name,
            CheckpointStatus::Cancelled,
            attempts,
        );
        cp.error = Some("cancelled".to_string());
        cp
    }

    pub fn is_completed(&self) -> bool {
        self.status == CheckpointStatus::Completed
    }
}

/// Facade over a [`CheckpointStore`] injected into the workflow executor.
#[derive(Clone)]
pub struct CheckpointManager {
    store: Arc<dyn CheckpointStore>,
}

impl CheckpointManager {
    /// Create a new checkpoint manager.
    pub fn new(store: Arc<dyn CheckpointStore>) -> Self {
        Self { store }
    }

    /// Append a checkpoint to its workflow's chain.
    pub async fn record(&self, checkpoint: WorkflowCheckpoint) -> Result<WorkflowCheckpoint, CheckpointError> {
        self.store.save(&checkpoint).await?;
        debug!(
            workflow_id = %checkpoint.workflow_id,
            step = checkpoint.step_number,
            status = %checkpoint.status,
            attempts = checkpoint.attempts,
            "Checkpoint recorded"
        );
        Ok(checkpoint)
    }

    /// The full chain of a workflow, ordered by step number.
    pub async fn chain(&self, workflow_id: &str) -> Result<Vec<WorkflowCheckpoint>, CheckpointError> {
        self.store.list_by_workflow(workflow_id).await
    }

    /// Compute where a workflow would resume, if it has any checkpoints.
    pub async fn resume_plan(&self, workflow_id: &str) -> Result<Option<ResumePlan>, CheckpointError> {
        let chain = self.store.list_by_workflow(workflow_id).await?;
        Ok(ResumePlan::from_chain(workflow_id, &chain))
    }

    /// Remove a workflow's chain. Returns how many checkpoints were removed.
    pub async fn purge(&self, workflow_id: &str) -> Result<usize, CheckpointError> {
        let removed = self.store.purge(workflow_id).await?;
        info!(workflow_id = %workflow_id, removed, "Purged checkpoint chain");
        Ok(removed)
    }

    /// Workflow IDs that currently have a chain.
    pub async fn workflows(&self) -> Result<Vec<String>, CheckpointError> {
        self.store.list_workflows().await
    }

    /// Get the underlying store.
    pub fn store(&self) -> &Arc<dyn CheckpointStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCheckpointStore;

    #[test]
    fn test_checkpoint_constructors() {
        let cp = WorkflowCheckpoint::completed(
            "wf-1",
            0,
            "fetch",
            Some(serde_json::json!("data")),
            HashMap::new(),
            1,
        );
        assert!(cp.is_completed());
        assert_eq!(cp.output, Some(serde_json::json!("data")));

        let cp = WorkflowCheckpoint::failed("wf-1", 1, "parse", "bad input", 4);
        assert_eq!(cp.status, CheckpointStatus::Failed);
        assert_eq!(cp.error.as_deref(), Some("bad input"));
        assert_eq!(cp.attempts, 4);

        let cp = WorkflowCheckpoint::cancelled("wf-1", 2, "store", 1);
        assert_eq!(cp.status, CheckpointStatus::Cancelled);
    }

    #[test]
    fn test_status_serialize() {
        assert_eq!(
            serde_json::to_string(&CheckpointStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
    }

    #[tokio::test]
    async fn test_manager_record_and_purge() {
        let manager = CheckpointManager::new(Arc::new(MemoryCheckpointStore::new()));

        manager
            .record(WorkflowCheckpoint::completed("wf-1", 0, "a", None, HashMap::new(), 1))
            .await
            .unwrap();
        manager
            .record(WorkflowCheckpoint::failed("wf-1", 1, "b", "boom", 3))
            .await
            .unwrap();

        let chain = manager.chain("wf-1").await.unwrap();
        assert_eq!(chain.len(), 2);

        let plan = manager.resume_plan("wf-1").await.unwrap().unwrap();
        assert_eq!(plan.next_step, 1);

        assert_eq!(manager.purge("wf-1").await.unwrap(), 2);
        assert!(manager.chain("wf-1").await.unwrap().is_empty());
        assert!(manager.resume_plan("wf-1").await.unwrap().is_none());
    }
}
