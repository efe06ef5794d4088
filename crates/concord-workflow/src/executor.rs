//! Workflow executor - registry, lifecycle and public operations.

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;

use std::sync::Arc;

use concord_checkpoint::{CheckpointManager, WorkflowCheckpoint};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::definition::WorkflowDefinition;
use crate::error::WorkflowError;
use crate::result::WorkflowExecutionResult;
use crate::retry::RetryPolicy;
use crate::status::WorkflowStatus;

/// Executor-wide settings.
#[derive(Debug, Clone, Default)]
pub struct ExecutorConfig {
    pub retry: RetryPolicy,
}

pub(crate) struct WorkflowEntry {
    pub(crate) definition: Arc<WorkflowDefinition>,
    pub(crate) status: WorkflowStatus,
    /// Present while a run is in flight.
    pub(crate) cancellation: Option<CancellationToken>,
}

impl WorkflowEntry {
    fn idle(definition: Arc<WorkflowDefinition>) -> Self {
        Self {
            definition,
            status: WorkflowStatus::NotStarted,
            cancellation: None,
        }
    }

    fn running(definition: Arc<WorkflowDefinition>, token: CancellationToken) -> Self {
        Self {
            definition,
            status: WorkflowStatus::Running,
            cancellation: Some(token),
        }
    }
}

/// Runs workflows step by step, recording a checkpoint per step outcome.
///
/// One executor can drive many workflows concurrently; each workflow has
/// its own cancellation token, accumulated state and checkpoint chain.
pub struct WorkflowExecutor {
    pub(crate) checkpoints: CheckpointManager,
    pub(crate) workflows: DashMap<String, WorkflowEntry>,
    pub(crate) config: ExecutorConfig,
}

impl WorkflowExecutor {
    /// Create a new workflow executor.
    pub fn new(checkpoints: CheckpointManager) -> Self {
        Self::with_config(checkpoints, ExecutorConfig::default())
    }

    pub fn with_config(checkpoints: CheckpointManager, config: ExecutorConfig) -> Self {
        Self {
            checkpoints,
            workflows: DashMap::new(),
            config,
        }
    }

    /// The checkpoint manager this executor records into.
    pub fn checkpoints(&self) -> &CheckpointManager {
        &self.checkpoints
    }

    /// Register a definition without running it.
    ///
    /// Needed before `resume` in a process that did not run the workflow.
    pub fn register(&self, definition: WorkflowDefinition) -> Result<(), WorkflowError> {
        let definition = Arc::new(definition.validated()?);
        match self.workflows.entry(definition.id.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get().status == WorkflowStatus::Running {
                    return Err(WorkflowError::AlreadyRunning(definition.id.clone()));
                }
                entry.get_mut().definition = definition;
            }
            Entry::Vacant(entry) => {
                info!(workflow_id = %definition.id, steps = definition.steps.len(), "Workflow registered");
                entry.insert(WorkflowEntry::idle(definition));
            }
        }
        Ok(())
    }

    /// Run a workflow from its first step.
    ///
    /// A workflow that already has a checkpoint chain is rejected with
    /// [`WorkflowError::AlreadyExecuted`]; use `resume` or `purge`.
    pub async fn execute(&self, definition: WorkflowDefinition) -> Result<WorkflowExecutionResult, WorkflowError> {
        let definition = Arc::new(definition.validated()?);
        let workflow_id = definition.id.clone();

        if self.status(&workflow_id) == WorkflowStatus::Running {
            return Err(WorkflowError::AlreadyRunning(workflow_id));
        }
        if !self.checkpoints.chain(&workflow_id).await?.is_empty() {
            return Err(WorkflowError::AlreadyExecuted(workflow_id));
        }

        let token = CancellationToken::new();
        match self.workflows.entry(workflow_id.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get().status == WorkflowStatus::Running {
                    return Err(WorkflowError::AlreadyRunning(workflow_id));
                }
                entry.insert(WorkflowEntry::running(definition.clone(), token.clone()));
            }
            Entry::Vacant(entry) => {
                entry.insert(WorkflowEntry::running(definition.clone(), token.clone()));
            }
        }

        info!(
            workflow_id = %workflow_id,
            name = %definition.name,
            steps = definition.steps.len(),
            "Starting workflow"
        );
        self.run_from(definition, token, 0, Default::default(), None).await
    }

    /// Continue a workflow from the first step without a `Completed`
    /// checkpoint after the highest completed one.
    ///
    /// Completed steps are not re-run; their state updates are replayed.
    /// The resumed step starts a fresh retry sequence.
    pub async fn resume(&self, workflow_id: &str) -> Result<WorkflowExecutionResult, WorkflowError> {
        self.check_resumable(workflow_id)?;

        let plan = self
            .checkpoints
            .resume_plan(workflow_id)
            .await?
            .ok_or_else(|| WorkflowError::NoCheckpoints(workflow_id.to_string()))?;

        let token = CancellationToken::new();
        let definition = {
            let mut entry = self
                .workflows
                .get_mut(workflow_id)
                .ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))?;
            // status may have moved while the plan was loading
            Self::ensure_resumable(workflow_id, entry.status)?;
            entry.status = WorkflowStatus::Running;
            entry.cancellation = Some(token.clone());
            entry.definition.clone()
        };

        info!(
            workflow_id = %workflow_id,
            next_step = plan.next_step,
            last_status = %plan.last_status,
            "Resuming workflow"
        );
        self.run_from(definition, token, plan.next_step, plan.state, plan.previous_output)
            .await
    }

    /// Request cooperative cancellation of a running workflow.
    ///
    /// Returns `Ok(false)` when the workflow is registered but not running.
    pub fn cancel(&self, workflow_id: &str) -> Result<bool, WorkflowError> {
        let entry = self
            .workflows
            .get(workflow_id)
            .ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))?;

        match (&entry.status, &entry.cancellation) {
            (WorkflowStatus::Running, Some(token)) => {
                info!(workflow_id = %workflow_id, "Cancellation requested");
                token.cancel();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Current status; `Unknown` for unregistered workflows.
    pub fn status(&self, workflow_id: &str) -> WorkflowStatus {
        self.workflows
            .get(workflow_id)
            .map(|entry| entry.status)
            .unwrap_or(WorkflowStatus::Unknown)
    }

    /// The full checkpoint chain of a workflow.
    pub async fn checkpoint_chain(&self, workflow_id: &str) -> Result<Vec<WorkflowCheckpoint>, WorkflowError> {
        Ok(self.checkpoints.chain(workflow_id).await?)
    }

    /// Drop a workflow's checkpoint chain so it can be executed from scratch.
    pub async fn purge(&self, workflow_id: &str) -> Result<usize, WorkflowError> {
        if self.status(workflow_id) == WorkflowStatus::Running {
            return Err(WorkflowError::AlreadyRunning(workflow_id.to_string()));
        }
        let removed = self.checkpoints.purge(workflow_id).await?;
        if let Some(mut entry) = self.workflows.get_mut(workflow_id) {
            entry.status = WorkflowStatus::NotStarted;
            entry.cancellation = None;
        }
        Ok(removed)
    }

    /// Registered workflows and their statuses, sorted by ID.
    pub fn list(&self) -> Vec<(String, WorkflowStatus)> {
        let mut workflows: Vec<_> = self
            .workflows
            .iter()
            .map(|entry| (entry.key().clone(), entry.status))
            .collect();
        workflows.sort_by(|a, b| a.0.cmp(&b.0));
        workflows
    }

    fn check_resumable(&self, workflow_id: &str) -> Result<(), WorkflowError> {
        let status = self
            .workflows
            .get(workflow_id)
            .map(|entry| entry.status)
            .ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))?;
        Self::ensure_resumable(workflow_id, status)
    }

    fn ensure_resumable(workflow_id: &str, status: WorkflowStatus) -> Result<(), WorkflowError> {
        match status {
            WorkflowStatus::Running => Err(WorkflowError::AlreadyRunning(workflow_id.to_string())),
            WorkflowStatus::Completed => Err(WorkflowError::AlreadyCompleted(workflow_id.to_string())),
            _ => Ok(()),
        }
    }

    /// Finish a run: set the final status and drop its token.
    pub(crate) fn finish(&self, workflow_id: &str, status: WorkflowStatus) {
        if let Some(mut entry) = self.workflows.get_mut(workflow_id) {
            entry.status = status;
            entry.cancellation = None;
        } else {
            warn!(workflow_id = %workflow_id, "Finished a workflow that is no longer registered");
        }
    }
}
