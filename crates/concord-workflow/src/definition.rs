//! Workflow definitions.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::context::{WorkflowStepContext, WorkflowStepResult};
use crate::error::WorkflowError;

/// Default retries after the first failed attempt of a step.
pub const DEFAULT_MAX_RETRY_PER_STEP: u32 = 3;

/// Default per-attempt timeout.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(300);

/// The unit of work behind a workflow step.
///
/// Handlers should observe `cancellation` at safe points and return
/// promptly once it fires; the executor waits for them to return.
#[async_trait]
pub trait StepHandler: Send + Sync {
    async fn run(&self, context: WorkflowStepContext, cancellation: CancellationToken) -> WorkflowStepResult;
}

#[async_trait]
impl<F, Fut> StepHandler for F
where
    F: Fn(WorkflowStepContext, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = WorkflowStepResult> + Send + 'static,
{
    async fn run(&self, context: WorkflowStepContext, cancellation: CancellationToken) -> WorkflowStepResult {
        (self)(context, cancellation).await
    }
}

/// One step of a workflow.
#[derive(Clone)]
pub struct WorkflowStepDefinition {
    pub number: u32,
    pub name: String,
    pub handler: Arc<dyn StepHandler>,
}

impl WorkflowStepDefinition {
    pub fn new(number: u32, name: impl Into<String>, handler: impl StepHandler + 'static) -> Self {
        Self {
            number,
            name: name.into(),
            handler: Arc::new(handler),
        }
    }
}

impl fmt::Debug for WorkflowStepDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowStepDefinition")
            .field("number", &self.number)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// An ordered sequence of steps with retry and timeout settings.
///
/// Definitions are immutable once handed to the executor.
#[derive(Debug, Clone)]
pub struct WorkflowDefinition {
    pub id: String,
    pub name: String,
    pub steps: Vec<WorkflowStepDefinition>,
    /// Retries after the first failed attempt; a step runs at most
    /// `max_retry_per_step + 1` times per run.
    pub max_retry_per_step: u32,
    pub step_timeout: Duration,
}

impl WorkflowDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            steps: Vec::new(),
            max_retry_per_step: DEFAULT_MAX_RETRY_PER_STEP,
            step_timeout: DEFAULT_STEP_TIMEOUT,
        }
    }

    /// Append a step.
    pub fn step(mut self, number: u32, name: impl Into<String>, handler: impl StepHandler + 'static) -> Self {
        self.steps.push(WorkflowStepDefinition::new(number, name, handler));
        self
    }

    pub fn with_max_retry(mut self, max_retry_per_step: u32) -> Self {
        self.max_retry_per_step = max_retry_per_step;
        self
    }

    pub fn with_step_timeout(mut self, step_timeout: Duration) -> Self {
        self.step_timeout = step_timeout;
        self
    }

    /// Check the definition and put steps in execution order.
    pub(crate) fn validated(mut self) -> Result<Self, WorkflowError> {
        if self.id.trim().is_empty() {
            return Err(WorkflowError::InvalidDefinition("workflow id is empty".to_string()));
        }
        if self.steps.is_empty() {
            return Err(WorkflowError::InvalidDefinition(format!(
                "workflow {} has no steps",
                self.id
            )));
        }
        if self.step_timeout.is_zero() {
            return Err(WorkflowError::InvalidDefinition(format!(
                "workflow {} has a zero step timeout",
                self.id
            )));
        }

        let mut seen = HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.number) {
                return Err(WorkflowError::InvalidDefinition(format!(
                    "workflow {} has duplicate step number {}",
                    self.id, step.number
                )));
            }
        }

        self.steps.sort_by_key(|s| s.number);
        Ok(self)
    }

    /// Steps at or after `step_number`, in order.
    pub fn steps_from(&self, step_number: u32) -> impl Iterator<Item = &WorkflowStepDefinition> {
        self.steps.iter().filter(move |s| s.number >= step_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn noop(_ctx: WorkflowStepContext, _cancel: CancellationToken) -> WorkflowStepResult {
        WorkflowStepResult::done()
    }

    #[test]
    fn test_validated_sorts_steps() {
        let def = WorkflowDefinition::new("wf", "Workflow")
            .step(2, "c", noop)
            .step(0, "a", noop)
            .step(1, "b", noop)
            .validated()
            .unwrap();
        let order: Vec<&str> = def.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
        assert_eq!(def.steps_from(1).count(), 2);
    }

    #[test]
    fn test_duplicate_step_numbers_rejected() {
        let result = WorkflowDefinition::new("wf", "Workflow")
            .step(0, "a", noop)
            .step(0, "b", noop)
            .validated();
        assert!(matches!(result, Err(WorkflowError::InvalidDefinition(msg)) if msg.contains("duplicate")));
    }

    #[test]
    fn test_empty_definition_rejected() {
        assert!(WorkflowDefinition::new("wf", "Workflow").validated().is_err());
        assert!(
            WorkflowDefinition::new("wf", "Workflow")
                .step(0, "a", noop)
                .with_step_timeout(Duration::ZERO)
                .validated()
                .is_err()
        );
    }

    #[test]
    fn test_defaults() {
        let def = WorkflowDefinition::new("wf", "Workflow");
        assert_eq!(def.max_retry_per_step, 3);
        assert_eq!(def.step_timeout, Duration::from_secs(300));
    }
}
