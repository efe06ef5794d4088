//! Step loop, retry and checkpointing for a single run.

use std::collections::HashMap;
use std::sync::Arc;

use concord_checkpoint::WorkflowCheckpoint;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::context::{WorkflowStepContext, WorkflowStepResult};
use crate::definition::{WorkflowDefinition, WorkflowStepDefinition};
use crate::error::WorkflowError;
use crate::executor::WorkflowExecutor;
use crate::result::WorkflowExecutionResult;
use crate::status::WorkflowStatus;

/// How one step ended after all of its attempts.
enum StepOutcome {
    Completed { result: WorkflowStepResult, attempts: u32 },
    Failed { error: String, attempts: u32 },
    Cancelled { attempts: u32 },
}

impl WorkflowExecutor {
    /// Run steps at or after `start_step` with the given carried state.
    pub(crate) async fn run_from(
        &self,
        definition: Arc<WorkflowDefinition>,
        token: CancellationToken,
        start_step: u32,
        mut state: HashMap<String, Value>,
        mut previous_output: Option<Value>,
    ) -> Result<WorkflowExecutionResult, WorkflowError> {
        let workflow_id = definition.id.as_str();

        for step in definition.steps_from(start_step) {
            let base = WorkflowStepContext {
                workflow_id: workflow_id.to_string(),
                step_number: step.number,
                attempt: 0,
                previous_output: previous_output.clone(),
                state: state.clone(),
            };

            match self.run_step(&definition, step, base, &token).await {
                StepOutcome::Completed { result, attempts } => {
                    state.extend(result.state_updates.clone());
                    let checkpoint = WorkflowCheckpoint::completed(
                        workflow_id,
                        step.number,
                        step.name.clone(),
                        result.output.clone(),
                        result.state_updates,
                        attempts,
                    );
                    self.persist(workflow_id, checkpoint).await?;
                    previous_output = result.output;
                    debug!(workflow_id = %workflow_id, step = step.number, attempts, "Step completed");
                }
                StepOutcome::Failed { error, attempts } => {
                    let checkpoint = WorkflowCheckpoint::failed(
                        workflow_id,
                        step.number,
                        step.name.clone(),
                        error.clone(),
                        attempts,
                    );
                    self.persist(workflow_id, checkpoint).await?;
                    self.finish(workflow_id, WorkflowStatus::Failed);
                    error!(
                        workflow_id = %workflow_id,
                        step = step.number,
                        attempts,
                        error = %error,
                        "Step exhausted retries, workflow halted"
                    );

                    let chain = self.chain_or_fail(workflow_id).await?;
                    let message = format!("step {} ({}) failed: {}", step.number, step.name, error);
                    return Ok(WorkflowExecutionResult::from_chain(
                        workflow_id,
                        chain,
                        Some(message),
                        previous_output,
                        state,
                    ));
                }
                StepOutcome::Cancelled { attempts } => {
                    let checkpoint =
                        WorkflowCheckpoint::cancelled(workflow_id, step.number, step.name.clone(), attempts);
                    self.persist(workflow_id, checkpoint).await?;
                    self.finish(workflow_id, WorkflowStatus::Cancelled);
                    warn!(workflow_id = %workflow_id, step = step.number, "Workflow cancelled");
                    return Err(WorkflowError::Cancelled {
                        workflow_id: workflow_id.to_string(),
                        step: step.number,
                    });
                }
            }
        }

        let chain = self.chain_or_fail(workflow_id).await?;
        self.finish(workflow_id, WorkflowStatus::Completed);
        info!(workflow_id = %workflow_id, checkpoints = chain.len(), "Workflow completed");
        Ok(WorkflowExecutionResult::from_chain(
            workflow_id,
            chain,
            None,
            previous_output,
            state,
        ))
    }

    /// Attempt one step until it succeeds, exhausts its retries or is cancelled.
    async fn run_step(
        &self,
        definition: &WorkflowDefinition,
        step: &WorkflowStepDefinition,
        base: WorkflowStepContext,
        token: &CancellationToken,
    ) -> StepOutcome {
        let max_attempts = definition.max_retry_per_step.saturating_add(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            if token.is_cancelled() {
                return StepOutcome::Cancelled { attempts: attempt - 1 };
            }

            let context = WorkflowStepContext {
                attempt,
                ..base.clone()
            };
            debug!(
                workflow_id = %definition.id,
                step = step.number,
                attempt,
                "Running step '{}'",
                step.name
            );

            let outcome =
                tokio::time::timeout(definition.step_timeout, step.handler.run(context, token.clone())).await;

            // a step that returns after cancellation was requested is cancelled
            if token.is_cancelled() {
                return StepOutcome::Cancelled { attempts: attempt };
            }

            match outcome {
                Ok(result) if result.success => {
                    return StepOutcome::Completed { result, attempts: attempt };
                }
                Ok(result) => {
                    last_error = result
                        .error
                        .unwrap_or_else(|| "step reported failure".to_string());
                }
                Err(_) => {
                    last_error = format!("step timed out after {:?}", definition.step_timeout);
                }
            }

            if attempt < max_attempts {
                let delay = self.config.retry.delay_for_attempt(attempt - 1);
                warn!(
                    workflow_id = %definition.id,
                    step = step.number,
                    "Step failed (attempt {}/{}): {}, retrying in {:?}",
                    attempt,
                    max_attempts,
                    last_error,
                    delay
                );
                tokio::select! {
                    _ = token.cancelled() => return StepOutcome::Cancelled { attempts: attempt },
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        StepOutcome::Failed {
            error: last_error,
            attempts: max_attempts,
        }
    }

    /// Record a checkpoint; a store failure fails the workflow.
    async fn persist(&self, workflow_id: &str, checkpoint: WorkflowCheckpoint) -> Result<(), WorkflowError> {
        if let Err(e) = self.checkpoints.record(checkpoint).await {
            error!(workflow_id = %workflow_id, error = %e, "Failed to record checkpoint");
            self.finish(workflow_id, WorkflowStatus::Failed);
            return Err(e.into());
        }
        Ok(())
    }

    async fn chain_or_fail(&self, workflow_id: &str) -> Result<Vec<WorkflowCheckpoint>, WorkflowError> {
        match self.checkpoints.chain(workflow_id).await {
            Ok(chain) => Ok(chain),
            Err(e) => {
                self.finish(workflow_id, WorkflowStatus::Failed);
                Err(e.into())
            }
        }
    }
}
