//! Workflow subcommand handlers.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use concord_checkpoint::{CheckpointManager, open_store};
use concord_config::Config;
use concord_workflow::{
    CancellationToken, WorkflowDefinition, WorkflowError, WorkflowExecutionResult, WorkflowExecutor,
    WorkflowStepContext, WorkflowStepResult,
};

use crate::adapters::{checkpoint_config, executor_config, is_durable};

/// Three steps: ingest, a transform that fails its first attempt, publish.
///
/// With `fail_middle` the transform fails on every attempt so the run halts
/// with a `Failed` checkpoint that `resume-demo` can pick up.
pub(crate) fn demo_workflow(config: &Config, workflow_id: &str, fail_middle: bool) -> WorkflowDefinition {
    WorkflowDefinition::new(workflow_id, "demo")
        .with_max_retry(config.workflow.max_retry_per_step)
        .with_step_timeout(Duration::from_secs(config.workflow.step_timeout_secs))
        .step(0, "ingest", |_ctx: WorkflowStepContext, _cancel: CancellationToken| async move {
            WorkflowStepResult::success(serde_json::json!({ "records": [3, 1, 2] }))
                .with_state("ingested", serde_json::json!(3))
        })
        .step(1, "transform", move |ctx: WorkflowStepContext, _cancel: CancellationToken| async move {
            if fail_middle || !ctx.is_retry() {
                return WorkflowStepResult::failure(format!("transform unavailable (attempt {})", ctx.attempt));
            }
            let mut records: Vec<u64> = ctx
                .previous_output
                .as_ref()
                .and_then(|v| v.get("records"))
                .and_then(|v| serde_json::from_value(v.clone()).ok())
                .unwrap_or_default();
            records.sort_unstable();
            WorkflowStepResult::success(serde_json::json!({ "records": records }))
                .with_state("transform_attempts", serde_json::json!(ctx.attempt))
        })
        .step(2, "publish", |ctx: WorkflowStepContext, _cancel: CancellationToken| async move {
            let ingested = ctx.get("ingested").cloned().unwrap_or(serde_json::Value::Null);
            WorkflowStepResult::success(serde_json::json!({
                "published": ctx.previous_output,
                "ingested": ingested,
            }))
            .with_state("published", serde_json::json!(true))
        })
}

async fn create_executor(config: &Config) -> Result<Arc<WorkflowExecutor>, Box<dyn std::error::Error>> {
    let store_config = checkpoint_config(config)?;
    if !is_durable(&store_config) {
        warn!("Checkpoint backend is in-memory; chains are lost when the process exits");
    }
    let store = open_store(&store_config).await?;
    Ok(Arc::new(WorkflowExecutor::with_config(
        CheckpointManager::new(store),
        executor_config(config),
    )))
}

/// Cancel `workflow_id` when Ctrl-C arrives.
fn cancel_on_ctrl_c(executor: &Arc<WorkflowExecutor>, workflow_id: &str) {
    let executor = Arc::clone(executor);
    let workflow_id = workflow_id.to_string();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!(workflow_id = %workflow_id, "Interrupt received, cancelling workflow");
            if let Err(e) = executor.cancel(&workflow_id) {
                warn!(workflow_id = %workflow_id, error = %e, "Cancel failed");
            }
        }
    });
}

fn report(result: Result<WorkflowExecutionResult, WorkflowError>) -> Result<(), Box<dyn std::error::Error>> {
    match result {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.success {
                eprintln!("Workflow halted: {}", result.error.as_deref().unwrap_or("unknown error"));
            }
            Ok(())
        }
        Err(e) if e.is_cancelled() => {
            eprintln!("{}", e);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Run the demonstration workflow.
pub(crate) async fn run_demo(
    config: &Config,
    id: Option<String>,
    fail_middle: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let workflow_id = id.unwrap_or_else(|| format!("demo-{}", Uuid::new_v4()));
    let executor = create_executor(config).await?;
    let definition = demo_workflow(config, &workflow_id, fail_middle);

    info!(workflow_id = %workflow_id, fail_middle, "Running demo workflow");
    cancel_on_ctrl_c(&executor, &workflow_id);
    report(executor.execute(definition).await)
}

/// Resume a demonstration workflow from its recorded chain.
pub(crate) async fn resume_demo(config: &Config, workflow_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let executor = create_executor(config).await?;
    executor.register(demo_workflow(config, workflow_id, false))?;

    info!(workflow_id = %workflow_id, "Resuming demo workflow");
    cancel_on_ctrl_c(&executor, workflow_id);
    report(executor.resume(workflow_id).await)
}

/// Print a workflow's checkpoint chain.
pub(crate) async fn list_checkpoints(config: &Config, workflow_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let executor = create_executor(config).await?;
    let chain = executor.checkpoint_chain(workflow_id).await?;

    if chain.is_empty() {
        println!("No checkpoints for workflow '{}'.", workflow_id);
        return Ok(());
    }

    println!("{:<6} {:<16} {:<10} {:<9} {}", "STEP", "NAME", "STATUS", "ATTEMPTS", "CREATED");
    println!("{}", "-".repeat(72));
    for cp in &chain {
        println!(
            "{:<6} {:<16} {:<10} {:<9} {}",
            cp.step_number,
            cp.step_name,
            cp.status.to_string(),
            cp.attempts,
            cp.created_at.to_rfc3339()
        );
        if let Some(error) = &cp.error {
            println!("       error: {}", error);
        }
    }
    Ok(())
}

/// Delete a workflow's checkpoint chain.
pub(crate) async fn purge(config: &Config, workflow_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let executor = create_executor(config).await?;
    let removed = executor.purge(workflow_id).await?;
    println!("Removed {} checkpoint(s) for workflow '{}'.", removed, workflow_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_checkpoint::{CheckpointStatus, FileCheckpointStore};
    use tempfile::TempDir;

    fn fast_config() -> Config {
        let mut config = Config::default();
        config.workflow.base_backoff_ms = 1;
        config.workflow.max_backoff_ms = 2;
        config
    }

    async fn file_executor(dir: &TempDir, config: &Config) -> WorkflowExecutor {
        let store = FileCheckpointStore::new(dir.path()).await.unwrap();
        WorkflowExecutor::with_config(CheckpointManager::new(Arc::new(store)), executor_config(config))
    }

    #[tokio::test]
    async fn test_demo_retries_transform_once() {
        let config = fast_config();
        let dir = TempDir::new().unwrap();
        let executor = file_executor(&dir, &config).await;

        let result = executor.execute(demo_workflow(&config, "demo-1", false)).await.unwrap();
        assert!(result.success);
        assert_eq!(result.completed_steps, 3);
        assert_eq!(result.state["transform_attempts"], 2);
        assert_eq!(result.checkpoints.len(), 3);
        assert_eq!(result.checkpoints[1].attempts, 2);
        assert_eq!(
            result.output.as_ref().and_then(|o| o.get("published")).cloned(),
            Some(serde_json::json!({ "records": [1, 2, 3] }))
        );
    }

    #[tokio::test]
    async fn test_demo_resumes_in_a_new_process() {
        let config = fast_config();
        let dir = TempDir::new().unwrap();

        {
            let executor = file_executor(&dir, &config).await;
            let result = executor.execute(demo_workflow(&config, "demo-2", true)).await.unwrap();
            assert!(!result.success);
            assert_eq!(result.checkpoints.len(), 2);
            assert_eq!(result.checkpoints[1].status, CheckpointStatus::Failed);
            assert_eq!(result.checkpoints[1].attempts, config.workflow.max_retry_per_step + 1);
        }

        let executor = file_executor(&dir, &config).await;
        executor.register(demo_workflow(&config, "demo-2", false)).unwrap();
        let result = executor.resume("demo-2").await.unwrap();
        assert!(result.success);
        assert_eq!(result.state["ingested"], 3);
        assert_eq!(
            result.checkpoints.iter().filter(|cp| cp.step_number == 0).count(),
            1
        );
    }
}
