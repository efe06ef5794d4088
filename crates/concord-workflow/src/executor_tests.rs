use super::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use concord_checkpoint::{
    CheckpointError, CheckpointStatus, CheckpointStore, MemoryCheckpointStore,
};
use serde_json::json;
use tokio::sync::Notify;

use crate::context::{WorkflowStepContext, WorkflowStepResult};
use crate::definition::StepHandler;

fn executor() -> Arc<WorkflowExecutor> {
    executor_with_store(Arc::new(MemoryCheckpointStore::new()))
}

fn executor_with_store(store: Arc<dyn CheckpointStore>) -> Arc<WorkflowExecutor> {
    let config = ExecutorConfig {
        retry: RetryPolicy::fixed(Duration::from_millis(1), Duration::from_millis(5), 2.0),
    };
    Arc::new(WorkflowExecutor::with_config(CheckpointManager::new(store), config))
}

/// Step that succeeds and writes its number into state under `key`.
fn writes(key: &'static str) -> impl StepHandler {
    move |ctx: WorkflowStepContext, _cancel: CancellationToken| {
        std::future::ready(
            WorkflowStepResult::success(json!(ctx.step_number)).with_state(key, json!(ctx.step_number)),
        )
    }
}

/// Step that fails its first `failures` invocations, counting every call.
fn flaky(failures: u32, calls: Arc<AtomicU32>) -> impl StepHandler {
    move |ctx: WorkflowStepContext, _cancel: CancellationToken| {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        let result = if n < failures {
            WorkflowStepResult::failure(format!("transient failure {}", n + 1))
        } else {
            WorkflowStepResult::success(json!(format!("step {} ok", ctx.step_number)))
        };
        std::future::ready(result)
    }
}

#[tokio::test]
async fn test_all_steps_complete_and_state_flows() {
    let executor = executor();
    let def = WorkflowDefinition::new("wf-ok", "Happy path")
        .step(0, "load", writes("loaded"))
        .step(1, "check", |ctx: WorkflowStepContext, _cancel: CancellationToken| async move {
            match ctx.get("loaded") {
                Some(v) if *v == json!(0) => WorkflowStepResult::success(json!("checked")),
                _ => WorkflowStepResult::failure("state missing"),
            }
        })
        .step(2, "store", |ctx: WorkflowStepContext, _cancel: CancellationToken| async move {
            WorkflowStepResult::success(ctx.previous_output.unwrap_or_default())
        });

    let result = executor.execute(def).await.unwrap();
    assert!(result.success);
    assert_eq!(result.completed_steps, 3);
    assert_eq!(result.failed_steps, 0);
    assert_eq!(result.output, Some(json!("checked")));
    assert_eq!(result.checkpoints.len(), 3);
    assert!(result.checkpoints.iter().all(|cp| cp.is_completed()));
    assert_eq!(executor.status("wf-ok"), WorkflowStatus::Completed);
}

#[tokio::test]
async fn test_exhausted_step_halts_with_k_plus_one_checkpoints() {
    let executor = executor();
    let never_reached = Arc::new(AtomicU32::new(0));
    let failing_calls = Arc::new(AtomicU32::new(0));

    let def = WorkflowDefinition::new("wf-halt", "Halts at step 2")
        .with_max_retry(2)
        .step(0, "a", writes("a"))
        .step(1, "b", writes("b"))
        .step(2, "c", flaky(u32::MAX, failing_calls.clone()))
        .step(3, "d", flaky(0, never_reached.clone()));

    let result = executor.execute(def).await.unwrap();
    assert!(!result.success);
    assert_eq!(result.completed_steps, 2);
    assert_eq!(result.failed_steps, 1);
    assert_eq!(result.checkpoints.len(), 3);

    let last = result.checkpoints.last().unwrap();
    assert_eq!(last.status, CheckpointStatus::Failed);
    assert_eq!(last.step_number, 2);
    assert_eq!(last.attempts, 3);
    assert_eq!(failing_calls.load(Ordering::SeqCst), 3);
    assert_eq!(never_reached.load(Ordering::SeqCst), 0);
    assert!(result.error.unwrap().contains("transient failure 3"));
    assert_eq!(executor.status("wf-halt"), WorkflowStatus::Failed);
}

#[tokio::test]
async fn test_fails_twice_then_succeeds() {
    let executor = executor();
    let calls = Arc::new(AtomicU32::new(0));
    let def = WorkflowDefinition::new("wf-retry", "Retry")
        .with_max_retry(2)
        .step(0, "flaky", flaky(2, calls.clone()));

    let result = executor.execute(def).await.unwrap();
    assert!(result.success);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(result.checkpoints.len(), 1);
    assert_eq!(result.checkpoints[0].attempts, 3);
}

#[tokio::test]
async fn test_three_step_workflow_with_one_transient_failure() {
    let executor = executor();
    let calls = Arc::new(AtomicU32::new(0));
    let def = WorkflowDefinition::new("wf-demo", "Demo")
        .step(0, "extract", writes("extracted"))
        .step(1, "transform", flaky(1, calls.clone()))
        .step(2, "load", writes("loaded"));

    let result = executor.execute(def).await.unwrap();
    assert!(result.success);
    assert_eq!(result.completed_steps, 3);
    assert_eq!(result.checkpoints.len(), 3);
    assert_eq!(result.checkpoints[1].attempts, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_resume_reattempts_only_failed_step() {
    let executor = executor();
    let first_calls = Arc::new(AtomicU32::new(0));
    let second_calls = Arc::new(AtomicU32::new(0));

    // step 1 fails both attempts of the first run, then succeeds
    let def = WorkflowDefinition::new("wf-resume", "Resume")
        .with_max_retry(1)
        .step(0, "first", {
            let calls = first_calls.clone();
            move |_ctx: WorkflowStepContext, _cancel: CancellationToken| {
                calls.fetch_add(1, Ordering::SeqCst);
                std::future::ready(WorkflowStepResult::success(json!("one")).with_state("seed", json!(42)))
            }
        })
        .step(1, "second", flaky(2, second_calls.clone()))
        .step(2, "third", |ctx: WorkflowStepContext, _cancel: CancellationToken| async move {
            WorkflowStepResult::success(json!({
                "seed": ctx.get("seed").cloned(),
                "previous": ctx.previous_output,
            }))
        });

    let first = executor.execute(def).await.unwrap();
    assert!(!first.success);
    assert_eq!(executor.status("wf-resume"), WorkflowStatus::Failed);

    let resumed = executor.resume("wf-resume").await.unwrap();
    assert!(resumed.success);
    assert_eq!(first_calls.load(Ordering::SeqCst), 1);
    assert_eq!(second_calls.load(Ordering::SeqCst), 3);
    assert_eq!(resumed.completed_steps, 3);
    assert_eq!(resumed.failed_steps, 0);
    assert_eq!(resumed.checkpoints.len(), 4);
    assert_eq!(resumed.output.unwrap()["seed"], 42);
    assert_eq!(executor.status("wf-resume"), WorkflowStatus::Completed);

    let again = executor.resume("wf-resume").await;
    assert!(matches!(again, Err(WorkflowError::AlreadyCompleted(_))));
}

#[tokio::test]
async fn test_resume_errors() {
    let executor = executor();
    assert!(matches!(
        executor.resume("nope").await,
        Err(WorkflowError::NotFound(_))
    ));

    let def = WorkflowDefinition::new("wf-empty", "Empty chain").step(0, "a", writes("a"));
    executor.register(def).unwrap();
    assert_eq!(executor.status("wf-empty"), WorkflowStatus::NotStarted);
    assert!(matches!(
        executor.resume("wf-empty").await,
        Err(WorkflowError::NoCheckpoints(_))
    ));
}

#[tokio::test]
async fn test_execute_rejects_existing_chain_until_purged() {
    let executor = executor();
    let def = || WorkflowDefinition::new("wf-twice", "Twice").step(0, "a", writes("a"));

    executor.execute(def()).await.unwrap();
    assert!(matches!(
        executor.execute(def()).await,
        Err(WorkflowError::AlreadyExecuted(_))
    ));

    assert_eq!(executor.purge("wf-twice").await.unwrap(), 1);
    assert_eq!(executor.status("wf-twice"), WorkflowStatus::NotStarted);
    assert!(executor.execute(def()).await.unwrap().success);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_mid_step_records_cancelled_checkpoint() {
    let executor = executor();
    let started = Arc::new(Notify::new());
    let blocking_runs = Arc::new(AtomicU32::new(0));

    let def = WorkflowDefinition::new("wf-cancel", "Cancel")
        .step(0, "a", writes("a"))
        .step(1, "wait", {
            let started = started.clone();
            let runs = blocking_runs.clone();
            move |_ctx: WorkflowStepContext, cancel: CancellationToken| {
                let started = started.clone();
                let run = runs.fetch_add(1, Ordering::SeqCst);
                async move {
                    if run > 0 {
                        return WorkflowStepResult::success(json!("resumed"));
                    }
                    started.notify_one();
                    cancel.cancelled().await;
                    WorkflowStepResult::failure("interrupted")
                }
            }
        })
        .step(2, "c", writes("c"));

    let handle = tokio::spawn({
        let executor = executor.clone();
        async move { executor.execute(def).await }
    });

    started.notified().await;
    assert_eq!(executor.status("wf-cancel"), WorkflowStatus::Running);
    assert!(executor.cancel("wf-cancel").unwrap());

    let result = handle.await.unwrap();
    match result {
        Err(WorkflowError::Cancelled { workflow_id, step }) => {
            assert_eq!(workflow_id, "wf-cancel");
            assert_eq!(step, 1);
        }
        other => panic!("expected cancellation, got {:?}", other.map(|r| r.success)),
    }
    assert_eq!(executor.status("wf-cancel"), WorkflowStatus::Cancelled);

    let chain = executor.checkpoint_chain("wf-cancel").await.unwrap();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[1].status, CheckpointStatus::Cancelled);
    assert!(!executor.cancel("wf-cancel").unwrap());

    let resumed = executor.resume("wf-cancel").await.unwrap();
    assert!(resumed.success);
    assert_eq!(resumed.completed_steps, 3);
}

#[tokio::test]
async fn test_cancel_unknown_workflow() {
    let executor = executor();
    assert!(matches!(executor.cancel("ghost"), Err(WorkflowError::NotFound(_))));
    assert_eq!(executor.status("ghost"), WorkflowStatus::Unknown);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_workflows_are_isolated() {
    let executor = executor();
    let mut handles = Vec::new();
    for i in 0..6 {
        let executor = executor.clone();
        handles.push(tokio::spawn(async move {
            let id = format!("wf-{}", i);
            let def = WorkflowDefinition::new(id.clone(), "Concurrent")
                .step(0, "seed", move |_ctx: WorkflowStepContext, _cancel: CancellationToken| async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    WorkflowStepResult::done().with_state("owner", json!(i))
                })
                .step(1, "echo", |ctx: WorkflowStepContext, _cancel: CancellationToken| async move {
                    WorkflowStepResult::success(ctx.get("owner").cloned().unwrap_or_default())
                });
            (id, executor.execute(def).await.unwrap())
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let (id, result) = handle.await.unwrap();
        assert!(result.success);
        assert_eq!(result.output, Some(json!(i)));
        assert!(result.checkpoints.iter().all(|cp| cp.workflow_id == id));
        assert_eq!(result.checkpoints.len(), 2);
    }
    assert_eq!(executor.list().len(), 6);
}

#[tokio::test]
async fn test_step_timeout_counts_as_failed_attempt() {
    let executor = executor();
    let def = WorkflowDefinition::new("wf-slow", "Slow")
        .with_max_retry(1)
        .with_step_timeout(Duration::from_millis(20))
        .step(0, "slow", |_ctx: WorkflowStepContext, _cancel: CancellationToken| async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            WorkflowStepResult::done()
        });

    let result = executor.execute(def).await.unwrap();
    assert!(!result.success);
    assert_eq!(result.checkpoints[0].attempts, 2);
    assert!(result.checkpoints[0].error.as_deref().unwrap().contains("timed out"));
}

/// Store that accepts `remaining` saves and then fails.
struct FlakyStore {
    inner: MemoryCheckpointStore,
    remaining: AtomicU32,
}

#[async_trait]
impl CheckpointStore for FlakyStore {
    async fn save(&self, checkpoint: &WorkflowCheckpoint) -> Result<(), CheckpointError> {
        let left = self.remaining.load(Ordering::SeqCst);
        if left == 0 {
            return Err(CheckpointError::Unavailable("disk detached".to_string()));
        }
        self.remaining.store(left - 1, Ordering::SeqCst);
        self.inner.save(checkpoint).await
    }

    async fn list_by_workflow(&self, workflow_id: &str) -> Result<Vec<WorkflowCheckpoint>, CheckpointError> {
        self.inner.list_by_workflow(workflow_id).await
    }

    async fn purge(&self, workflow_id: &str) -> Result<usize, CheckpointError> {
        self.inner.purge(workflow_id).await
    }

    async fn list_workflows(&self) -> Result<Vec<String>, CheckpointError> {
        self.inner.list_workflows().await
    }
}

#[tokio::test]
async fn test_checkpoint_failure_propagates() {
    let executor = executor_with_store(Arc::new(FlakyStore {
        inner: MemoryCheckpointStore::new(),
        remaining: AtomicU32::new(1),
    }));
    let later = Arc::new(AtomicU32::new(0));
    let def = WorkflowDefinition::new("wf-store", "Store failure")
        .step(0, "a", writes("a"))
        .step(1, "b", writes("b"))
        .step(2, "c", flaky(0, later.clone()));

    let result = executor.execute(def).await;
    assert!(matches!(
        result,
        Err(WorkflowError::Checkpoint(CheckpointError::Unavailable(_)))
    ));
    assert_eq!(executor.status("wf-store"), WorkflowStatus::Failed);
    assert_eq!(later.load(Ordering::SeqCst), 0);
    assert_eq!(executor.checkpoint_chain("wf-store").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_definition_rejected() {
    let executor = executor();
    let def = WorkflowDefinition::new("wf-dup", "Dup")
        .step(1, "a", writes("a"))
        .step(1, "b", writes("b"));
    assert!(matches!(
        executor.execute(def).await,
        Err(WorkflowError::InvalidDefinition(_))
    ));
    assert_eq!(executor.status("wf-dup"), WorkflowStatus::Unknown);
}
