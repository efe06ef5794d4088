//! Resume planning from a checkpoint chain.

use std::collections::{BTreeMap, HashMap};

use tracing::info;

use crate::checkpoint::{CheckpointStatus, WorkflowCheckpoint};

/// Where a workflow picks up again, and the state it carries.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumePlan {
    pub workflow_id: String,
    /// First step number that has no `Completed` checkpoint after the
    /// highest completed one.
    pub next_step: u32,
    /// Accumulated state replayed from completed steps, in step order.
    pub state: HashMap<String, serde_json::Value>,
    /// Output of the highest completed step, fed to `next_step`.
    pub previous_output: Option<serde_json::Value>,
    /// Completed step numbers, ascending.
    pub completed_steps: Vec<u32>,
    /// Status of the most recently appended checkpoint.
    pub last_status: CheckpointStatus,
}

impl ResumePlan {
    /// Build a plan from a chain ordered by step number.
    ///
    /// Returns `None` for an empty chain.
    pub fn from_chain(workflow_id: &str, chain: &[WorkflowCheckpoint]) -> Option<Self> {
        let last = chain.iter().max_by_key(|cp| cp.created_at)?;

        // a later completion of the same step supersedes an earlier one
        let mut completed: BTreeMap<u32, &WorkflowCheckpoint> = BTreeMap::new();
        for cp in chain.iter().filter(|cp| cp.is_completed()) {
            completed.insert(cp.step_number, cp);
        }

        let mut state = HashMap::new();
        let mut previous_output = None;
        let mut next_step = 0;
        for (step, cp) in &completed {
            state.extend(cp.state_updates.clone());
            previous_output = cp.output.clone();
            next_step = step + 1;
        }

        let plan = Self {
            workflow_id: workflow_id.to_string(),
            next_step,
            state,
            previous_output,
            completed_steps: completed.keys().copied().collect(),
            last_status: last.status,
        };

        info!(
            workflow_id = %workflow_id,
            next_step = plan.next_step,
            completed = plan.completed_steps.len(),
            last_status = %plan.last_status,
            "Computed resume point"
        );
        Some(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(step: u32, key: &str, value: i64) -> WorkflowCheckpoint {
        let mut updates = HashMap::new();
        updates.insert(key.to_string(), serde_json::json!(value));
        WorkflowCheckpoint::completed(
            "wf-1",
            step,
            "s",
            Some(serde_json::json!(format!("out-{}", step))),
            updates,
            1,
        )
    }

    #[test]
    fn test_empty_chain_has_no_plan() {
        assert!(ResumePlan::from_chain("wf-1", &[]).is_none());
    }

    #[test]
    fn test_resume_after_failure_reattempts_failed_step() {
        let chain = vec![
            completed(0, "a", 1),
            completed(1, "b", 2),
            WorkflowCheckpoint::failed("wf-1", 2, "s", "boom", 3),
        ];
        let plan = ResumePlan::from_chain("wf-1", &chain).unwrap();
        assert_eq!(plan.next_step, 2);
        assert_eq!(plan.completed_steps, vec![0, 1]);
        assert_eq!(plan.previous_output, Some(serde_json::json!("out-1")));
        assert_eq!(plan.state["a"], 1);
        assert_eq!(plan.state["b"], 2);
        assert_eq!(plan.last_status, CheckpointStatus::Failed);
    }

    #[test]
    fn test_replay_later_updates_override() {
        let chain = vec![completed(0, "counter", 1), completed(1, "counter", 7)];
        let plan = ResumePlan::from_chain("wf-1", &chain).unwrap();
        assert_eq!(plan.state["counter"], 7);
        assert_eq!(plan.next_step, 2);
    }

    #[test]
    fn test_failed_first_step_resumes_at_zero() {
        let chain = vec![WorkflowCheckpoint::cancelled("wf-1", 0, "s", 1)];
        let plan = ResumePlan::from_chain("wf-1", &chain).unwrap();
        assert_eq!(plan.next_step, 0);
        assert!(plan.state.is_empty());
        assert!(plan.previous_output.is_none());
        assert_eq!(plan.last_status, CheckpointStatus::Cancelled);
    }
}
