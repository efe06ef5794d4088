//! A coordinator delegates sub-goals and synthesizes the results.

use async_trait::async_trait;
use concord_protocols::{AgentContribution, AgentDefinition, AgentTask, CoordinationPattern};
use futures::future::try_join_all;
use tracing::{info, warn};

use super::{CoordinationStrategy, PatternContext, PatternOutcome};
use crate::error::OrchestratorError;

const COORDINATION_ROUND: u32 = 0;
const DELEGATION_ROUND: u32 = 1;
const SYNTHESIS_ROUND: u32 = 2;

/// The first required agent coordinates; the rest are workers.
pub struct Hierarchical;

#[async_trait]
impl CoordinationStrategy for Hierarchical {
    fn pattern(&self) -> CoordinationPattern {
        CoordinationPattern::Hierarchical
    }

    async fn coordinate(
        &self,
        ctx: &PatternContext<'_>,
        agents: &[AgentDefinition],
        task: &AgentTask,
    ) -> Result<PatternOutcome, OrchestratorError> {
        let Some((coordinator, workers)) = agents.split_first() else {
            return Err(OrchestratorError::NoRequiredAgents(task.id));
        };
        let worker_types: Vec<&str> = workers.iter().map(|w| w.agent_type.as_str()).collect();

        let plan_task = task
            .clone()
            .with_context("role", serde_json::json!("coordinator"))
            .with_context("workers", serde_json::json!(worker_types));
        let plan = ctx.invoke(&coordinator.agent_type, &plan_task).await?;

        if plan.delegations.is_empty() {
            info!(task_id = %task.id, coordinator = %coordinator.agent_type, "Coordinator answered directly");
            let result = serde_json::json!({ "synthesis": plan.content });
            let contributions = vec![AgentContribution::new(
                &coordinator.agent_type,
                plan,
                COORDINATION_ROUND,
            )];
            return Ok(PatternOutcome::completed(result, "coordinator answered directly", contributions));
        }

        let assignments: Vec<(String, AgentTask)> = plan
            .delegations
            .iter()
            .enumerate()
            .map(|(i, delegation)| {
                let assignee = match delegation.agent_type.as_deref() {
                    Some(t) if worker_types.contains(&t) => t.to_string(),
                    requested => {
                        if let Some(t) = requested {
                            warn!(task_id = %task.id, requested = %t, "Delegation target is not a selected worker");
                        }
                        // no workers: the coordinator does the sub-goal itself
                        worker_types
                            .get(i % worker_types.len().max(1))
                            .map(|t| t.to_string())
                            .unwrap_or_else(|| coordinator.agent_type.clone())
                    }
                };
                (assignee, task.derive(&delegation.goal))
            })
            .collect();

        let calls = assignments.iter().map(|(assignee, sub_task)| async move {
            let output = ctx.invoke(assignee, sub_task).await?;
            Ok::<_, OrchestratorError>((sub_task.goal.clone(), AgentContribution::new(assignee, output, DELEGATION_ROUND)))
        });
        let delegated = try_join_all(calls).await?;

        let sub_results: Vec<serde_json::Value> = delegated
            .iter()
            .map(|(goal, c)| {
                serde_json::json!({
                    "agent_type": c.agent_type,
                    "goal": goal,
                    "content": c.output.content,
                })
            })
            .collect();

        let synthesis_task = task
            .clone()
            .with_context("role", serde_json::json!("coordinator"))
            .with_context("phase", serde_json::json!("synthesis"))
            .with_context("sub_results", serde_json::json!(sub_results));
        let synthesis = ctx.invoke(&coordinator.agent_type, &synthesis_task).await?;

        info!(
            task_id = %task.id,
            coordinator = %coordinator.agent_type,
            delegations = delegated.len(),
            "Hierarchical synthesis finished"
        );

        let mut contributions = vec![AgentContribution::new(&coordinator.agent_type, plan, COORDINATION_ROUND)];
        contributions.extend(delegated.into_iter().map(|(_, c)| c));
        let result = serde_json::json!({
            "synthesis": synthesis.content,
            "sub_results": sub_results,
        });
        contributions.push(AgentContribution::new(&coordinator.agent_type, synthesis, SYNTHESIS_ROUND));

        let summary = format!(
            "{} synthesized {} delegated results",
            coordinator.agent_type,
            sub_results.len()
        );
        Ok(PatternOutcome::completed(result, summary, contributions))
    }
}
