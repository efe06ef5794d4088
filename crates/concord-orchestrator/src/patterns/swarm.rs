//! Iterative rounds over a shared context until convergence.

use async_trait::async_trait;
use concord_protocols::{
    AgentContribution, AgentDefinition, AgentTask, CoordinationPattern, ResponseOutcome,
};
use futures::future::try_join_all;
use tracing::{debug, info};

use super::{CoordinationStrategy, PatternContext, PatternOutcome, contribution_values};
use crate::error::OrchestratorError;

/// All agents contribute each round and see every earlier contribution.
///
/// The swarm converges when a round's merged output carries the configured
/// convergence marker; running out of rounds is a non-success outcome.
pub struct CollaborativeSwarm;

#[async_trait]
impl CoordinationStrategy for CollaborativeSwarm {
    fn pattern(&self) -> CoordinationPattern {
        CoordinationPattern::CollaborativeSwarm
    }

    async fn coordinate(
        &self,
        ctx: &PatternContext<'_>,
        agents: &[AgentDefinition],
        task: &AgentTask,
    ) -> Result<PatternOutcome, OrchestratorError> {
        let max_rounds = ctx.config.swarm_max_rounds;
        let marker = ctx.config.convergence_marker.as_str();
        let mut shared: Vec<AgentContribution> = Vec::new();

        for round in 1..=max_rounds {
            let round_task = task
                .clone()
                .with_context("round", serde_json::json!(round))
                .with_context("max_rounds", serde_json::json!(max_rounds))
                .with_context("shared_context", serde_json::json!(contribution_values(&shared)));

            let calls = agents.iter().map(|agent| {
                let round_task = &round_task;
                async move {
                    let output = ctx.invoke(&agent.agent_type, round_task).await?;
                    Ok::<_, OrchestratorError>(AgentContribution::new(&agent.agent_type, output, round))
                }
            });

            let contributions = tokio::select! {
                biased;
                _ = ctx.cancellation.cancelled() => return Err(OrchestratorError::Cancelled(task.id)),
                joined = try_join_all(calls) => joined?,
            };

            let merged = contributions
                .iter()
                .map(|c| c.output.content.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            shared.extend(contributions);

            if !marker.is_empty() && merged.contains(marker) {
                info!(task_id = %task.id, round, "Swarm converged");
                let result = serde_json::json!({
                    "rounds": round,
                    "merged": merged,
                    "shared_context": contribution_values(&shared),
                });
                let summary = format!("swarm converged after {} round(s)", round);
                return Ok(PatternOutcome::completed(result, summary, shared));
            }
            debug!(task_id = %task.id, round, max_rounds, "Swarm round finished without convergence");
        }

        info!(task_id = %task.id, max_rounds, "Swarm did not converge");
        Ok(PatternOutcome::unsuccessful(
            ResponseOutcome::NotConverged,
            format!("swarm did not converge within {} rounds", max_rounds),
            shared,
        ))
    }
}
