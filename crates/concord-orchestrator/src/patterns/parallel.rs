//! Fan the same task out to every agent and join.

use std::collections::HashMap;

use async_trait::async_trait;
use concord_protocols::{AgentContribution, AgentDefinition, AgentTask, CoordinationPattern};
use futures::future::try_join_all;
use tracing::info;

use super::{CoordinationStrategy, PatternContext, PatternOutcome, contribution_values};
use crate::error::OrchestratorError;

pub struct Parallel;

#[async_trait]
impl CoordinationStrategy for Parallel {
    fn pattern(&self) -> CoordinationPattern {
        CoordinationPattern::Parallel
    }

    async fn coordinate(
        &self,
        ctx: &PatternContext<'_>,
        agents: &[AgentDefinition],
        task: &AgentTask,
    ) -> Result<PatternOutcome, OrchestratorError> {
        let calls = agents.iter().map(|agent| async move {
            let output = ctx.invoke(&agent.agent_type, task).await?;
            Ok::<_, OrchestratorError>(AgentContribution::new(&agent.agent_type, output, 0))
        });
        let contributions = try_join_all(calls).await?;

        let combined = contributions
            .iter()
            .map(|c| format!("[{}] {}", c.agent_type, c.output.content))
            .collect::<Vec<_>>()
            .join("\n");
        let consensus = majority(&contributions);

        info!(task_id = %task.id, agents = contributions.len(), "Parallel fan-out joined");
        let result = serde_json::json!({
            "combined": combined,
            "consensus": consensus,
            "outputs": contribution_values(&contributions),
        });
        let summary = format!("{} agents completed in parallel", contributions.len());
        Ok(PatternOutcome::completed(result, summary, contributions))
    }
}

/// Output shared by a strict majority of agents, if any.
fn majority(contributions: &[AgentContribution]) -> Option<String> {
    let mut votes: HashMap<&str, usize> = HashMap::new();
    for c in contributions {
        *votes.entry(c.output.content.trim()).or_default() += 1;
    }
    votes
        .into_iter()
        .find(|(_, count)| count * 2 > contributions.len())
        .map(|(content, _)| content.to_string())
}
