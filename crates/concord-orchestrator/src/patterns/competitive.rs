//! First to the completion marker wins, otherwise the best score.

use async_trait::async_trait;
use concord_protocols::{
    AgentContribution, AgentDefinition, AgentTask, CoordinationPattern, ResponseOutcome,
};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tracing::{info, warn};

use super::{CoordinationStrategy, PatternContext, PatternOutcome, contribution_values};
use crate::error::OrchestratorError;

pub struct Competitive;

#[async_trait]
impl CoordinationStrategy for Competitive {
    fn pattern(&self) -> CoordinationPattern {
        CoordinationPattern::Competitive
    }

    async fn coordinate(
        &self,
        ctx: &PatternContext<'_>,
        agents: &[AgentDefinition],
        task: &AgentTask,
    ) -> Result<PatternOutcome, OrchestratorError> {
        let mut in_flight: FuturesUnordered<_> = agents
            .iter()
            .map(|agent| async move { (agent.agent_type.as_str(), ctx.invoke(&agent.agent_type, task).await) })
            .collect();

        let marker = ctx.config.completion_marker.as_str();
        let mut finished: Vec<AgentContribution> = Vec::new();
        let mut last_error = None;

        loop {
            let next = tokio::select! {
                biased;
                _ = ctx.cancellation.cancelled() => return Err(OrchestratorError::Cancelled(task.id)),
                next = in_flight.next() => next,
            };
            let Some((agent_type, result)) = next else {
                break;
            };

            match result {
                Ok(output) if output.contains_marker(marker) => {
                    // dropping the set abandons the losers still in flight
                    let abandoned = in_flight.len();
                    drop(in_flight);
                    info!(task_id = %task.id, winner = %agent_type, abandoned, "Competitive winner by completion marker");
                    let winner = AgentContribution::new(agent_type, output, 0);
                    finished.push(winner.clone());
                    return Ok(Self::won(winner, finished, "completion marker"));
                }
                Ok(output) => finished.push(AgentContribution::new(agent_type, output, 0)),
                Err(e) => {
                    warn!(task_id = %task.id, agent_type = %agent_type, error = %e, "Competitor failed");
                    last_error = Some(e);
                }
            }
        }

        let best = finished
            .iter()
            .filter(|c| !c.output.content.trim().is_empty())
            .max_by(|a, b| score(a).total_cmp(&score(b)))
            .cloned();

        match (best, last_error) {
            (Some(winner), _) => {
                info!(task_id = %task.id, winner = %winner.agent_type, score = ?winner.output.score, "Competitive winner by score");
                Ok(Self::won(winner, finished, "highest score"))
            }
            (None, Some(e)) if finished.is_empty() => Err(e),
            (None, _) => Ok(PatternOutcome::unsuccessful(
                ResponseOutcome::NoWinner,
                "no competitor produced a usable result",
                finished,
            )),
        }
    }
}

impl Competitive {
    fn won(winner: AgentContribution, contributions: Vec<AgentContribution>, reason: &str) -> PatternOutcome {
        let result = serde_json::json!({
            "winner": winner.agent_type,
            "content": winner.output.content,
            "score": winner.output.score,
            "candidates": contribution_values(&contributions),
        });
        let summary = format!("{} won by {}", winner.agent_type, reason);
        PatternOutcome::completed(result, summary, contributions)
    }
}

/// Unscored outputs rank below any scored one.
fn score(contribution: &AgentContribution) -> f64 {
    contribution.output.score.unwrap_or(f64::NEG_INFINITY)
}
