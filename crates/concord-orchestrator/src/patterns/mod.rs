//! Coordination patterns.
//!
//! The set is closed: [`strategy_for`] maps every [`CoordinationPattern`]
//! to its strategy with an exhaustive match.

mod competitive;
mod hierarchical;
mod parallel;
mod swarm;

#[cfg(test)]
#[path = "patterns_tests.rs"]
mod tests;

use async_trait::async_trait;
use concord_protocols::{
    AgentContribution, AgentDefinition, AgentError, AgentOutput, AgentRuntimeAdapter, AgentTask,
    CoordinationPattern, ResponseOutcome,
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::OrchestratorConfig;
use crate::error::OrchestratorError;

pub use competitive::Competitive;
pub use hierarchical::Hierarchical;
pub use parallel::Parallel;
pub use swarm::CollaborativeSwarm;

/// What a strategy needs besides the agents and the task.
pub struct PatternContext<'a> {
    pub runtime: &'a dyn AgentRuntimeAdapter,
    pub config: &'a OrchestratorConfig,
    pub cancellation: &'a CancellationToken,
}

impl PatternContext<'_> {
    /// Run one agent, honoring cancellation before and after the call.
    ///
    /// The adapter gets a clone of the token and is expected to return
    /// [`AgentError::Cancelled`] at its next suspension point once it fires.
    pub async fn invoke(&self, agent_type: &str, task: &AgentTask) -> Result<AgentOutput, OrchestratorError> {
        if self.cancellation.is_cancelled() {
            return Err(OrchestratorError::Cancelled(task.id));
        }
        debug!(task_id = %task.id, agent_type = %agent_type, "Invoking agent");

        let result = self
            .runtime
            .execute_agent_logic(agent_type, task, self.cancellation.clone())
            .await;

        // an agent that returns after cancellation was requested is cancelled
        if self.cancellation.is_cancelled() {
            return Err(OrchestratorError::Cancelled(task.id));
        }
        match result {
            Err(AgentError::Cancelled) => Err(OrchestratorError::Cancelled(task.id)),
            other => Ok(other?),
        }
    }
}

/// A pattern's verdict, turned into a response by the engine.
#[derive(Debug, Clone)]
pub struct PatternOutcome {
    pub success: bool,
    pub outcome: ResponseOutcome,
    pub result: Value,
    pub summary: String,
    pub contributions: Vec<AgentContribution>,
}

impl PatternOutcome {
    pub fn completed(result: Value, summary: impl Into<String>, contributions: Vec<AgentContribution>) -> Self {
        Self {
            success: true,
            outcome: ResponseOutcome::Completed,
            result,
            summary: summary.into(),
            contributions,
        }
    }

    pub fn unsuccessful(
        outcome: ResponseOutcome,
        summary: impl Into<String>,
        contributions: Vec<AgentContribution>,
    ) -> Self {
        Self {
            success: false,
            outcome,
            result: Value::Null,
            summary: summary.into(),
            contributions,
        }
    }
}

/// How a task is spread over agents and how their outputs combine.
#[async_trait]
pub trait CoordinationStrategy: Send + Sync {
    fn pattern(&self) -> CoordinationPattern;

    /// Coordinate `agents` (non-empty, in request order) on `task`.
    async fn coordinate(
        &self,
        ctx: &PatternContext<'_>,
        agents: &[AgentDefinition],
        task: &AgentTask,
    ) -> Result<PatternOutcome, OrchestratorError>;
}

/// The strategy for a pattern.
pub fn strategy_for(pattern: CoordinationPattern) -> &'static dyn CoordinationStrategy {
    match pattern {
        CoordinationPattern::Parallel => &Parallel,
        CoordinationPattern::Hierarchical => &Hierarchical,
        CoordinationPattern::Competitive => &Competitive,
        CoordinationPattern::CollaborativeSwarm => &CollaborativeSwarm,
    }
}

/// `{agent_type, content}` objects for a result payload.
pub(crate) fn contribution_values(contributions: &[AgentContribution]) -> Vec<Value> {
    contributions
        .iter()
        .map(|c| {
            serde_json::json!({
                "agent_type": c.agent_type,
                "round": c.round,
                "content": c.output.content,
            })
        })
        .collect()
}
