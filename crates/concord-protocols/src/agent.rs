//! Agent protocol definitions.
//!
//! Agents are registered by type, receive [`AgentTask`]s through the
//! [`AgentRuntimeAdapter`], and their outputs are folded into a single
//! [`AgentExecutionResponse`] by a coordination pattern.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{AgentError, PortError};
use crate::types::ContextMap;

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;

/// Executes one agent's task logic. The only way agent "thinking" happens.
#[async_trait]
pub trait AgentRuntimeAdapter: Send + Sync {
    /// Run `task` as `agent_id`.
    ///
    /// Implementations should poll `cancellation` at their suspension points
    /// and return [`AgentError::Cancelled`] once it fires.
    async fn execute_agent_logic(
        &self,
        agent_id: &str,
        task: &AgentTask,
        cancellation: CancellationToken,
    ) -> Result<AgentOutput, AgentError>;
}

/// Durable per-agent knowledge, opaque to the engine.
#[async_trait]
pub trait AgentKnowledgeRepository: Send + Sync {
    /// Append a knowledge entry for an agent.
    async fn record(&self, entry: KnowledgeEntry) -> Result<(), PortError>;

    /// Most recent entries for an agent type, newest first.
    async fn recall(&self, agent_type: &str, limit: usize)
    -> Result<Vec<KnowledgeEntry>, PortError>;
}

/// How much an agent may do without a human in the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutonomyLevel {
    /// Every action requires human approval before it commits.
    HumanGated,
    /// Approval required only when the task asks for it.
    SemiAutonomous,
    /// Never requires approval.
    FullyAutonomous,
}

impl AutonomyLevel {
    /// Lower value means more restrictive.
    fn rank(self) -> u8 {
        match self {
            AutonomyLevel::HumanGated => 0,
            AutonomyLevel::SemiAutonomous => 1,
            AutonomyLevel::FullyAutonomous => 2,
        }
    }

    /// The more restrictive of two levels.
    pub fn most_restrictive(self, other: AutonomyLevel) -> AutonomyLevel {
        if other.rank() < self.rank() { other } else { self }
    }
}

impl Default for AutonomyLevel {
    fn default() -> Self {
        AutonomyLevel::SemiAutonomous
    }
}

/// A registered agent type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDefinition {
    /// Agent type identifier, unique within a registry.
    pub agent_type: String,

    /// Default autonomy level for instances of this type.
    #[serde(default)]
    pub autonomy: AutonomyLevel,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,
}

impl AgentDefinition {
    pub fn new(agent_type: impl Into<String>, autonomy: AutonomyLevel) -> Self {
        Self {
            agent_type: agent_type.into(),
            autonomy,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A unit of work routed to one or more agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTask {
    /// Task ID.
    pub id: Uuid,

    /// Goal description.
    pub goal: String,

    /// Agent types that must take part.
    pub required_agent_types: Vec<String>,

    /// Free-form context.
    #[serde(default)]
    pub context: ContextMap,
}

impl AgentTask {
    pub fn new(goal: impl Into<String>, required_agent_types: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            goal: goal.into(),
            required_agent_types,
            context: ContextMap::new(),
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    /// Derive a sub-task that keeps this task's identity and context.
    pub fn derive(&self, goal: impl Into<String>) -> Self {
        let mut context = self.context.clone();
        context.insert(
            "parent_goal".to_string(),
            serde_json::Value::String(self.goal.clone()),
        );
        Self {
            id: self.id,
            goal: goal.into(),
            required_agent_types: self.required_agent_types.clone(),
            context,
        }
    }

    /// Read a boolean flag from the context; missing or non-boolean is `false`.
    pub fn flag(&self, key: &str) -> bool {
        self.context
            .get(key)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

/// A sub-goal handed out by a coordinating agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delegation {
    /// Target agent type; `None` lets the pattern pick a worker.
    #[serde(default)]
    pub agent_type: Option<String>,

    /// The sub-goal.
    pub goal: String,
}

impl Delegation {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            agent_type: None,
            goal: goal.into(),
        }
    }

    pub fn to(agent_type: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            agent_type: Some(agent_type.into()),
            goal: goal.into(),
        }
    }
}

/// What an agent returns for one invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentOutput {
    /// Primary textual output.
    pub content: String,

    /// Self-reported quality score, used by competitive dispatch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    /// Sub-goals to delegate (hierarchical coordination).
    #[serde(default)]
    pub delegations: Vec<Delegation>,

    /// Structured payload.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl AgentOutput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_delegations(mut self, delegations: Vec<Delegation>) -> Self {
        self.delegations = delegations;
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    /// Whether the content carries the given marker token.
    pub fn contains_marker(&self, marker: &str) -> bool {
        !marker.is_empty() && self.content.contains(marker)
    }
}

/// One agent's share of an aggregated response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentContribution {
    pub agent_type: String,
    pub output: AgentOutput,
    /// Swarm round or hierarchical phase this contribution belongs to.
    #[serde(default)]
    pub round: u32,
}

impl AgentContribution {
    pub fn new(agent_type: impl Into<String>, output: AgentOutput, round: u32) -> Self {
        Self {
            agent_type: agent_type.into(),
            output,
            round,
        }
    }
}

/// The closed set of coordination patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinationPattern {
    Parallel,
    Hierarchical,
    Competitive,
    CollaborativeSwarm,
}

impl CoordinationPattern {
    pub const ALL: [CoordinationPattern; 4] = [
        CoordinationPattern::Parallel,
        CoordinationPattern::Hierarchical,
        CoordinationPattern::Competitive,
        CoordinationPattern::CollaborativeSwarm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CoordinationPattern::Parallel => "parallel",
            CoordinationPattern::Hierarchical => "hierarchical",
            CoordinationPattern::Competitive => "competitive",
            CoordinationPattern::CollaborativeSwarm => "collaborative_swarm",
        }
    }
}

impl fmt::Display for CoordinationPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CoordinationPattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "parallel" => Ok(CoordinationPattern::Parallel),
            "hierarchical" => Ok(CoordinationPattern::Hierarchical),
            "competitive" => Ok(CoordinationPattern::Competitive),
            "swarm" | "collaborative_swarm" | "collaborative-swarm" => {
                Ok(CoordinationPattern::CollaborativeSwarm)
            }
            other => Err(format!("unknown coordination pattern: {}", other)),
        }
    }
}

/// A task submitted for execution on behalf of a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentExecutionRequest {
    pub task: AgentTask,
    pub requesting_user: String,
    /// Person or record the action concerns, if any.
    #[serde(default)]
    pub subject: Option<String>,
    pub pattern: CoordinationPattern,
}

impl AgentExecutionRequest {
    pub fn new(
        task: AgentTask,
        requesting_user: impl Into<String>,
        pattern: CoordinationPattern,
    ) -> Self {
        Self {
            task,
            requesting_user: requesting_user.into(),
            subject: None,
            pattern,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

/// Why a response ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseOutcome {
    Completed,
    EthicalRejection,
    GovernanceViolation,
    ApprovalDenied,
    NotConverged,
    NoWinner,
}

/// Aggregated result of a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentExecutionResponse {
    pub task_id: Uuid,
    pub success: bool,
    pub outcome: ResponseOutcome,
    pub result: serde_json::Value,
    /// Human-readable explanation, names violations on rejection.
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<CoordinationPattern>,
    #[serde(default)]
    pub contributions: Vec<AgentContribution>,
    #[serde(default)]
    pub violations: Vec<String>,
    pub finished_at: DateTime<Utc>,
}

impl AgentExecutionResponse {
    /// A successful aggregated response.
    pub fn completed(
        task_id: Uuid,
        pattern: CoordinationPattern,
        result: serde_json::Value,
        summary: impl Into<String>,
        contributions: Vec<AgentContribution>,
    ) -> Self {
        Self {
            task_id,
            success: true,
            outcome: ResponseOutcome::Completed,
            result,
            summary: summary.into(),
            pattern: Some(pattern),
            contributions,
            violations: Vec::new(),
            finished_at: Utc::now(),
        }
    }

    /// A non-success response that never reached agent dispatch.
    pub fn rejected(
        task_id: Uuid,
        outcome: ResponseOutcome,
        summary: impl Into<String>,
        violations: Vec<String>,
    ) -> Self {
        Self {
            task_id,
            success: false,
            outcome,
            result: serde_json::Value::Null,
            summary: summary.into(),
            pattern: None,
            contributions: Vec::new(),
            violations,
            finished_at: Utc::now(),
        }
    }

    /// A non-success response produced by a coordination pattern.
    pub fn unsuccessful(
        task_id: Uuid,
        pattern: CoordinationPattern,
        outcome: ResponseOutcome,
        summary: impl Into<String>,
        contributions: Vec<AgentContribution>,
    ) -> Self {
        Self {
            task_id,
            success: false,
            outcome,
            result: serde_json::Value::Null,
            summary: summary.into(),
            pattern: Some(pattern),
            contributions,
            violations: Vec::new(),
            finished_at: Utc::now(),
        }
    }
}

/// A durable knowledge record for one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub agent_type: String,
    pub task_id: Uuid,
    pub goal: String,
    pub content: String,
    pub recorded_at: DateTime<Utc>,
}

impl KnowledgeEntry {
    pub fn new(
        agent_type: impl Into<String>,
        task_id: Uuid,
        goal: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            agent_type: agent_type.into(),
            task_id,
            goal: goal.into(),
            content: content.into(),
            recorded_at: Utc::now(),
        }
    }
}
