//! Ethics ports consulted before any agent action is dispatched.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::AgentExecutionRequest;
use crate::error::PortError;
use crate::types::ContextMap;

/// The action an orchestration is about to take, as seen by reviewers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionProposal {
    pub task_id: Uuid,
    /// The goal the agents will pursue.
    pub action: String,
    pub agent_types: Vec<String>,
    pub requesting_user: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub context: ContextMap,
}

impl ActionProposal {
    pub fn from_request(request: &AgentExecutionRequest) -> Self {
        Self {
            task_id: request.task.id,
            action: request.task.goal.clone(),
            agent_types: request.task.required_agent_types.clone(),
            requesting_user: request.requesting_user.clone(),
            subject: request.subject.clone(),
            context: request.task.context.clone(),
        }
    }
}

/// Verdict of the normative-agency check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormativeAssessment {
    pub is_valid: bool,
    #[serde(default)]
    pub violations: Vec<String>,
}

impl NormativeAssessment {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            violations: Vec::new(),
        }
    }

    pub fn invalid(violations: Vec<String>) -> Self {
        Self {
            is_valid: false,
            violations,
        }
    }
}

/// Verdict of the informational-dignity check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DignityAssessment {
    pub is_dignity_preserved: bool,
    #[serde(default)]
    pub potential_violations: Vec<String>,
}

impl DignityAssessment {
    pub fn preserved() -> Self {
        Self {
            is_dignity_preserved: true,
            potential_violations: Vec::new(),
        }
    }

    pub fn violated(potential_violations: Vec<String>) -> Self {
        Self {
            is_dignity_preserved: false,
            potential_violations,
        }
    }
}

/// Checks whether an action respects the autonomy of those it affects.
#[async_trait]
pub trait NormativeAgencyPort: Send + Sync {
    async fn validate_action(
        &self,
        proposal: &ActionProposal,
    ) -> Result<NormativeAssessment, PortError>;
}

/// Checks whether an action preserves informational dignity.
#[async_trait]
pub trait InformationEthicsPort: Send + Sync {
    async fn assess_dignity(&self, proposal: &ActionProposal)
    -> Result<DignityAssessment, PortError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentTask, CoordinationPattern};

    #[test]
    fn test_proposal_from_request() {
        let task = AgentTask::new("summarize patient file", vec!["medic".to_string()])
            .with_context("record", serde_json::json!("r-17"));
        let request = AgentExecutionRequest::new(task.clone(), "alice", CoordinationPattern::Parallel)
            .with_subject("patient-42");

        let proposal = ActionProposal::from_request(&request);
        assert_eq!(proposal.task_id, task.id);
        assert_eq!(proposal.action, "summarize patient file");
        assert_eq!(proposal.requesting_user, "alice");
        assert_eq!(proposal.subject.as_deref(), Some("patient-42"));
        assert_eq!(proposal.context["record"], "r-17");
    }

    #[test]
    fn test_assessment_constructors() {
        assert!(NormativeAssessment::valid().is_valid);
        let invalid = NormativeAssessment::invalid(vec!["deception".to_string()]);
        assert!(!invalid.is_valid);
        assert_eq!(invalid.violations.len(), 1);

        assert!(DignityAssessment::preserved().is_dignity_preserved);
        assert!(!DignityAssessment::violated(vec!["profiling".to_string()]).is_dignity_preserved);
    }
}
