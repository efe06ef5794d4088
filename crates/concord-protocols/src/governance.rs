//! Governance port and the closed set of policy rules.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agent::AgentTask;
use crate::error::PortError;

#[cfg(test)]
#[path = "governance_tests.rs"]
mod tests;

/// A rule evaluated against task context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyRule {
    /// Numeric context value above `max` needs `approval_field == true`.
    AmountThreshold {
        field: String,
        max: f64,
        approval_field: String,
    },
    /// Context must carry `field`.
    RequiredContext { field: String },
    /// Tasks may not involve `agent_type`.
    ForbiddenAgent { agent_type: String },
}

impl PolicyRule {
    /// Returns the violation detail, or `None` when the task complies.
    pub fn check(&self, task: &AgentTask) -> Option<String> {
        match self {
            PolicyRule::AmountThreshold {
                field,
                max,
                approval_field,
            } => {
                let amount = task.context.get(field).and_then(numeric)?;
                if amount <= *max || task.flag(approval_field) {
                    return None;
                }
                Some(format!(
                    "{} {} exceeds threshold {} without human approval",
                    field, amount, max
                ))
            }
            PolicyRule::RequiredContext { field } => {
                if task.context.contains_key(field) {
                    None
                } else {
                    Some(format!("required context field '{}' is missing", field))
                }
            }
            PolicyRule::ForbiddenAgent { agent_type } => {
                if task.required_agent_types.iter().any(|t| t == agent_type) {
                    Some(format!("agent type '{}' is not permitted", agent_type))
                } else {
                    None
                }
            }
        }
    }
}

fn numeric(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A named governance policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub rule: PolicyRule,
}

impl PolicyRecord {
    pub fn new(name: impl Into<String>, rule: PolicyRule) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            rule,
        }
    }

    pub fn evaluate(&self, task: &AgentTask) -> PolicyEvaluation {
        match self.rule.check(task) {
            Some(detail) => PolicyEvaluation::violation(&self.name, detail),
            None => PolicyEvaluation::pass(&self.name),
        }
    }
}

/// Result of evaluating one policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyEvaluation {
    pub policy_name: String,
    pub violated: bool,
    #[serde(default)]
    pub detail: Option<String>,
}

impl PolicyEvaluation {
    pub fn pass(policy_name: impl Into<String>) -> Self {
        Self {
            policy_name: policy_name.into(),
            violated: false,
            detail: None,
        }
    }

    pub fn violation(policy_name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            policy_name: policy_name.into(),
            violated: true,
            detail: Some(detail.into()),
        }
    }
}

/// Source of governance policies.
#[async_trait]
pub trait GovernancePort: Send + Sync {
    async fn list_policies(&self) -> Result<Vec<PolicyRecord>, PortError>;

    /// Evaluate one policy against a task. Defaults to the rule's own check.
    async fn evaluate(
        &self,
        policy: &PolicyRecord,
        task: &AgentTask,
    ) -> Result<PolicyEvaluation, PortError> {
        Ok(policy.evaluate(task))
    }
}
