//! Ethics, governance and approval gates.

use std::sync::Arc;

use concord_protocols::{
    ActionProposal, AgentDefinition, AgentTask, ApprovalAdapter, ApprovalDecision, ApprovalRequest,
    AutonomyLevel, GovernancePort, InformationEthicsPort, NormativeAgencyPort, Notification,
    NotificationPort, NotificationPriority, PolicyEvaluation, PortError,
};
use tracing::{info, warn};

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;

/// Normative-agency and informational-dignity review.
pub struct EthicsGate {
    normative: Arc<dyn NormativeAgencyPort>,
    dignity: Arc<dyn InformationEthicsPort>,
}

impl EthicsGate {
    pub fn new(normative: Arc<dyn NormativeAgencyPort>, dignity: Arc<dyn InformationEthicsPort>) -> Self {
        Self { normative, dignity }
    }

    /// Run both reviews concurrently. Returns every violation reported.
    pub async fn review(&self, proposal: &ActionProposal) -> Result<Vec<String>, PortError> {
        let (normative, dignity) = tokio::join!(
            self.normative.validate_action(proposal),
            self.dignity.assess_dignity(proposal)
        );
        let (normative, dignity) = (normative?, dignity?);

        let mut violations = Vec::new();
        if !normative.is_valid {
            if normative.violations.is_empty() {
                violations.push("normative agency check failed".to_string());
            }
            violations.extend(normative.violations);
        }
        if !dignity.is_dignity_preserved {
            if dignity.potential_violations.is_empty() {
                violations.push("informational dignity check failed".to_string());
            }
            violations.extend(dignity.potential_violations);
        }

        if !violations.is_empty() {
            warn!(task_id = %proposal.task_id, violations = ?violations, "Ethical review rejected task");
        }
        Ok(violations)
    }
}

/// Policy evaluation with compliance notification.
pub struct GovernanceGate {
    governance: Arc<dyn GovernancePort>,
    notifications: Arc<dyn NotificationPort>,
    compliance_channel: String,
}

impl GovernanceGate {
    pub fn new(
        governance: Arc<dyn GovernancePort>,
        notifications: Arc<dyn NotificationPort>,
        compliance_channel: impl Into<String>,
    ) -> Self {
        Self {
            governance,
            notifications,
            compliance_channel: compliance_channel.into(),
        }
    }

    /// Evaluate every policy against the task.
    ///
    /// Violations are reported to the compliance channel in a single
    /// notification and returned.
    pub async fn review(&self, task: &AgentTask) -> Result<Vec<PolicyEvaluation>, PortError> {
        let policies = self.governance.list_policies().await?;

        let mut violations = Vec::new();
        for policy in &policies {
            let evaluation = self.governance.evaluate(policy, task).await?;
            if evaluation.violated {
                violations.push(evaluation);
            }
        }

        if violations.is_empty() {
            return Ok(violations);
        }

        warn!(
            task_id = %task.id,
            policies = ?violations.iter().map(|v| v.policy_name.as_str()).collect::<Vec<_>>(),
            "Governance policy violated"
        );
        self.notifications.send(self.compliance_notice(task, &violations)).await?;
        Ok(violations)
    }

    fn compliance_notice(&self, task: &AgentTask, violations: &[PolicyEvaluation]) -> Notification {
        let message = violations
            .iter()
            .map(describe_violation)
            .collect::<Vec<_>>()
            .join("\n");
        Notification::new(
            &self.compliance_channel,
            format!("Governance violation on task {}", task.id),
            message,
        )
        .with_priority(NotificationPriority::High)
        .with_metadata("task_id", serde_json::json!(task.id))
        .with_metadata("goal", serde_json::json!(task.goal))
        .with_metadata(
            "policies",
            serde_json::json!(violations.iter().map(|v| &v.policy_name).collect::<Vec<_>>()),
        )
    }
}

/// `policy: detail`, as shown to operators.
pub(crate) fn describe_violation(evaluation: &PolicyEvaluation) -> String {
    match &evaluation.detail {
        Some(detail) => format!("{}: {}", evaluation.policy_name, detail),
        None => evaluation.policy_name.clone(),
    }
}

/// Whether a task needs human approval at the given autonomy level.
pub fn approval_required(autonomy: AutonomyLevel, task: &AgentTask) -> bool {
    match autonomy {
        AutonomyLevel::HumanGated => true,
        AutonomyLevel::SemiAutonomous => task.flag("requires_approval"),
        AutonomyLevel::FullyAutonomous => false,
    }
}

/// Human approval for gated autonomy levels.
pub struct ApprovalGate {
    adapter: Arc<dyn ApprovalAdapter>,
}

impl ApprovalGate {
    pub fn new(adapter: Arc<dyn ApprovalAdapter>) -> Self {
        Self { adapter }
    }

    /// Ask for approval if the most restrictive selected agent needs it.
    ///
    /// Returns `None` when no approval was needed.
    pub async fn review(
        &self,
        task: &AgentTask,
        requesting_user: &str,
        agents: &[AgentDefinition],
    ) -> Result<Option<ApprovalDecision>, PortError> {
        let autonomy = agents
            .iter()
            .map(|a| a.autonomy)
            .fold(AutonomyLevel::FullyAutonomous, AutonomyLevel::most_restrictive);

        if !approval_required(autonomy, task) {
            return Ok(None);
        }

        let request = ApprovalRequest {
            task_id: task.id,
            requesting_user: requesting_user.to_string(),
            goal: task.goal.clone(),
            agent_types: agents.iter().map(|a| a.agent_type.clone()).collect(),
            autonomy,
        };
        let decision = self.adapter.request_approval(&request).await?;
        info!(
            task_id = %task.id,
            autonomy = ?autonomy,
            approved = decision.approved,
            "Approval decision received"
        );
        Ok(Some(decision))
    }
}
