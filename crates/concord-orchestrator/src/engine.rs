//! Orchestration engine - gates a task, dispatches it to a pattern and
//! aggregates the response.

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;

use std::sync::Arc;

use concord_protocols::{
    ActionProposal, AgentContribution, AgentDefinition, AgentExecutionRequest, AgentExecutionResponse,
    AgentKnowledgeRepository, AgentRuntimeAdapter, AgentTask, ApprovalAdapter, AutonomyLevel, GovernancePort,
    InformationEthicsPort, KnowledgeEntry, NormativeAgencyPort, NotificationPort, ResponseOutcome,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::OrchestratorConfig;
use crate::error::OrchestratorError;
use crate::gate::{ApprovalGate, EthicsGate, GovernanceGate, describe_violation};
use crate::patterns::{PatternContext, strategy_for};
use crate::registry::{AgentInstance, AgentRegistry};

/// Collaborators injected into the engine.
pub struct EnginePorts {
    pub runtime: Arc<dyn AgentRuntimeAdapter>,
    pub normative: Arc<dyn NormativeAgencyPort>,
    pub dignity: Arc<dyn InformationEthicsPort>,
    pub governance: Arc<dyn GovernancePort>,
    pub notifications: Arc<dyn NotificationPort>,
    pub approval: Arc<dyn ApprovalAdapter>,
    /// Receives each contribution of a successful task.
    pub knowledge: Option<Arc<dyn AgentKnowledgeRepository>>,
}

/// Multi-agent orchestration engine.
///
/// Independent `execute_task` calls run concurrently; the only shared
/// state is the agent registry.
pub struct OrchestrationEngine {
    registry: AgentRegistry,
    runtime: Arc<dyn AgentRuntimeAdapter>,
    ethics: EthicsGate,
    governance: GovernanceGate,
    approval: ApprovalGate,
    knowledge: Option<Arc<dyn AgentKnowledgeRepository>>,
    config: OrchestratorConfig,
}

impl OrchestrationEngine {
    pub fn new(config: OrchestratorConfig, ports: EnginePorts) -> Self {
        Self {
            registry: AgentRegistry::new(config.max_instances_per_agent),
            runtime: ports.runtime,
            ethics: EthicsGate::new(ports.normative, ports.dignity),
            governance: GovernanceGate::new(ports.governance, ports.notifications, &config.compliance_channel),
            approval: ApprovalGate::new(ports.approval),
            knowledge: ports.knowledge,
            config,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Add or update an agent type.
    pub fn register_agent(&self, definition: AgentDefinition) {
        self.registry.register(definition);
    }

    pub fn unregister_agent(&self, agent_type: &str) -> Option<AgentDefinition> {
        self.registry.unregister(agent_type)
    }

    pub fn list_agents(&self) -> Vec<AgentDefinition> {
        self.registry.list()
    }

    /// Adjust an agent type's autonomy level.
    pub fn set_autonomy(&self, agent_type: &str, autonomy: AutonomyLevel) -> Result<(), OrchestratorError> {
        self.registry.set_autonomy(agent_type, autonomy)
    }

    /// Spawn a new instance of a registered agent type.
    pub fn spawn_instance(&self, agent_type: &str) -> Result<AgentInstance, OrchestratorError> {
        self.registry.spawn_instance(agent_type)
    }

    pub fn release_instance(&self, agent_type: &str, instance_id: Uuid) -> bool {
        self.registry.release_instance(agent_type, instance_id)
    }

    /// Run a task to completion.
    pub async fn execute_task(&self, request: AgentExecutionRequest) -> Result<AgentExecutionResponse, OrchestratorError> {
        self.execute_task_with_cancel(request, CancellationToken::new()).await
    }

    /// Run a task, observing `cancellation` between agent calls and swarm rounds.
    pub async fn execute_task_with_cancel(
        &self,
        request: AgentExecutionRequest,
        cancellation: CancellationToken,
    ) -> Result<AgentExecutionResponse, OrchestratorError> {
        let task = &request.task;
        if task.required_agent_types.is_empty() {
            return Err(OrchestratorError::NoRequiredAgents(task.id));
        }
        let agents = self.registry.select(&task.required_agent_types)?;

        info!(
            task_id = %task.id,
            pattern = %request.pattern,
            agents = agents.len(),
            user = %request.requesting_user,
            "Executing task"
        );

        Self::ensure_live(&cancellation, task)?;
        let violations = self.ethics.review(&ActionProposal::from_request(&request)).await?;
        if !violations.is_empty() {
            let summary = format!("Ethical review rejected the task: {}", violations.join("; "));
            return Ok(AgentExecutionResponse::rejected(
                task.id,
                ResponseOutcome::EthicalRejection,
                summary,
                violations,
            ));
        }

        Self::ensure_live(&cancellation, task)?;
        let breaches = self.governance.review(task).await?;
        if !breaches.is_empty() {
            let violations: Vec<String> = breaches.iter().map(describe_violation).collect();
            let summary = format!("Governance policy violated: {}", violations.join("; "));
            return Ok(AgentExecutionResponse::rejected(
                task.id,
                ResponseOutcome::GovernanceViolation,
                summary,
                violations,
            ));
        }

        Self::ensure_live(&cancellation, task)?;
        let decision = self
            .approval
            .review(task, &request.requesting_user, &agents)
            .await?;
        if let Some(decision) = decision.filter(|d| !d.approved) {
            let reason = decision.reason.unwrap_or_else(|| "no reason given".to_string());
            warn!(task_id = %task.id, reason = %reason, "Approval denied");
            return Ok(AgentExecutionResponse::rejected(
                task.id,
                ResponseOutcome::ApprovalDenied,
                format!("Approval denied: {}", reason),
                Vec::new(),
            ));
        }

        let ctx = PatternContext {
            runtime: self.runtime.as_ref(),
            config: &self.config,
            cancellation: &cancellation,
        };
        let outcome = strategy_for(request.pattern).coordinate(&ctx, &agents, task).await?;

        if outcome.success {
            self.record_knowledge(&request, &outcome.contributions).await?;
            info!(task_id = %task.id, pattern = %request.pattern, "Task completed");
            Ok(AgentExecutionResponse::completed(
                task.id,
                request.pattern,
                outcome.result,
                outcome.summary,
                outcome.contributions,
            ))
        } else {
            warn!(task_id = %task.id, outcome = ?outcome.outcome, summary = %outcome.summary, "Task unsuccessful");
            Ok(AgentExecutionResponse::unsuccessful(
                task.id,
                request.pattern,
                outcome.outcome,
                outcome.summary,
                outcome.contributions,
            ))
        }
    }

    /// Stop before consulting another port once the task is cancelled.
    fn ensure_live(cancellation: &CancellationToken, task: &AgentTask) -> Result<(), OrchestratorError> {
        if cancellation.is_cancelled() {
            info!(task_id = %task.id, "Task cancelled before dispatch");
            return Err(OrchestratorError::Cancelled(task.id));
        }
        Ok(())
    }

    async fn record_knowledge(
        &self,
        request: &AgentExecutionRequest,
        contributions: &[AgentContribution],
    ) -> Result<(), OrchestratorError> {
        let Some(knowledge) = &self.knowledge else {
            return Ok(());
        };
        for contribution in contributions {
            knowledge
                .record(KnowledgeEntry::new(
                    &contribution.agent_type,
                    request.task.id,
                    &request.task.goal,
                    &contribution.output.content,
                ))
                .await?;
        }
        Ok(())
    }
}
