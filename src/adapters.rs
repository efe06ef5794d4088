//! In-process adapters behind the engine ports, and helpers mapping the
//! loaded configuration onto the engine crates.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use concord_checkpoint::{CheckpointBackend, CheckpointConfig};
use concord_config::{Config, ConfigError};
use concord_orchestrator::{EnginePorts, OrchestratorConfig};
use concord_protocols::{
    ActionProposal, AgentError, AgentKnowledgeRepository, AgentOutput, AgentRuntimeAdapter, AgentTask,
    ApprovalAdapter, ApprovalDecision, ApprovalRequest, Delegation, DignityAssessment, GovernancePort,
    InformationEthicsPort, KnowledgeEntry, NormativeAgencyPort, NormativeAssessment, Notification,
    NotificationPort, PolicyRecord, PortError,
};
use concord_workflow::{ExecutorConfig, RetryPolicy};

/// Map `[workflow]` backoff settings to the executor config.
pub(crate) fn executor_config(config: &Config) -> ExecutorConfig {
    let workflow = &config.workflow;
    ExecutorConfig {
        retry: RetryPolicy::fixed(
            Duration::from_millis(workflow.base_backoff_ms),
            Duration::from_millis(workflow.max_backoff_ms),
            workflow.backoff_multiplier,
        ),
    }
}

/// Map `[checkpoint]` to the store config.
pub(crate) fn checkpoint_config(config: &Config) -> Result<CheckpointConfig, ConfigError> {
    match config.checkpoint.backend.as_str() {
        "memory" => Ok(CheckpointConfig::memory()),
        "file" => Ok(CheckpointConfig::file(config.checkpoint.resolved_path())),
        other => Err(ConfigError::InvalidValue {
            field: "checkpoint.backend".to_string(),
            message: format!("unknown backend '{}'", other),
        }),
    }
}

/// Map `[orchestrator]` to the engine config.
pub(crate) fn orchestrator_config(config: &Config) -> OrchestratorConfig {
    let o = &config.orchestrator;
    OrchestratorConfig {
        swarm_max_rounds: o.swarm_max_rounds,
        convergence_marker: o.convergence_marker.clone(),
        completion_marker: o.completion_marker.clone(),
        max_instances_per_agent: o.max_instances_per_agent,
        compliance_channel: o.compliance_channel.clone(),
    }
}

/// Whether the configured backend survives a restart.
pub(crate) fn is_durable(config: &CheckpointConfig) -> bool {
    config.backend == CheckpointBackend::File
}

/// Wire the in-process adapters into engine ports.
pub(crate) fn engine_ports(config: &Config, runtime: EchoRuntime, approve: bool) -> EnginePorts {
    let ethics = Arc::new(PermissiveEthics);
    EnginePorts {
        runtime: Arc::new(runtime),
        normative: ethics.clone(),
        dignity: ethics,
        governance: Arc::new(StaticGovernance::new(config.governance.policies.clone())),
        notifications: Arc::new(LogNotifier),
        approval: Arc::new(AutoApproval { approve }),
        knowledge: Some(Arc::new(MemoryKnowledge::default())),
    }
}

/// Deterministic agent runtime that echoes the goal it was given.
///
/// Coordinators delegate one sub-goal per worker, swarm members emit the
/// convergence marker from `converge_after` onwards and competitive runs
/// are scored by agent type.
pub(crate) struct EchoRuntime {
    converge_after: u32,
    convergence_marker: String,
}

impl EchoRuntime {
    pub(crate) fn new(converge_after: u32, convergence_marker: impl Into<String>) -> Self {
        Self {
            converge_after,
            convergence_marker: convergence_marker.into(),
        }
    }

    fn score(agent_id: &str) -> f64 {
        let sum: u32 = agent_id.bytes().map(u32::from).sum();
        f64::from(sum % 100) / 100.0
    }
}

#[async_trait]
impl AgentRuntimeAdapter for EchoRuntime {
    async fn execute_agent_logic(
        &self,
        agent_id: &str,
        task: &AgentTask,
        cancellation: CancellationToken,
    ) -> Result<AgentOutput, AgentError> {
        if cancellation.is_cancelled() {
            return Err(AgentError::Cancelled);
        }
        if task.goal.trim().is_empty() {
            return Err(AgentError::ExecutionFailed(format!("{} received an empty goal", agent_id)));
        }

        let role = task.context.get("role").and_then(|v| v.as_str());
        let phase = task.context.get("phase").and_then(|v| v.as_str());
        match (role, phase) {
            (Some("coordinator"), Some("synthesis")) => {
                let parts = task
                    .context
                    .get("sub_results")
                    .and_then(|v| v.as_array())
                    .map(|a| a.len())
                    .unwrap_or(0);
                return Ok(AgentOutput::text(format!(
                    "{} synthesized {} sub-results for: {}",
                    agent_id, parts, task.goal
                )));
            }
            (Some("coordinator"), _) => {
                let workers: Vec<String> = task
                    .context
                    .get("workers")
                    .and_then(|v| serde_json::from_value(v.clone()).ok())
                    .unwrap_or_default();
                let delegations = workers
                    .iter()
                    .map(|w| Delegation::to(w.as_str(), format!("{} ({} part)", task.goal, w)))
                    .collect();
                return Ok(AgentOutput::text(format!("{} planned: {}", agent_id, task.goal))
                    .with_delegations(delegations));
            }
            _ => {}
        }

        let mut content = format!("{} handled: {}", agent_id, task.goal);
        if let Some(round) = task.context.get("round").and_then(|v| v.as_u64()) {
            content = format!("{} (round {})", content, round);
            if round >= u64::from(self.converge_after) {
                content = format!("{} {}", content, self.convergence_marker);
            }
        }
        Ok(AgentOutput::text(content).with_score(Self::score(agent_id)))
    }
}

/// Ethics review that accepts every proposal.
pub(crate) struct PermissiveEthics;

#[async_trait]
impl NormativeAgencyPort for PermissiveEthics {
    async fn validate_action(&self, _proposal: &ActionProposal) -> Result<NormativeAssessment, PortError> {
        Ok(NormativeAssessment::valid())
    }
}

#[async_trait]
impl InformationEthicsPort for PermissiveEthics {
    async fn assess_dignity(&self, _proposal: &ActionProposal) -> Result<DignityAssessment, PortError> {
        Ok(DignityAssessment::preserved())
    }
}

/// Policies from the `[governance]` config section.
pub(crate) struct StaticGovernance {
    policies: Vec<PolicyRecord>,
}

impl StaticGovernance {
    pub(crate) fn new(policies: Vec<PolicyRecord>) -> Self {
        Self { policies }
    }
}

#[async_trait]
impl GovernancePort for StaticGovernance {
    async fn list_policies(&self) -> Result<Vec<PolicyRecord>, PortError> {
        Ok(self.policies.clone())
    }
}

/// Notifications go to the log.
pub(crate) struct LogNotifier;

#[async_trait]
impl NotificationPort for LogNotifier {
    async fn send(&self, notification: Notification) -> Result<(), PortError> {
        warn!(
            channel = %notification.channel,
            priority = ?notification.priority,
            title = %notification.title,
            "{}",
            notification.message
        );
        Ok(())
    }
}

/// Answers every approval request the same way.
pub(crate) struct AutoApproval {
    approve: bool,
}

#[async_trait]
impl ApprovalAdapter for AutoApproval {
    async fn request_approval(&self, request: &ApprovalRequest) -> Result<ApprovalDecision, PortError> {
        info!(
            task_id = %request.task_id,
            user = %request.requesting_user,
            autonomy = ?request.autonomy,
            approved = self.approve,
            "Approval requested"
        );
        if self.approve {
            Ok(ApprovalDecision::approve("cli"))
        } else {
            Ok(ApprovalDecision::deny("no approver available; pass --approve"))
        }
    }
}

/// Process-local knowledge store.
#[derive(Default)]
pub(crate) struct MemoryKnowledge {
    entries: RwLock<Vec<KnowledgeEntry>>,
}

#[async_trait]
impl AgentKnowledgeRepository for MemoryKnowledge {
    async fn record(&self, entry: KnowledgeEntry) -> Result<(), PortError> {
        self.entries.write().push(entry);
        Ok(())
    }

    async fn recall(&self, agent_type: &str, limit: usize) -> Result<Vec<KnowledgeEntry>, PortError> {
        Ok(self
            .entries
            .read()
            .iter()
            .rev()
            .filter(|e| e.agent_type == agent_type)
            .take(limit)
            .cloned()
            .collect())
    }
}
