//! Hand-written port fakes shared by the orchestrator tests.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use concord_protocols::{AgentError, AgentOutput, AgentRuntimeAdapter, AgentTask};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

type Script = Box<dyn Fn(&AgentTask) -> Result<AgentOutput, AgentError> + Send + Sync>;

/// Runtime whose agents answer from per-type scripts and record every call.
#[derive(Default)]
pub(crate) struct ScriptedRuntime {
    scripts: HashMap<String, (Duration, Script)>,
    calls: Mutex<Vec<(String, AgentTask)>>,
}

impl ScriptedRuntime {
    pub(crate) fn agent(
        self,
        agent_type: &str,
        script: impl Fn(&AgentTask) -> Result<AgentOutput, AgentError> + Send + Sync + 'static,
    ) -> Self {
        self.slow_agent(agent_type, Duration::ZERO, script)
    }

    pub(crate) fn slow_agent(
        mut self,
        agent_type: &str,
        delay: Duration,
        script: impl Fn(&AgentTask) -> Result<AgentOutput, AgentError> + Send + Sync + 'static,
    ) -> Self {
        self.scripts
            .insert(agent_type.to_string(), (delay, Box::new(script)));
        self
    }

    /// Tasks an agent type was invoked with, in call order.
    pub(crate) fn calls_for(&self, agent_type: &str) -> Vec<AgentTask> {
        self.calls
            .lock()
            .iter()
            .filter(|(t, _)| t == agent_type)
            .map(|(_, task)| task.clone())
            .collect()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl AgentRuntimeAdapter for ScriptedRuntime {
    async fn execute_agent_logic(
        &self,
        agent_id: &str,
        task: &AgentTask,
        cancellation: CancellationToken,
    ) -> Result<AgentOutput, AgentError> {
        self.calls.lock().push((agent_id.to_string(), task.clone()));
        let (delay, script) = self
            .scripts
            .get(agent_id)
            .ok_or_else(|| AgentError::NotFound(agent_id.to_string()))?;
        if !delay.is_zero() {
            tokio::select! {
                _ = cancellation.cancelled() => return Err(AgentError::Cancelled),
                _ = tokio::time::sleep(*delay) => {}
            }
        }
        script(task)
    }
}
