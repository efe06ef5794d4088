//! Task subcommand handler.

use tracing::info;

use concord_config::Config;
use concord_orchestrator::OrchestrationEngine;
use concord_protocols::{
    AgentDefinition, AgentExecutionRequest, AgentTask, AutonomyLevel, CoordinationPattern,
};
use tokio_util::sync::CancellationToken;

use crate::adapters::{EchoRuntime, engine_ports, orchestrator_config};

/// Options collected from the `task` subcommand.
pub(crate) struct TaskOptions {
    pub pattern: CoordinationPattern,
    pub goal: String,
    pub agents: Vec<String>,
    pub autonomy: AutonomyLevel,
    pub user: String,
    pub context: Vec<(String, String)>,
    pub approve: bool,
    pub converge_after: u32,
}

/// Context values are parsed as JSON when they parse, kept as strings otherwise.
fn context_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

pub(crate) fn build_request(options: &TaskOptions) -> AgentExecutionRequest {
    let task = options.context.iter().fold(
        AgentTask::new(options.goal.clone(), options.agents.clone()),
        |task, (key, value)| task.with_context(key.clone(), context_value(value)),
    );
    AgentExecutionRequest::new(task, options.user.clone(), options.pattern)
}

/// Run one task against the in-process echo agents.
pub(crate) async fn run_task(config: &Config, options: TaskOptions) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = EchoRuntime::new(options.converge_after, config.orchestrator.convergence_marker.clone());
    let engine = OrchestrationEngine::new(
        orchestrator_config(config),
        engine_ports(config, runtime, options.approve),
    );
    for agent in &options.agents {
        engine.register_agent(
            AgentDefinition::new(agent.as_str(), options.autonomy).with_description("in-process echo agent"),
        );
    }

    let request = build_request(&options);
    info!(task_id = %request.task.id, pattern = %request.pattern, "Submitting task");

    let cancellation = CancellationToken::new();
    let interrupt = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let response = engine.execute_task_with_cancel(request, cancellation).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    if !response.success {
        eprintln!("Task did not succeed: {}", response.summary);
    }
    Ok(())
}
