//! Configuration schema definitions.

use std::path::PathBuf;

use concord_protocols::PolicyRecord;
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub workflow: WorkflowConfig,

    #[serde(default)]
    pub checkpoint: CheckpointConfig,

    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    #[serde(default)]
    pub governance: GovernanceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Workflow executor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Retries after the first failed attempt of a step.
    #[serde(default = "default_max_retry_per_step")]
    pub max_retry_per_step: u32,

    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,

    /// Delay after the first failed attempt.
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_max_retry_per_step() -> u32 {
    3
}

fn default_step_timeout_secs() -> u64 {
    300
}

fn default_base_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_retry_per_step: default_max_retry_per_step(),
            step_timeout_secs: default_step_timeout_secs(),
            base_backoff_ms: default_base_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

/// Checkpoint store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// `memory` or `file`.
    #[serde(default = "default_checkpoint_backend")]
    pub backend: String,

    /// Base directory for the file backend. `~` is expanded.
    #[serde(default = "default_checkpoint_path")]
    pub storage_path: String,
}

fn default_checkpoint_backend() -> String {
    "file".to_string()
}

fn default_checkpoint_path() -> String {
    "~/.concord/checkpoints".to_string()
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            backend: default_checkpoint_backend(),
            storage_path: default_checkpoint_path(),
        }
    }
}

impl CheckpointConfig {
    /// Storage path with `~` expanded.
    pub fn resolved_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.storage_path).to_string())
    }
}

/// Orchestration engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_swarm_max_rounds")]
    pub swarm_max_rounds: u32,

    #[serde(default = "default_convergence_marker")]
    pub convergence_marker: String,

    #[serde(default = "default_completion_marker")]
    pub completion_marker: String,

    #[serde(default = "default_max_instances_per_agent")]
    pub max_instances_per_agent: usize,

    #[serde(default = "default_compliance_channel")]
    pub compliance_channel: String,
}

fn default_swarm_max_rounds() -> u32 {
    5
}

fn default_convergence_marker() -> String {
    "COMPLETE".to_string()
}

fn default_completion_marker() -> String {
    "FINAL".to_string()
}

fn default_max_instances_per_agent() -> usize {
    8
}

fn default_compliance_channel() -> String {
    "compliance".to_string()
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            swarm_max_rounds: default_swarm_max_rounds(),
            convergence_marker: default_convergence_marker(),
            completion_marker: default_completion_marker(),
            max_instances_per_agent: default_max_instances_per_agent(),
            compliance_channel: default_compliance_channel(),
        }
    }
}

/// Static governance policies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GovernanceConfig {
    #[serde(default)]
    pub policies: Vec<PolicyRecord>,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily-rotated log files. `~` is expanded.
    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// Write log files in addition to the console.
    #[serde(default = "default_true")]
    pub file: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "~/.concord/logs".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: default_log_dir(),
            file: default_true(),
        }
    }
}

impl LoggingConfig {
    pub fn resolved_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.log_dir).to_string())
    }
}

/// Default config file location, `~/.concord/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".concord").join("config.toml"))
}
