//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;
use concord_protocols::PolicyRule;

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_workflow(config, &mut result);
        Self::validate_checkpoint(config, &mut result);
        Self::validate_orchestrator(config, &mut result);
        Self::validate_governance(config, &mut result);
        Self::validate_logging(config, &mut result);

        Ok(result)
    }

    /// Validate and turn the first error into a `ConfigError`.
    pub fn ensure_valid(config: &Config) -> Result<ValidationResult, ConfigError> {
        let result = Self::validate(config)?;
        if let Some(first) = result.errors.first() {
            return Err(ConfigError::InvalidValue {
                field: first.path.clone(),
                message: first.message.clone(),
            });
        }
        Ok(result)
    }

    fn validate_workflow(config: &Config, result: &mut ValidationResult) {
        let workflow = &config.workflow;

        if workflow.step_timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "workflow.step_timeout_secs",
                "step_timeout_secs must be greater than 0",
            ));
        }

        if workflow.max_retry_per_step > 10 {
            result.add_warning(ValidationWarning::new(
                "workflow.max_retry_per_step",
                "max_retry_per_step is very high (>10), failing steps will be retried for a long time",
            ));
        }

        if workflow.backoff_multiplier < 1.0 || workflow.backoff_multiplier.is_nan() {
            result.add_error(ValidationError::new(
                "workflow.backoff_multiplier",
                "backoff_multiplier must be at least 1.0",
            ));
        }

        if workflow.max_backoff_ms < workflow.base_backoff_ms {
            result.add_warning(ValidationWarning::new(
                "workflow.max_backoff_ms",
                "max_backoff_ms is below base_backoff_ms, every retry will wait max_backoff_ms",
            ));
        }
    }

    fn validate_checkpoint(config: &Config, result: &mut ValidationResult) {
        let valid_backends = ["memory", "file"];
        if !valid_backends.contains(&config.checkpoint.backend.as_str()) {
            result.add_error(ValidationError::new(
                "checkpoint.backend",
                format!(
                    "Unknown checkpoint backend '{}', valid values: {:?}",
                    config.checkpoint.backend, valid_backends
                ),
            ));
        }

        if config.checkpoint.backend == "memory" {
            result.add_warning(ValidationWarning::new(
                "checkpoint.backend",
                "memory backend does not survive restarts, workflows cannot be resumed after exit",
            ));
        }

        if config.checkpoint.backend == "file" && config.checkpoint.storage_path.trim().is_empty() {
            result.add_error(ValidationError::new(
                "checkpoint.storage_path",
                "storage_path cannot be empty for the file backend",
            ));
        }
    }

    fn validate_orchestrator(config: &Config, result: &mut ValidationResult) {
        let orchestrator = &config.orchestrator;

        if orchestrator.swarm_max_rounds == 0 {
            result.add_error(ValidationError::new(
                "orchestrator.swarm_max_rounds",
                "swarm_max_rounds must be greater than 0",
            ));
        }

        if orchestrator.convergence_marker.trim().is_empty() {
            result.add_error(ValidationError::new(
                "orchestrator.convergence_marker",
                "convergence_marker cannot be empty",
            ));
        }

        if orchestrator.completion_marker.trim().is_empty() {
            result.add_warning(ValidationWarning::new(
                "orchestrator.completion_marker",
                "completion_marker is empty, competitive tasks will always be decided by score",
            ));
        }

        if orchestrator.max_instances_per_agent == 0 {
            result.add_error(ValidationError::new(
                "orchestrator.max_instances_per_agent",
                "max_instances_per_agent must be greater than 0",
            ));
        }

        if orchestrator.compliance_channel.trim().is_empty() {
            result.add_error(ValidationError::new(
                "orchestrator.compliance_channel",
                "compliance_channel cannot be empty",
            ));
        }
    }

    fn validate_governance(config: &Config, result: &mut ValidationResult) {
        let mut seen = Vec::new();
        for (i, policy) in config.governance.policies.iter().enumerate() {
            let path = format!("governance.policies[{}]", i);

            if policy.name.trim().is_empty() {
                result.add_error(ValidationError::new(&path, "policy name cannot be empty"));
            } else if seen.contains(&policy.name.as_str()) {
                result.add_warning(ValidationWarning::new(
                    &path,
                    format!("duplicate policy name '{}'", policy.name),
                ));
            } else {
                seen.push(policy.name.as_str());
            }

            match &policy.rule {
                PolicyRule::AmountThreshold { field, max, .. } => {
                    if *max < 0.0 || max.is_nan() {
                        result.add_error(ValidationError::new(
                            format!("{}.rule.max", path),
                            "threshold must be a non-negative number",
                        ));
                    }
                    if field.trim().is_empty() {
                        result.add_error(ValidationError::new(
                            format!("{}.rule.field", path),
                            "field cannot be empty",
                        ));
                    }
                }
                PolicyRule::RequiredContext { field } => {
                    if field.trim().is_empty() {
                        result.add_error(ValidationError::new(
                            format!("{}.rule.field", path),
                            "field cannot be empty",
                        ));
                    }
                }
                PolicyRule::ForbiddenAgent { agent_type } => {
                    if agent_type.trim().is_empty() {
                        result.add_error(ValidationError::new(
                            format!("{}.rule.agent_type", path),
                            "agent_type cannot be empty",
                        ));
                    }
                }
            }
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        let level = config.logging.level.to_lowercase();
        // directive strings like "concord=debug" are passed through as-is
        if !level.contains('=') && !valid_levels.contains(&level.as_str()) {
            result.add_warning(ValidationWarning::new(
                "logging.level",
                format!("Unknown log level '{}', valid values: {:?}", config.logging.level, valid_levels),
            ));
        }
    }
}
