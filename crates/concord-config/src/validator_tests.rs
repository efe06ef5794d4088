use super::*;
use concord_protocols::PolicyRecord;

#[test]
fn test_validate_default_config() {
    let config = Config::default();
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.is_valid());
    assert!(result.warnings.is_empty());
}

#[test]
fn test_zero_step_timeout() {
    let mut config = Config::default();
    config.workflow.step_timeout_secs = 0;

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(!result.is_valid());
    assert!(result.errors.iter().any(|e| e.path == "workflow.step_timeout_secs"));
}

#[test]
fn test_high_retry_warning() {
    let mut config = Config::default();
    config.workflow.max_retry_per_step = 50;

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.is_valid());
    assert!(result.warnings.iter().any(|w| w.path == "workflow.max_retry_per_step"));
}

#[test]
fn test_shrinking_backoff_rejected() {
    let mut config = Config::default();
    config.workflow.backoff_multiplier = 0.5;

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.errors.iter().any(|e| e.path == "workflow.backoff_multiplier"));
}

#[test]
fn test_unknown_backend() {
    let mut config = Config::default();
    config.checkpoint.backend = "sqlite".to_string();

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(!result.is_valid());
    assert!(result.errors[0].message.contains("sqlite"));
}

#[test]
fn test_memory_backend_warns() {
    let mut config = Config::default();
    config.checkpoint.backend = "memory".to_string();

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.is_valid());
    assert_eq!(result.warnings.len(), 1);
}

#[test]
fn test_empty_convergence_marker() {
    let mut config = Config::default();
    config.orchestrator.convergence_marker = "  ".to_string();

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.errors.iter().any(|e| e.path == "orchestrator.convergence_marker"));
}

#[test]
fn test_negative_policy_threshold() {
    let mut config = Config::default();
    config.governance.policies.push(PolicyRecord::new(
        "refunds",
        PolicyRule::AmountThreshold {
            field: "refund".to_string(),
            max: -1.0,
            approval_field: "human_approved".to_string(),
        },
    ));

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.errors.iter().any(|e| e.path == "governance.policies[0].rule.max"));

    let err = ConfigValidator::ensure_valid(&config).unwrap_err();
    assert!(err.to_string().contains("governance.policies[0].rule.max"));
}

#[test]
fn test_duplicate_policy_names_warn() {
    let mut config = Config::default();
    for _ in 0..2 {
        config.governance.policies.push(PolicyRecord::new(
            "cost-center",
            PolicyRule::RequiredContext {
                field: "cost_center".to_string(),
            },
        ));
    }

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.is_valid());
    assert!(result.warnings.iter().any(|w| w.message.contains("duplicate")));
}

#[test]
fn test_log_directive_accepted() {
    let mut config = Config::default();
    config.logging.level = "concord_workflow=debug,info".to_string();
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.warnings.is_empty());

    config.logging.level = "loud".to_string();
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.warnings.iter().any(|w| w.path == "logging.level"));
}
