//! Configuration loading from the checked-in config directory

use order_resolution::config::{ConfigManager, ConfigurationError, UnhandledIssuePolicy};
use order_resolution::ResolutionConfig;
use std::path::PathBuf;
use std::time::Duration;

fn config_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config")
}

fn load(environment: &str) -> ResolutionConfig {
    ConfigManager::load_with_overrides(Some(config_dir()), environment, Some(Default::default()))
        .expect("checked-in configuration should load")
        .config()
        .clone()
}

#[test]
fn test_development_matches_defaults() {
    let config = load("development");
    assert_eq!(config, ResolutionConfig::default());
    assert_eq!(config.retry.max_attempts, 3);
    assert_eq!(config.decision_gate.timeout(), None);
    assert_eq!(config.issues.unhandled_policy, UnhandledIssuePolicy::Reject);
}

#[test]
fn test_test_environment_shortens_invocation_backoff() {
    let config = load("test");
    assert_eq!(config.activity.initial_interval_ms, 10);
    assert_eq!(config.activity.maximum_interval_ms, 100);
    assert_eq!(config.activity.start_to_close_timeout_ms, 2_000);
    assert_eq!(config.events.publisher_capacity, 64);
    // Untouched sections keep the base values
    assert_eq!(config.retry.max_attempts, 3);
    assert_eq!(config.activity.maximum_attempts, 3);
}

#[test]
fn test_production_bounds_the_decision_gate() {
    let config = load("production");
    assert_eq!(
        config.decision_gate.timeout(),
        Some(Duration::from_secs(1_209_600))
    );
    assert_eq!(config.events.publisher_capacity, 10_000);
}

#[test]
fn test_environment_variables_override_files() {
    let overrides = [
        ("ORDER_RESOLUTION__RETRY__MAX_ATTEMPTS", "5"),
        ("ORDER_RESOLUTION__ISSUES__UNHANDLED_POLICY", "escalate"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let manager =
        ConfigManager::load_with_overrides(Some(config_dir()), "test", Some(overrides)).unwrap();
    assert_eq!(manager.environment(), "test");
    assert_eq!(manager.config().retry.max_attempts, 5);
    assert_eq!(
        manager.config().issues.unhandled_policy,
        UnhandledIssuePolicy::Escalate
    );
}

#[test]
fn test_out_of_range_override_is_rejected() {
    let overrides = [(
        "ORDER_RESOLUTION__RETRY__MAX_ATTEMPTS".to_string(),
        "0".to_string(),
    )]
    .into_iter()
    .collect();

    let result = ConfigManager::load_with_overrides(Some(config_dir()), "test", Some(overrides));
    assert!(matches!(
        result,
        Err(ConfigurationError::InvalidValue { ref field, .. }) if field == "retry.max_attempts"
    ));
}
