//! Tests for loading sync configurations from disk

use pmsync_core::{
    ConflictStrategy, EnginePaths, Error, FieldType, Platform, SyncConfiguration, SyncDirection,
    SyncEngine,
};
use pmsync_test_utils::fixtures::{JIRA_TO_GITHUB_YAML, config_yaml};
use pmsync_test_utils::workspace::TestWorkspace;
use rstest::rstest;

#[test]
fn test_fixture_config_loads() {
    let ws = TestWorkspace::new();
    let path = ws.write_config("sync.yaml", JIRA_TO_GITHUB_YAML);

    let config = SyncConfiguration::load(&path).unwrap();

    assert_eq!(config.name(), "jira-to-github");
    assert_eq!(config.source_platform(), Platform::Jira);
    assert_eq!(config.target_platform(), Platform::Github);
    assert_eq!(config.direction(), SyncDirection::OneWay);
    assert_eq!(config.field_mappings().len(), 3);

    let status = &config.field_mappings()[1];
    assert!(!status.is_bidirectional());
    assert_eq!(status.transform(), Some("lowercase"));

    let points = &config.field_mappings()[2];
    assert_eq!(points.target_type(), FieldType::Number);
}

#[test]
fn test_engine_from_yaml_validates_clean() {
    let ws = TestWorkspace::new();
    let path = ws.write_config("sync.yaml", JIRA_TO_GITHUB_YAML);

    let engine = SyncEngine::from_yaml(&path, EnginePaths::under(ws.root())).unwrap();

    assert!(engine.validate_configuration().is_empty());
}

#[rstest]
#[case("batch_size: 2000", "batch_size")]
#[case("batch_size: 0", "batch_size")]
#[case("max_retries: 20", "max_retries")]
#[case("retry_backoff_ms: 0", "retry_backoff_ms")]
#[case("conflict_window_secs: 7200", "conflict_window_secs")]
fn test_out_of_range_settings_are_rejected(#[case] line: &str, #[case] setting: &str) {
    let ws = TestWorkspace::new();
    let path = ws.write_config("sync.yaml", &config_yaml("bad", "jira", "github", &[line]));

    let err = SyncConfiguration::load(&path).unwrap_err();

    assert!(matches!(err, Error::Fs(_)), "got {err:?}");
    assert!(err.to_string().contains(setting), "got {err}");
}

#[rstest]
#[case("conflict_strategy: newest", ConflictStrategy::LastWriteWins)]
#[case("conflict_strategy: source", ConflictStrategy::SourceWins)]
#[case("conflict_strategy: target_wins", ConflictStrategy::TargetWins)]
#[case("conflict_strategy: manual", ConflictStrategy::Manual)]
fn test_strategy_spellings(#[case] line: &str, #[case] expected: ConflictStrategy) {
    let ws = TestWorkspace::new();
    let path = ws.write_config("sync.yaml", &config_yaml("ok", "jira", "linear", &[line]));

    assert_eq!(
        SyncConfiguration::load(&path).unwrap().conflict_strategy(),
        expected
    );
}

#[test]
fn test_blank_field_name_is_rejected() {
    let ws = TestWorkspace::new();
    let yaml = "name: blank\nsource_platform: jira\ntarget_platform: github\nfield_mappings:\n  - source_field: \"  \"\n    target_field: title\n";
    let path = ws.write_config("sync.yaml", yaml);

    assert!(SyncConfiguration::load(&path).is_err());
}

#[test]
fn test_unknown_extension_is_rejected() {
    let ws = TestWorkspace::new();
    let path = ws.write_config("sync.ini", JIRA_TO_GITHUB_YAML);

    assert!(SyncConfiguration::load(&path).is_err());
}
