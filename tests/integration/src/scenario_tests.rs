//! Scenario-based integration tests
//!
//! Each test drives several sync runs against JSON issue files on disk and
//! checks what both platforms look like afterwards.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use pmsync_core::{
    EnginePaths, FieldMap, IssueQuery, JsonFileClient, Platform, PlatformClient, PlatformError,
    PlatformResult, RawIssue, SyncEngine, SyncStatus, SyncSummary,
};
use pmsync_test_utils::fixtures::{config_yaml, issue, project_issue};
use pmsync_test_utils::workspace::TestWorkspace;
use serde_json::{Value, json};

// =============================================================================
// Test Infrastructure
// =============================================================================

fn engine_with(ws: &TestWorkspace, extra: &[&str]) -> SyncEngine {
    let config = ws.write_config("sync.yaml", &config_yaml("scenario", "jira", "linear", extra));
    SyncEngine::from_yaml(&config, EnginePaths::new(ws.state_dir(), ws.audit_dir())).unwrap()
}

fn clients(ws: &TestWorkspace) -> (JsonFileClient, JsonFileClient) {
    (
        JsonFileClient::in_dir(&ws.data_dir(), Platform::Jira),
        JsonFileClient::in_dir(&ws.data_dir(), Platform::Linear),
    )
}

async fn run(ws: &TestWorkspace, engine: &mut SyncEngine) -> SyncSummary {
    let (source, target) = clients(ws);
    engine.sync_project(&source, &target, None).await.unwrap()
}

/// Rewrite one stored issue as if it was edited on the platform just now.
fn edit(ws: &TestWorkspace, platform: &str, id: &str, field: &str, value: Value) {
    let mut issues = ws.read_issues(platform);
    let stored = issues
        .iter_mut()
        .find(|i| i["id"] == json!(id))
        .unwrap_or_else(|| panic!("{platform} has no issue {id}"));
    stored["fields"][field] = value;
    stored["updated_at"] = json!(Utc::now().to_rfc3339());
    ws.write_issues(platform, issues);
}

fn only_id(ws: &TestWorkspace, platform: &str) -> String {
    let issues = ws.read_issues(platform);
    assert_eq!(issues.len(), 1, "{platform} should hold exactly one issue");
    issues[0]["id"].as_str().unwrap().to_string()
}

/// Fails the first `failures` searches with a transient error.
struct Flaky {
    inner: JsonFileClient,
    failures: AtomicU32,
    searches: AtomicU32,
}

#[async_trait]
impl PlatformClient for Flaky {
    fn platform(&self) -> Platform {
        self.inner.platform()
    }

    async fn search_issues(&self, query: &IssueQuery) -> PlatformResult<Vec<RawIssue>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        let left = self.failures.load(Ordering::SeqCst);
        if left > 0 {
            self.failures.store(left - 1, Ordering::SeqCst);
            return Err(PlatformError::transient("rate limited"));
        }
        self.inner.search_issues(query).await
    }

    async fn create_issue(&self, project: Option<&str>, fields: &FieldMap) -> PlatformResult<RawIssue> {
        self.inner.create_issue(project, fields).await
    }

    async fn update_issue(&self, id: &str, fields: &FieldMap) -> PlatformResult<bool> {
        self.inner.update_issue(id, fields).await
    }
}

// =============================================================================
// Bidirectional
// =============================================================================

#[tokio::test]
async fn test_target_edit_flows_back_to_source() {
    let ws = TestWorkspace::new();
    ws.write_issues("jira", vec![issue("PROJ-1", json!({"summary": "Draft"}), 0)]);
    let mut engine = engine_with(&ws, &["direction: bidirectional"]);
    run(&ws, &mut engine).await;

    let linear_id = only_id(&ws, "linear");
    edit(&ws, "linear", &linear_id, "title", json!("Edited in Linear"));
    let summary = run(&ws, &mut engine).await;

    assert_eq!(summary.updated, 1);
    let pushed = &summary.results[0];
    assert_eq!(pushed.source_platform, Platform::Linear);
    assert_eq!(pushed.target_platform, Platform::Jira);
    assert_eq!(ws.read_issues("jira")[0]["fields"]["summary"], json!("Edited in Linear"));

    // Settled: nothing left to do
    let settled = run(&ws, &mut engine).await;
    assert_eq!(settled.skipped, 1);
    assert_eq!(settled.total(), 1);
}

#[tokio::test]
async fn test_target_only_issue_is_created_in_source() {
    let ws = TestWorkspace::new();
    ws.write_issues("jira", vec![issue("PROJ-1", json!({"summary": "From Jira"}), 0)]);
    ws.write_issues("linear", vec![issue("LIN-9", json!({"title": "From Linear"}), 0)]);
    let mut engine = engine_with(&ws, &["direction: bidirectional"]);

    let summary = run(&ws, &mut engine).await;

    assert_eq!(summary.created, 2);
    let jira: Vec<Value> = ws.read_issues("jira").iter().map(|i| i["fields"]["summary"].clone()).collect();
    assert!(jira.contains(&json!("From Linear")));
    assert_eq!(ws.read_issues("linear").len(), 2);

    // The reverse-created pair is linked and stays put
    let again = run(&ws, &mut engine).await;
    assert_eq!(again.created, 0);
    assert_eq!(ws.read_issues("jira").len(), 2);
    assert_eq!(ws.read_issues("linear").len(), 2);
}

#[tokio::test]
async fn test_one_way_leaves_target_edits_alone() {
    let ws = TestWorkspace::new();
    ws.write_issues("jira", vec![issue("PROJ-1", json!({"summary": "Draft"}), 0)]);
    let mut engine = engine_with(&ws, &[]);
    run(&ws, &mut engine).await;

    let linear_id = only_id(&ws, "linear");
    edit(&ws, "linear", &linear_id, "title", json!("Local tweak"));
    let summary = run(&ws, &mut engine).await;

    assert_eq!(summary.skipped, 1);
    assert_eq!(ws.read_issues("jira")[0]["fields"]["summary"], json!("Draft"));
}

// =============================================================================
// Conflicts
// =============================================================================

#[tokio::test]
async fn test_newest_edit_wins_when_target_is_newer() {
    let ws = TestWorkspace::new();
    ws.write_issues("jira", vec![issue("PROJ-1", json!({"summary": "v1"}), 0)]);
    let mut engine = engine_with(&ws, &["conflict_strategy: newest", "direction: bidirectional"]);
    run(&ws, &mut engine).await;

    // Source edit is older than the target edit, inside the conflict window
    let earlier = Utc::now() - Duration::seconds(2);
    ws.write_issues(
        "jira",
        vec![json!({"id": "PROJ-1", "updated_at": earlier.to_rfc3339(), "fields": {"summary": "jira v2"}})],
    );
    let linear_id = only_id(&ws, "linear");
    edit(&ws, "linear", &linear_id, "title", json!("linear v2"));

    let summary = run(&ws, &mut engine).await;

    let result = &summary.results[0];
    assert_eq!(result.status, SyncStatus::Completed);
    assert!(result.resolution.as_deref().unwrap_or_default().starts_with("Target has newer"));
    assert_eq!(ws.read_issues("jira")[0]["fields"]["summary"], json!("linear v2"));
    assert_eq!(ws.read_issues("linear")[0]["fields"]["title"], json!("linear v2"));
}

#[tokio::test]
async fn test_manual_conflict_keeps_both_sides() {
    let ws = TestWorkspace::new();
    ws.write_issues("jira", vec![issue("PROJ-1", json!({"summary": "v1"}), 0)]);
    let mut engine = engine_with(&ws, &["conflict_strategy: manual"]);
    run(&ws, &mut engine).await;

    let linear_id = only_id(&ws, "linear");
    edit(&ws, "jira", "PROJ-1", "summary", json!("jira edit"));
    edit(&ws, "linear", &linear_id, "title", json!("linear edit"));

    let summary = run(&ws, &mut engine).await;

    assert_eq!(summary.conflicts, 1);
    assert!(!summary.is_clean());
    assert_eq!(ws.read_issues("jira")[0]["fields"]["summary"], json!("jira edit"));
    assert_eq!(ws.read_issues("linear")[0]["fields"]["title"], json!("linear edit"));

    let audited = engine.auditor().get_sync_history("PROJ-1", 1).unwrap();
    assert_eq!(audited.last().map(|e| e.result.status), Some(SyncStatus::Conflict));
}

// =============================================================================
// Scoping and resilience
// =============================================================================

#[tokio::test]
async fn test_project_filter_limits_the_run() {
    let ws = TestWorkspace::new();
    ws.write_issues(
        "jira",
        vec![
            project_issue("WEB-1", "WEB", json!({"summary": "web"}), 0),
            project_issue("API-1", "API", json!({"summary": "api"}), 0),
        ],
    );
    let mut engine = engine_with(&ws, &[]);
    let (source, target) = clients(&ws);

    let summary = engine.sync_project(&source, &target, Some("WEB")).await.unwrap();

    assert_eq!(summary.total(), 1);
    assert_eq!(summary.results[0].item_id, "WEB-1");
    let created = ws.read_issues("linear");
    assert_eq!(created.len(), 1);
    assert_eq!(created[0]["project"], json!("WEB"));
}

#[tokio::test]
async fn test_transient_search_failures_are_retried() {
    let ws = TestWorkspace::new();
    ws.write_issues("jira", vec![issue("PROJ-1", json!({"summary": "retry me"}), 0)]);
    let mut engine = engine_with(&ws, &["max_retries: 3", "retry_backoff_ms: 1"]);
    let (inner, target) = clients(&ws);
    let source = Flaky {
        inner,
        failures: AtomicU32::new(2),
        searches: AtomicU32::new(0),
    };

    let summary = engine.sync_project(&source, &target, None).await.unwrap();

    assert_eq!(summary.created, 1);
    assert!(source.searches.load(Ordering::SeqCst) >= 3);
}

#[tokio::test]
async fn test_corrupt_target_file_fails_the_run() {
    let ws = TestWorkspace::new();
    ws.write_issues("jira", vec![issue("PROJ-1", json!({"summary": "x"}), 0)]);
    std::fs::write(ws.data_dir().join("linear.json"), "{ not json").unwrap();
    let mut engine = engine_with(&ws, &["enable_retry: false"]);
    let (source, target) = clients(&ws);

    let err = engine.sync_project(&source, &target, None).await.unwrap_err();

    assert!(err.to_string().contains("linear.json"), "got {err}");
    ws.assert_file_not_exists(".pmsync/state/scenario.json");
}
