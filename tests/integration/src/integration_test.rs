//! End-to-end integration test for the disk-backed sync flow
//!
//! This test exercises the complete flow: config file -> engine -> JSON issue
//! files -> tracker state -> audit trail, across several runs.

use pmsync_core::{
    EnginePaths, JsonFileClient, Platform, SyncAction, SyncEngine, SyncStatus, SyncSummary,
};
use pmsync_test_utils::fixtures::{JIRA_TO_GITHUB_YAML, issue, jira_fields};
use pmsync_test_utils::workspace::TestWorkspace;
use pretty_assertions::assert_eq;
use serde_json::json;

fn engine(ws: &TestWorkspace) -> SyncEngine {
    let config = ws.write_config("sync.yaml", JIRA_TO_GITHUB_YAML);
    SyncEngine::from_yaml(&config, EnginePaths::new(ws.state_dir(), ws.audit_dir())).unwrap()
}

async fn run(ws: &TestWorkspace, engine: &mut SyncEngine) -> SyncSummary {
    let source = JsonFileClient::in_dir(&ws.data_dir(), Platform::Jira);
    let target = JsonFileClient::in_dir(&ws.data_dir(), Platform::Github);
    engine.sync_project(&source, &target, None).await.unwrap()
}

fn seed(ws: &TestWorkspace) {
    ws.write_issues(
        "jira",
        vec![
            issue("PROJ-1", jira_fields("Login page", "Open", "3"), 0),
            issue("PROJ-2", jira_fields("Signup form", "Done", "8"), 0),
        ],
    );
}

#[tokio::test]
async fn test_first_run_creates_every_issue() {
    let ws = TestWorkspace::new();
    seed(&ws);
    let mut engine = engine(&ws);

    let summary = run(&ws, &mut engine).await;

    assert_eq!((summary.created, summary.errors), (2, 0));
    let target = ws.read_issues("github");
    assert_eq!(target.len(), 2);
    assert_eq!(
        target[0]["fields"],
        json!({"title": "Login page", "state": "open", "estimate": 3})
    );
    ws.assert_file_exists(".pmsync/state/jira-to-github.json");
}

#[tokio::test]
async fn test_source_edit_updates_linked_target() {
    let ws = TestWorkspace::new();
    seed(&ws);
    let mut engine = engine(&ws);
    run(&ws, &mut engine).await;

    ws.write_issues(
        "jira",
        vec![
            issue("PROJ-1", jira_fields("Login page v2", "Open", "3"), 60),
            issue("PROJ-2", jira_fields("Signup form", "Done", "8"), 0),
        ],
    );
    let summary = run(&ws, &mut engine).await;

    assert_eq!((summary.created, summary.updated, summary.skipped), (0, 1, 1));
    let update = summary.results_for("PROJ-1").next().unwrap();
    assert_eq!(update.action, SyncAction::Update);
    assert_eq!(update.changes.keys().collect::<Vec<_>>(), vec!["title"]);
    assert_eq!(update.changes["title"].old, Some(json!("Login page")));

    let target = ws.read_issues("github");
    assert_eq!(target.len(), 2);
    assert_eq!(target[0]["fields"]["title"], json!("Login page v2"));
}

#[tokio::test]
async fn test_restarted_engine_resumes_from_saved_state() {
    let ws = TestWorkspace::new();
    seed(&ws);
    run(&ws, &mut engine(&ws)).await;

    let mut restarted = engine(&ws);
    let summary = run(&ws, &mut restarted).await;

    assert_eq!(summary.skipped, 2);
    assert!(summary.results.iter().all(|r| r.status == SyncStatus::Skipped));
    assert_eq!(ws.read_issues("github").len(), 2);
}

#[tokio::test]
async fn test_audit_trail_covers_every_run() {
    let ws = TestWorkspace::new();
    seed(&ws);
    let mut engine = engine(&ws);
    run(&ws, &mut engine).await;
    run(&ws, &mut engine).await;

    let entries = ws.audit_entries();
    assert_eq!(entries.len(), 4);

    let history = engine.auditor().get_sync_history("PROJ-1", 1).unwrap();
    let statuses: Vec<SyncStatus> = history.iter().map(|e| e.result.status).collect();
    assert_eq!(statuses, vec![SyncStatus::Completed, SyncStatus::Skipped]);
}

#[tokio::test]
async fn test_dry_run_then_real_run() {
    let ws = TestWorkspace::new();
    seed(&ws);
    let mut engine = engine(&ws);

    engine.set_dry_run(true);
    let preview = run(&ws, &mut engine).await;
    assert_eq!(preview.created, 2);
    assert!(preview.results.iter().all(|r| r.dry_run));
    assert!(ws.read_issues("github").is_empty());
    ws.assert_file_not_exists(".pmsync/state/jira-to-github.json");

    engine.set_dry_run(false);
    let real = run(&ws, &mut engine).await;
    assert_eq!(real.created, 2);
    assert_eq!(ws.read_issues("github").len(), 2);
}
