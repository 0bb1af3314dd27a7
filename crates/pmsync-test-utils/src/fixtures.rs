//! Configuration and issue fixtures.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};

/// A Jira → GitHub configuration with three typed mappings:
///
/// - `summary` → `title`
/// - `status` → `state` (one-way, lowercased)
/// - `story_points` (string) → `estimate` (number)
pub const JIRA_TO_GITHUB_YAML: &str = r#"name: jira-to-github
source_platform: jira
target_platform: github
direction: one-way
conflict_strategy: source_wins
batch_size: 100
max_retries: 3
enable_retry: true
retry_backoff_ms: 1
field_mappings:
  - source_field: summary
    target_field: title
    source_type: string
    target_type: string
  - source_field: status
    target_field: state
    bidirectional: false
    transform: lowercase
  - source_field: story_points
    target_field: estimate
    source_type: string
    target_type: number
"#;

/// A minimal configuration mapping `summary` → `title` with the given
/// settings appended verbatim (one `key: value` per line).
pub fn config_yaml(name: &str, source: &str, target: &str, extra: &[&str]) -> String {
    let mut yaml = format!(
        "name: {name}\nsource_platform: {source}\ntarget_platform: {target}\n"
    );
    for line in extra {
        yaml.push_str(line);
        yaml.push('\n');
    }
    yaml.push_str(
        "field_mappings:\n  - source_field: summary\n    target_field: title\n",
    );
    yaml
}

/// Fixed UTC instant `secs` seconds after 2024-01-01T00:00:00Z.
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .map(|t| t + chrono::Duration::seconds(secs))
        .unwrap_or_else(|| panic!("fixture timestamp out of range"))
}

/// Raw issue JSON as stored by the JSON file client.
pub fn issue(id: &str, fields: Value, updated_secs: i64) -> Value {
    json!({
        "id": id,
        "updated_at": at(updated_secs).to_rfc3339(),
        "fields": fields,
    })
}

/// Same as [`issue`] but tagged with a project.
pub fn project_issue(id: &str, project: &str, fields: Value, updated_secs: i64) -> Value {
    let mut value = issue(id, fields, updated_secs);
    value["project"] = json!(project);
    value
}

/// Fields of a typical Jira issue.
pub fn jira_fields(summary: &str, status: &str, points: &str) -> Value {
    json!({
        "summary": summary,
        "status": status,
        "story_points": points,
        "reporter": "sam",
    })
}
