use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{IssueQuery, PlatformClient, PlatformError, PlatformResult, RawIssue};
use crate::model::{FieldMap, Platform};

/// Client backed by a JSON array of issues on local disk.
///
/// Every call re-reads the file so external edits between runs are picked
/// up; writes replace the file atomically.
#[derive(Debug, Clone)]
pub struct JsonFileClient {
    platform: Platform,
    path: PathBuf,
}

impl JsonFileClient {
    pub fn new(platform: Platform, path: impl Into<PathBuf>) -> Self {
        Self {
            platform,
            path: path.into(),
        }
    }

    /// Client for `<dir>/<platform>.json`.
    pub fn in_dir(dir: &Path, platform: Platform) -> Self {
        Self::new(platform, dir.join(format!("{}.json", platform)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> PlatformResult<Vec<RawIssue>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(storage(&self.path, e)),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|e| storage(&self.path, e))
    }

    async fn store(&self, issues: &[RawIssue]) -> PlatformResult<()> {
        let bytes = serde_json::to_vec_pretty(issues).map_err(|e| storage(&self.path, e))?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || pmsync_fs::io::write_atomic(&path, &bytes))
            .await
            .map_err(|e| storage(&self.path, e))?
            .map_err(|e| storage(&self.path, e))
    }
}

fn storage(path: &Path, e: impl std::fmt::Display) -> PlatformError {
    PlatformError::Storage {
        message: format!("{}: {}", path.display(), e),
    }
}

#[async_trait]
impl PlatformClient for JsonFileClient {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn search_issues(&self, query: &IssueQuery) -> PlatformResult<Vec<RawIssue>> {
        let issues = self.load().await?;
        Ok(query.page(&issues))
    }

    async fn create_issue(
        &self,
        project: Option<&str>,
        fields: &FieldMap,
    ) -> PlatformResult<RawIssue> {
        let mut issues = self.load().await?;
        let mut issue = RawIssue::new(Uuid::new_v4().simple().to_string(), fields.clone())
            .with_updated_at(Utc::now());
        issue.project = project.map(str::to_string);

        issues.push(issue.clone());
        self.store(&issues).await?;
        tracing::debug!(platform = %self.platform, id = %issue.id, "Created issue");
        Ok(issue)
    }

    async fn update_issue(&self, id: &str, fields: &FieldMap) -> PlatformResult<bool> {
        let mut issues = self.load().await?;
        let issue = issues
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| PlatformError::NotFound { id: id.to_string() })?;

        for (k, v) in fields {
            issue.fields.insert(k.clone(), v.clone());
        }
        issue.updated_at = Some(Utc::now());

        self.store(&issues).await?;
        tracing::debug!(platform = %self.platform, id, "Updated issue");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let client = JsonFileClient::in_dir(dir.path(), Platform::Linear);
        assert!(client.path().ends_with("linear.json"));
        let issues = client.search_issues(&IssueQuery::new(None, 0, 10)).await.unwrap();
        assert!(issues.is_empty());
    }

    #[tokio::test]
    async fn writes_persist_across_clients() {
        let dir = TempDir::new().unwrap();
        let client = JsonFileClient::in_dir(dir.path(), Platform::Github);
        let fields = json!({"title": "A"}).as_object().cloned().unwrap();
        let created = client.create_issue(None, &fields).await.unwrap();

        let patch = json!({"state": "closed"}).as_object().cloned().unwrap();
        assert!(client.update_issue(&created.id, &patch).await.unwrap());

        let reopened = JsonFileClient::in_dir(dir.path(), Platform::Github);
        let issues = reopened.search_issues(&IssueQuery::new(None, 0, 10)).await.unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].fields["title"], json!("A"));
        assert_eq!(issues[0].fields["state"], json!("closed"));
    }

    #[tokio::test]
    async fn corrupt_file_is_a_storage_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("jira.json"), "{oops").unwrap();
        let client = JsonFileClient::in_dir(dir.path(), Platform::Jira);
        let err = client.search_issues(&IssueQuery::new(None, 0, 10)).await.unwrap_err();
        assert!(matches!(err, PlatformError::Storage { .. }));
    }
}
