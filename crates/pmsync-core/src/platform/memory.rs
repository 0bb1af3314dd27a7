use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{IssueQuery, PlatformClient, PlatformError, PlatformResult, RawIssue};
use crate::model::{FieldMap, Platform};

/// A write the client accepted, in call order
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Create { id: String, fields: FieldMap },
    Update { id: String, fields: FieldMap },
}

impl WriteOp {
    pub fn id(&self) -> &str {
        match self {
            Self::Create { id, .. } | Self::Update { id, .. } => id,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    issues: Vec<RawIssue>,
    next_id: u64,
    transient_failures: u32,
    rejected: HashSet<String>,
    writes: Vec<WriteOp>,
    calls: usize,
}

/// Process-local client holding issues in memory.
///
/// Supports fault injection: a number of upcoming calls can be made to fail
/// transiently, and writes to specific ids can be rejected permanently.
#[derive(Debug)]
pub struct InMemoryClient {
    platform: Platform,
    inner: Mutex<Inner>,
}

impl InMemoryClient {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn with_issues(platform: Platform, issues: impl IntoIterator<Item = RawIssue>) -> Self {
        let client = Self::new(platform);
        for issue in issues {
            client.insert(issue);
        }
        client
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert or replace an issue directly, bypassing write recording.
    pub fn insert(&self, issue: RawIssue) {
        let mut inner = self.lock();
        match inner.issues.iter_mut().find(|i| i.id == issue.id) {
            Some(existing) => *existing = issue,
            None => inner.issues.push(issue),
        }
    }

    pub fn issue(&self, id: &str) -> Option<RawIssue> {
        self.lock().issues.iter().find(|i| i.id == id).cloned()
    }

    pub fn issues(&self) -> Vec<RawIssue> {
        self.lock().issues.clone()
    }

    /// Make the next `n` calls fail with a transient error.
    pub fn fail_next(&self, n: u32) {
        self.lock().transient_failures = n;
    }

    /// Reject every write to `id` with a permanent error.
    pub fn reject_writes_to(&self, id: impl Into<String>) {
        self.lock().rejected.insert(id.into());
    }

    pub fn writes(&self) -> Vec<WriteOp> {
        self.lock().writes.clone()
    }

    /// Total calls received, including failed ones.
    pub fn calls(&self) -> usize {
        self.lock().calls
    }

    fn begin_call(inner: &mut Inner) -> PlatformResult<()> {
        inner.calls += 1;
        if inner.transient_failures > 0 {
            inner.transient_failures -= 1;
            return Err(PlatformError::transient("injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl PlatformClient for InMemoryClient {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn search_issues(&self, query: &IssueQuery) -> PlatformResult<Vec<RawIssue>> {
        let mut inner = self.lock();
        Self::begin_call(&mut inner)?;
        Ok(query.page(&inner.issues))
    }

    async fn create_issue(
        &self,
        project: Option<&str>,
        fields: &FieldMap,
    ) -> PlatformResult<RawIssue> {
        let mut inner = self.lock();
        Self::begin_call(&mut inner)?;

        inner.next_id += 1;
        let id = format!("{}-{}", self.platform, inner.next_id);
        let mut issue = RawIssue::new(id.clone(), fields.clone()).with_updated_at(Utc::now());
        issue.project = project.map(str::to_string);

        inner.issues.push(issue.clone());
        inner.writes.push(WriteOp::Create {
            id,
            fields: fields.clone(),
        });
        Ok(issue)
    }

    async fn update_issue(&self, id: &str, fields: &FieldMap) -> PlatformResult<bool> {
        let mut inner = self.lock();
        Self::begin_call(&mut inner)?;

        if inner.rejected.contains(id) {
            return Err(PlatformError::rejected(format!("writes to {} are not allowed", id)));
        }

        let issue = inner
            .issues
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| PlatformError::NotFound { id: id.to_string() })?;
        for (k, v) in fields {
            issue.fields.insert(k.clone(), v.clone());
        }
        issue.updated_at = Some(Utc::now());

        inner.writes.push(WriteOp::Update {
            id: id.to_string(),
            fields: fields.clone(),
        });
        Ok(true)
    }
}
