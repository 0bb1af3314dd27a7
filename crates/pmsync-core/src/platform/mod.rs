//! Platform client contract
//!
//! The engine only ever talks to a platform through [`PlatformClient`]; it
//! never inspects which concrete client it holds beyond the [`Platform`] tag.

mod file;
mod memory;

pub use file::JsonFileClient;
pub use memory::{InMemoryClient, WriteOp};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{FieldMap, Platform};

/// Result type for platform client calls
pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

/// Failure reported by a platform client
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    /// Worth retrying: timeouts, rate limits, 5xx
    #[error("Transient platform error: {message}")]
    Transient { message: String },

    #[error("Request rejected: {message}")]
    Rejected { message: String },

    #[error("Issue not found: {id}")]
    NotFound { id: String },

    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl PlatformError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// An issue as a client reports it, before normalization into a
/// [`SyncItem`](crate::SyncItem)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawIssue {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fields: FieldMap,
}

impl RawIssue {
    pub fn new(id: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            id: id.into(),
            project: None,
            updated_at: None,
            fields,
        }
    }

    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }
}

/// One page of a search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueQuery {
    pub project: Option<String>,
    pub start_at: usize,
    pub max_results: usize,
}

impl IssueQuery {
    pub fn new(project: Option<&str>, start_at: usize, max_results: usize) -> Self {
        Self {
            project: project.map(str::to_string),
            start_at,
            max_results,
        }
    }

    /// True if `issue` belongs to the queried project (or no project filter).
    pub fn matches(&self, issue: &RawIssue) -> bool {
        match &self.project {
            Some(p) => issue.project.as_deref() == Some(p.as_str()),
            None => true,
        }
    }

    /// Apply the filter and page window to an ordered issue list.
    pub fn page<'a>(&self, issues: impl IntoIterator<Item = &'a RawIssue>) -> Vec<RawIssue> {
        issues
            .into_iter()
            .filter(|i| self.matches(i))
            .skip(self.start_at)
            .take(self.max_results)
            .cloned()
            .collect()
    }
}

/// Minimal capability set every platform client provides
#[async_trait]
pub trait PlatformClient: Send + Sync {
    fn platform(&self) -> Platform;

    async fn search_issues(&self, query: &IssueQuery) -> PlatformResult<Vec<RawIssue>>;

    async fn create_issue(&self, project: Option<&str>, fields: &FieldMap)
    -> PlatformResult<RawIssue>;

    /// Returns `false` if the platform accepted the call but applied nothing.
    async fn update_issue(&self, id: &str, fields: &FieldMap) -> PlatformResult<bool>;
}
