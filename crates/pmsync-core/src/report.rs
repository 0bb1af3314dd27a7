//! Per-item results and per-run aggregates

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::Platform;

/// Terminal state of one item in a sync pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Completed,
    Failed,
    Skipped,
    Conflict,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Conflict => "conflict",
        })
    }
}

/// What was (or in dry-run would have been) written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Create,
    Update,
    #[default]
    None,
}

/// One field's before and after value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    /// `None` when the field did not exist before
    pub old: Option<Value>,
    pub new: Value,
}

/// Outcome of processing one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncResult {
    pub item_id: String,
    pub status: SyncStatus,
    pub source_platform: Platform,
    pub target_platform: Platform,
    #[serde(default)]
    pub action: SyncAction,
    #[serde(default)]
    pub changes: BTreeMap<String, FieldChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
    pub timestamp: DateTime<Utc>,
}

impl SyncResult {
    fn with_status(
        item_id: impl Into<String>,
        status: SyncStatus,
        source_platform: Platform,
        target_platform: Platform,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            status,
            source_platform,
            target_platform,
            action: SyncAction::None,
            changes: BTreeMap::new(),
            error: None,
            resolution: None,
            dry_run: false,
            timestamp: Utc::now(),
        }
    }

    pub fn completed(
        item_id: impl Into<String>,
        source_platform: Platform,
        target_platform: Platform,
        action: SyncAction,
        changes: BTreeMap<String, FieldChange>,
    ) -> Self {
        Self {
            action,
            changes,
            ..Self::with_status(item_id, SyncStatus::Completed, source_platform, target_platform)
        }
    }

    pub fn skipped(
        item_id: impl Into<String>,
        source_platform: Platform,
        target_platform: Platform,
    ) -> Self {
        Self::with_status(item_id, SyncStatus::Skipped, source_platform, target_platform)
    }

    pub fn failed(
        item_id: impl Into<String>,
        source_platform: Platform,
        target_platform: Platform,
        error: impl Into<String>,
    ) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::with_status(item_id, SyncStatus::Failed, source_platform, target_platform)
        }
    }

    pub fn conflict(
        item_id: impl Into<String>,
        source_platform: Platform,
        target_platform: Platform,
        conflicts: &[String],
    ) -> Self {
        Self {
            error: Some(conflicts.join("; ")),
            ..Self::with_status(item_id, SyncStatus::Conflict, source_platform, target_platform)
        }
    }

    pub fn with_resolution(mut self, reason: impl Into<String>) -> Self {
        self.resolution = Some(reason.into());
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Running counters for an engine, updated after every batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    pub items_synced: u64,
    pub items_failed: u64,
    pub items_skipped: u64,
    pub last_sync: Option<DateTime<Utc>>,
}

impl SyncState {
    pub(crate) fn absorb(&mut self, results: &[SyncResult]) {
        for r in results {
            match r.status {
                SyncStatus::Completed => self.items_synced += 1,
                SyncStatus::Skipped => self.items_skipped += 1,
                SyncStatus::Failed | SyncStatus::Conflict => self.items_failed += 1,
            }
        }
        self.last_sync = Some(Utc::now());
    }
}

/// Aggregate of one `sync_project` run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub config_name: String,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub conflicts: usize,
    pub errors: usize,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<SyncResult>,
}

impl SyncSummary {
    pub(crate) fn start(config_name: &str, dry_run: bool) -> Self {
        let now = Utc::now();
        Self {
            config_name: config_name.to_string(),
            created: 0,
            updated: 0,
            skipped: 0,
            conflicts: 0,
            errors: 0,
            dry_run,
            started_at: now,
            finished_at: now,
            results: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, result: SyncResult) {
        match (result.status, result.action) {
            (SyncStatus::Completed, SyncAction::Create) => self.created += 1,
            (SyncStatus::Completed, _) => self.updated += 1,
            (SyncStatus::Skipped, _) => self.skipped += 1,
            (SyncStatus::Conflict, _) => self.conflicts += 1,
            (SyncStatus::Failed, _) => self.errors += 1,
        }
        self.results.push(result);
    }

    pub(crate) fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }

    /// Results for one item id, in processing order.
    pub fn results_for<'a>(&'a self, item_id: &'a str) -> impl Iterator<Item = &'a SyncResult> {
        self.results.iter().filter(move |r| r.item_id == item_id)
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// True when no item failed or stopped on a conflict.
    pub fn is_clean(&self) -> bool {
        self.errors == 0 && self.conflicts == 0
    }
}
