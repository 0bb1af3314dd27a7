//! Append-only audit trail of sync outcomes
//!
//! Every [`SyncResult`] is written as one JSON line to a per-day file,
//! `sync-YYYY-MM-DD.jsonl` (UTC date). Files are only ever appended to.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Days, NaiveDate, Utc};
use pmsync_fs::io::{append_line, read_text};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::report::SyncResult;

/// One line of the audit log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the entry was written; selects the day file
    pub logged_at: DateTime<Utc>,
    #[serde(flatten)]
    pub result: SyncResult,
}

impl AuditEntry {
    pub fn new(result: SyncResult) -> Self {
        Self {
            logged_at: Utc::now(),
            result,
        }
    }

    pub fn item_id(&self) -> &str {
        &self.result.item_id
    }
}

/// Writes and replays the per-day audit files under one directory
#[derive(Debug, Clone)]
pub struct SyncAuditor {
    audit_dir: PathBuf,
}

impl SyncAuditor {
    pub fn new(audit_dir: impl Into<PathBuf>) -> Self {
        Self {
            audit_dir: audit_dir.into(),
        }
    }

    pub fn audit_dir(&self) -> &Path {
        &self.audit_dir
    }

    /// Path of the audit file for `date`.
    pub fn day_file(&self, date: NaiveDate) -> PathBuf {
        self.audit_dir
            .join(format!("sync-{}.jsonl", date.format("%Y-%m-%d")))
    }

    /// Append `result` to today's file.
    pub fn log_sync(&self, result: &SyncResult) -> Result<()> {
        self.record(&AuditEntry::new(result.clone()))
    }

    /// Append a pre-stamped entry to the file of its own day.
    pub fn record(&self, entry: &AuditEntry) -> Result<()> {
        let path = self.day_file(entry.logged_at.date_naive());
        let line = serde_json::to_string(entry)?;
        append_line(&path, &line)?;
        tracing::trace!(item = %entry.item_id(), ?path, "Audit entry written");
        Ok(())
    }

    /// Entries for `item_id` from the trailing `days` day files, oldest
    /// first. Today counts as one day; `0` is treated as `1`.
    ///
    /// Lines that fail to parse are skipped with a warning.
    pub fn get_sync_history(&self, item_id: &str, days: u32) -> Result<Vec<AuditEntry>> {
        self.history_until(item_id, days, Utc::now().date_naive())
    }

    fn history_until(&self, item_id: &str, days: u32, today: NaiveDate) -> Result<Vec<AuditEntry>> {
        let earliest = today
            .checked_sub_days(Days::new(u64::from(days.max(1) - 1)))
            .unwrap_or(NaiveDate::MIN);
        let mut entries = Vec::new();

        for (_, path) in self.day_files_between(earliest, today)? {
            let content = read_text(&path)?;
            for (lineno, line) in content.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<AuditEntry>(line) {
                    Ok(entry) if entry.item_id() == item_id => entries.push(entry),
                    Ok(_) => {}
                    Err(e) => tracing::warn!(
                        ?path,
                        line = lineno + 1,
                        error = %e,
                        "Skipping malformed audit line"
                    ),
                }
            }
        }

        Ok(entries)
    }

    /// Existing day files dated within `[from, to]`, oldest first.
    fn day_files_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<(NaiveDate, PathBuf)>> {
        let dir = match std::fs::read_dir(&self.audit_dir) {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(pmsync_fs::Error::io(&self.audit_dir, e).into()),
        };

        let mut files = Vec::new();
        for entry in dir {
            let path = entry.map_err(|e| pmsync_fs::Error::io(&self.audit_dir, e))?.path();
            let Some(date) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(day_of_file)
            else {
                continue;
            };
            if (from..=to).contains(&date) {
                files.push((date, path));
            }
        }
        files.sort();
        Ok(files)
    }
}

fn day_of_file(name: &str) -> Option<NaiveDate> {
    let stamp = name.strip_prefix("sync-")?.strip_suffix(".jsonl")?;
    NaiveDate::parse_from_str(stamp, "%Y-%m-%d").ok()
}
