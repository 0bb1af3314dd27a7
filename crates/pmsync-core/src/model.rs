//! Platform identifiers and normalized item snapshots

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::platform::RawIssue;
use crate::tracker::ChangeTracker;

/// Raw field name → value mapping as reported by a platform
pub type FieldMap = Map<String, Value>;

/// Project-management platforms pmsync can talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Jira,
    Linear,
    Github,
    Gitlab,
    Asana,
    /// JSON snapshot on local disk
    Local,
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Platform::Jira,
        Platform::Linear,
        Platform::Github,
        Platform::Gitlab,
        Platform::Asana,
        Platform::Local,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jira => "jira",
            Self::Linear => "linear",
            Self::Github => "github",
            Self::Gitlab => "gitlab",
            Self::Asana => "asana",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| crate::Error::UnknownPlatform {
                name: s.to_string(),
            })
    }
}

/// A normalized snapshot of one platform issue at a point in time.
///
/// Items are created fresh on every poll and never mutated; the next poll's
/// item with the same `id` supersedes this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncItem {
    pub id: String,
    pub platform: Platform,
    pub data: FieldMap,
    pub last_modified: DateTime<Utc>,
    pub checksum: String,
}

impl SyncItem {
    pub fn new(
        id: impl Into<String>,
        platform: Platform,
        data: FieldMap,
        last_modified: DateTime<Utc>,
    ) -> Self {
        let checksum = ChangeTracker::calculate_checksum(&data);
        Self {
            id: id.into(),
            platform,
            data,
            last_modified,
            checksum,
        }
    }

    /// Normalize a platform client's raw issue.
    ///
    /// A missing update timestamp is treated as the Unix epoch so that any
    /// timestamped counterpart compares as newer.
    pub fn from_raw(platform: Platform, raw: RawIssue) -> Self {
        let last_modified = raw.updated_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        Self::new(raw.id, platform, raw.fields, last_modified)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name).filter(|v| !v.is_null())
    }
}
