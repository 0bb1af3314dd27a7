//! Content-based change tracking
//!
//! The tracker remembers, per item id, the checksum of the data that was last
//! written through and when that happened. State is persisted to one JSON
//! file per configuration name so a sync can resume in a fresh process.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use pmsync_fs::{ConfigStore, compute_value_checksum, validate_identifier};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;
use crate::model::FieldMap;

const STATE_VERSION: &str = "1.0";

/// On-disk form of the tracker
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TrackerState {
    version: String,
    #[serde(default)]
    checksums: BTreeMap<String, String>,
    #[serde(default)]
    last_sync: BTreeMap<String, DateTime<Utc>>,
    /// Source item id → id of its counterpart on the target platform
    #[serde(default)]
    links: BTreeMap<String, String>,
}

/// Detects whether an item changed since it was last synchronized
#[derive(Debug, Clone)]
pub struct ChangeTracker {
    state_dir: PathBuf,
    state: TrackerState,
}

impl ChangeTracker {
    /// Create an empty tracker that persists under `state_dir`.
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
            state: TrackerState {
                version: STATE_VERSION.to_string(),
                ..TrackerState::default()
            },
        }
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Stable, key-order-independent hash of an item's data.
    pub fn calculate_checksum(data: &FieldMap) -> String {
        compute_value_checksum(&Value::Object(data.clone()))
    }

    /// True if `item_id` was never recorded or its data hashes differently.
    pub fn has_changed(&self, item_id: &str, data: &FieldMap) -> bool {
        match self.state.checksums.get(item_id) {
            Some(stored) => *stored != Self::calculate_checksum(data),
            None => true,
        }
    }

    /// Record `data` as synchronized now.
    ///
    /// Call only after the write-through was confirmed.
    pub fn update_checksum(&mut self, item_id: &str, data: &FieldMap) {
        self.state
            .checksums
            .insert(item_id.to_string(), Self::calculate_checksum(data));
        self.state.last_sync.insert(item_id.to_string(), Utc::now());
    }

    pub fn get_last_sync_time(&self, item_id: &str) -> Option<DateTime<Utc>> {
        self.state.last_sync.get(item_id).copied()
    }

    /// Remember that `source_id` corresponds to `target_id` on the other side.
    pub fn link(&mut self, source_id: &str, target_id: &str) {
        self.state
            .links
            .insert(source_id.to_string(), target_id.to_string());
    }

    pub fn linked_target(&self, source_id: &str) -> Option<&str> {
        self.state.links.get(source_id).map(String::as_str)
    }

    pub fn is_linked_target(&self, target_id: &str) -> bool {
        self.state.links.values().any(|t| t == target_id)
    }

    /// Ids with a recorded checksum, in sorted order.
    pub fn tracked_items(&self) -> Vec<&str> {
        self.state.checksums.keys().map(String::as_str).collect()
    }

    /// Drop everything known about `item_id`.
    pub fn forget(&mut self, item_id: &str) {
        self.state.checksums.remove(item_id);
        self.state.last_sync.remove(item_id);
        self.state.links.remove(item_id);
    }

    /// Path of the state file for a configuration.
    pub fn state_path(&self, config_name: &str) -> PathBuf {
        self.state_dir.join(format!("{}.json", config_name))
    }

    /// Persist the full tracker state for `config_name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not a safe identifier or the file
    /// cannot be written.
    pub fn save_state(&self, config_name: &str) -> Result<()> {
        validate_identifier(config_name, "Configuration name")?;
        let path = self.state_path(config_name);
        ConfigStore::new().save(&path, &self.state)?;
        tracing::debug!(?path, items = self.state.checksums.len(), "Saved tracker state");
        Ok(())
    }

    /// Replace in-memory state with the saved state for `config_name`.
    ///
    /// A missing state file resets the tracker to empty.
    pub fn load_state(&mut self, config_name: &str) -> Result<()> {
        validate_identifier(config_name, "Configuration name")?;
        let path = self.state_path(config_name);

        if !path.exists() {
            tracing::debug!(?path, "No tracker state yet, starting empty");
            self.state = TrackerState {
                version: STATE_VERSION.to_string(),
                ..TrackerState::default()
            };
            return Ok(());
        }

        self.state = ConfigStore::new().load(&path)?;
        tracing::debug!(?path, items = self.state.checksums.len(), "Loaded tracker state");
        Ok(())
    }
}
