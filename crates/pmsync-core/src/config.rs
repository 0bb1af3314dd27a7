//! Declarative sync configuration
//!
//! A [`SyncConfiguration`] is the contract for one sync relationship between
//! a source and a target platform. Range checks run at construction and at
//! load time; structural problems that do not prevent construction (such as
//! an empty mapping list) are reported by
//! [`SyncConfiguration::validate`].

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use pmsync_fs::{ConfigStore, validate_identifier};
use serde::{Deserialize, Serialize};

use crate::mapping::FieldMapping;
use crate::model::Platform;
use crate::{Error, Result};

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const MAX_BATCH_SIZE: usize = 1000;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const MAX_RETRIES: u32 = 10;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;
pub const MAX_RETRY_BACKOFF_MS: u64 = 60_000;
pub const DEFAULT_CONFLICT_WINDOW_SECS: u64 = 5;
pub const MAX_CONFLICT_WINDOW_SECS: u64 = 3600;

/// Which way changes flow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    #[default]
    #[serde(alias = "one-way")]
    OneWay,
    Bidirectional,
}

impl FromStr for SyncDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "one_way" | "oneway" => Ok(Self::OneWay),
            "bidirectional" | "two_way" => Ok(Self::Bidirectional),
            _ => Err(Error::InvalidSetting {
                setting: "direction",
                message: format!("unknown direction '{}'", s),
            }),
        }
    }
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OneWay => "one-way",
            Self::Bidirectional => "bidirectional",
        })
    }
}

/// How a detected conflict is settled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStrategy {
    #[serde(alias = "newest")]
    LastWriteWins,
    #[default]
    #[serde(alias = "source")]
    SourceWins,
    #[serde(alias = "target")]
    TargetWins,
    Manual,
    Custom,
}

impl FromStr for ConflictStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "newest" | "last_write_wins" => Ok(Self::LastWriteWins),
            "source" | "source_wins" => Ok(Self::SourceWins),
            "target" | "target_wins" => Ok(Self::TargetWins),
            "manual" => Ok(Self::Manual),
            "custom" => Ok(Self::Custom),
            _ => Err(Error::InvalidSetting {
                setting: "conflict_strategy",
                message: format!("unknown conflict strategy '{}'", s),
            }),
        }
    }
}

impl fmt::Display for ConflictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LastWriteWins => "last_write_wins",
            Self::SourceWins => "source_wins",
            Self::TargetWins => "target_wins",
            Self::Manual => "manual",
            Self::Custom => "custom",
        })
    }
}

/// The declarative contract for one sync relationship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SyncConfigurationSpec", into = "SyncConfigurationSpec")]
pub struct SyncConfiguration {
    name: String,
    source_platform: Platform,
    target_platform: Platform,
    direction: SyncDirection,
    conflict_strategy: ConflictStrategy,
    field_mappings: Vec<FieldMapping>,
    batch_size: usize,
    max_retries: u32,
    enable_retry: bool,
    retry_backoff_ms: u64,
    conflict_window_secs: u64,
}

impl SyncConfiguration {
    /// Create a configuration with default tuning.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is not a safe identifier.
    pub fn new(
        name: impl Into<String>,
        source_platform: Platform,
        target_platform: Platform,
        field_mappings: Vec<FieldMapping>,
    ) -> Result<Self> {
        let name = name.into();
        validate_identifier(&name, "Configuration name")?;
        Ok(Self {
            name,
            source_platform,
            target_platform,
            direction: SyncDirection::default(),
            conflict_strategy: ConflictStrategy::default(),
            field_mappings,
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            enable_retry: true,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            conflict_window_secs: DEFAULT_CONFLICT_WINDOW_SECS,
        })
    }

    pub fn with_direction(mut self, direction: SyncDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_conflict_strategy(mut self, strategy: ConflictStrategy) -> Self {
        self.conflict_strategy = strategy;
        self
    }

    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] unless `1 <= batch_size <= 1000`.
    pub fn with_batch_size(mut self, batch_size: usize) -> Result<Self> {
        check_range("batch_size", batch_size as u64, 1, MAX_BATCH_SIZE as u64)?;
        self.batch_size = batch_size;
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] unless `max_retries <= 10`.
    pub fn with_max_retries(mut self, max_retries: u32) -> Result<Self> {
        check_range("max_retries", u64::from(max_retries), 0, u64::from(MAX_RETRIES))?;
        self.max_retries = max_retries;
        Ok(self)
    }

    pub fn with_retry_enabled(mut self, enabled: bool) -> Self {
        self.enable_retry = enabled;
        self
    }

    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] unless `1 <= ms <= 60000`.
    pub fn with_retry_backoff_ms(mut self, ms: u64) -> Result<Self> {
        check_range("retry_backoff_ms", ms, 1, MAX_RETRY_BACKOFF_MS)?;
        self.retry_backoff_ms = ms;
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] unless `secs <= 3600`.
    pub fn with_conflict_window_secs(mut self, secs: u64) -> Result<Self> {
        check_range("conflict_window_secs", secs, 0, MAX_CONFLICT_WINDOW_SECS)?;
        self.conflict_window_secs = secs;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_platform(&self) -> Platform {
        self.source_platform
    }

    pub fn target_platform(&self) -> Platform {
        self.target_platform
    }

    pub fn direction(&self) -> SyncDirection {
        self.direction
    }

    pub fn conflict_strategy(&self) -> ConflictStrategy {
        self.conflict_strategy
    }

    pub fn field_mappings(&self) -> &[FieldMapping] {
        &self.field_mappings
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn retry_enabled(&self) -> bool {
        self.enable_retry
    }

    pub fn retry_backoff_ms(&self) -> u64 {
        self.retry_backoff_ms
    }

    pub fn conflict_window_secs(&self) -> u64 {
        self.conflict_window_secs
    }

    pub fn is_bidirectional(&self) -> bool {
        self.direction == SyncDirection::Bidirectional
    }

    /// Structural checks that do not depend on runtime registrations.
    ///
    /// Returns human-readable problems; empty means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.field_mappings.is_empty() {
            errors.push("No field mappings configured".to_string());
        }

        let mut seen = HashSet::new();
        for mapping in &self.field_mappings {
            if !seen.insert(mapping.target_field()) {
                errors.push(format!(
                    "Target field '{}' is mapped more than once",
                    mapping.target_field()
                ));
            }
        }

        errors
    }

    /// Load a configuration file (YAML, JSON or TOML by extension).
    pub fn load(path: &Path) -> Result<Self> {
        Ok(ConfigStore::new().load(path)?)
    }

    /// Write this configuration to a file (format by extension).
    pub fn save(&self, path: &Path) -> Result<()> {
        Ok(ConfigStore::new().save(path, self)?)
    }
}

fn check_range(setting: &'static str, value: u64, min: u64, max: u64) -> Result<()> {
    if value < min || value > max {
        return Err(Error::OutOfRange {
            setting,
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// Serialized form of a [`SyncConfiguration`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfigurationSpec {
    pub name: String,
    pub source_platform: Platform,
    pub target_platform: Platform,
    #[serde(default)]
    pub direction: SyncDirection,
    #[serde(default)]
    pub conflict_strategy: ConflictStrategy,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_true")]
    pub enable_retry: bool,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_conflict_window_secs")]
    pub conflict_window_secs: u64,
    #[serde(default)]
    pub field_mappings: Vec<FieldMapping>,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_true() -> bool {
    true
}

fn default_retry_backoff_ms() -> u64 {
    DEFAULT_RETRY_BACKOFF_MS
}

fn default_conflict_window_secs() -> u64 {
    DEFAULT_CONFLICT_WINDOW_SECS
}

impl TryFrom<SyncConfigurationSpec> for SyncConfiguration {
    type Error = Error;

    fn try_from(spec: SyncConfigurationSpec) -> Result<Self> {
        SyncConfiguration::new(
            spec.name,
            spec.source_platform,
            spec.target_platform,
            spec.field_mappings,
        )?
        .with_direction(spec.direction)
        .with_conflict_strategy(spec.conflict_strategy)
        .with_retry_enabled(spec.enable_retry)
        .with_batch_size(spec.batch_size)?
        .with_max_retries(spec.max_retries)?
        .with_retry_backoff_ms(spec.retry_backoff_ms)?
        .with_conflict_window_secs(spec.conflict_window_secs)
    }
}

impl From<SyncConfiguration> for SyncConfigurationSpec {
    fn from(c: SyncConfiguration) -> Self {
        Self {
            name: c.name,
            source_platform: c.source_platform,
            target_platform: c.target_platform,
            direction: c.direction,
            conflict_strategy: c.conflict_strategy,
            batch_size: c.batch_size,
            max_retries: c.max_retries,
            enable_retry: c.enable_retry,
            retry_backoff_ms: c.retry_backoff_ms,
            conflict_window_secs: c.conflict_window_secs,
            field_mappings: c.field_mappings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mappings() -> Vec<FieldMapping> {
        vec![
            FieldMapping::new("summary", "title").unwrap(),
            FieldMapping::new("description", "body").unwrap(),
        ]
    }

    fn base() -> SyncConfiguration {
        SyncConfiguration::new("jira-to-github", Platform::Jira, Platform::Github, mappings())
            .unwrap()
    }

    #[test]
    fn defaults() {
        let c = base();
        assert_eq!(c.direction(), SyncDirection::OneWay);
        assert_eq!(c.conflict_strategy(), ConflictStrategy::SourceWins);
        assert_eq!(c.batch_size(), DEFAULT_BATCH_SIZE);
        assert_eq!(c.max_retries(), DEFAULT_MAX_RETRIES);
        assert!(c.retry_enabled());
        assert!(c.validate().is_empty());
    }

    #[test]
    fn batch_size_out_of_range_is_rejected() {
        let err = base().with_batch_size(2000).unwrap_err();
        assert!(matches!(err, Error::OutOfRange { setting: "batch_size", .. }));
        assert!(base().with_batch_size(0).is_err());
        assert_eq!(base().with_batch_size(1000).unwrap().batch_size(), 1000);
    }

    #[test]
    fn max_retries_out_of_range_is_rejected() {
        assert!(matches!(
            base().with_max_retries(20).unwrap_err(),
            Error::OutOfRange { setting: "max_retries", .. }
        ));
        assert_eq!(base().with_max_retries(5).unwrap().max_retries(), 5);
    }

    #[test]
    fn empty_mappings_construct_but_fail_validation() {
        let c = SyncConfiguration::new("empty", Platform::Jira, Platform::Linear, vec![]).unwrap();
        let errors = c.validate();
        assert_eq!(errors, vec!["No field mappings configured".to_string()]);
    }

    #[test]
    fn duplicate_target_fields_fail_validation() {
        let c = SyncConfiguration::new(
            "dup",
            Platform::Jira,
            Platform::Linear,
            vec![
                FieldMapping::new("summary", "title").unwrap(),
                FieldMapping::new("name", "title").unwrap(),
            ],
        )
        .unwrap();
        assert_eq!(c.validate().len(), 1);
        assert!(c.validate()[0].contains("'title'"));
    }

    #[test]
    fn unsafe_name_is_rejected() {
        assert!(SyncConfiguration::new("../x", Platform::Jira, Platform::Github, mappings()).is_err());
    }

    #[test]
    fn cli_aliases_parse() {
        assert_eq!("newest".parse::<ConflictStrategy>().unwrap(), ConflictStrategy::LastWriteWins);
        assert_eq!("source".parse::<ConflictStrategy>().unwrap(), ConflictStrategy::SourceWins);
        assert_eq!("target".parse::<ConflictStrategy>().unwrap(), ConflictStrategy::TargetWins);
        assert_eq!("manual".parse::<ConflictStrategy>().unwrap(), ConflictStrategy::Manual);
        assert_eq!("one-way".parse::<SyncDirection>().unwrap(), SyncDirection::OneWay);
        assert_eq!(
            "bidirectional".parse::<SyncDirection>().unwrap(),
            SyncDirection::Bidirectional
        );
        assert!("sideways".parse::<SyncDirection>().is_err());
    }

    #[test]
    fn yaml_load_applies_defaults_and_aliases() {
        let yaml = r#"
name: jira-to-github
source_platform: jira
target_platform: github
direction: one-way
conflict_strategy: newest
batch_size: 50
field_mappings:
  - source_field: summary
    target_field: title
    source_type: string
    target_type: string
"#;
        let c: SyncConfiguration = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(c.name(), "jira-to-github");
        assert_eq!(c.batch_size(), 50);
        assert_eq!(c.conflict_strategy(), ConflictStrategy::LastWriteWins);
        assert_eq!(c.field_mappings().len(), 1);
        assert_eq!(c.max_retries(), DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn yaml_load_rejects_out_of_range_batch() {
        let yaml = "name: x\nsource_platform: jira\ntarget_platform: github\nbatch_size: 2000\n";
        let result: std::result::Result<SyncConfiguration, _> = serde_yaml::from_str(yaml);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("batch_size"), "got: {err}");
    }
}
