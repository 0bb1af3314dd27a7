//! Sync orchestration
//!
//! [`SyncEngine`] drives one end-to-end pass for a [`SyncConfiguration`]:
//! it pages through source items, matches each to its target counterpart,
//! consults the [`ChangeTracker`] and the conflict components, writes through
//! to the platform clients and records every outcome with the
//! [`SyncAuditor`].

mod retry;

pub use retry::RetryPolicy;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::Duration;

use crate::audit::SyncAuditor;
use crate::config::{ConflictStrategy, SyncConfiguration};
use crate::conflict::{ConflictDetector, ConflictResolver, Winner};
use crate::mapping::{FieldTransformer, TransformError};
use crate::model::{FieldMap, Platform, SyncItem};
use crate::platform::{IssueQuery, PlatformClient, RawIssue};
use crate::report::{FieldChange, SyncAction, SyncResult, SyncState, SyncStatus, SyncSummary};
use crate::tracker::ChangeTracker;
use crate::{Error, Result};
use retry::with_retry;

/// Where an engine keeps its tracker state and audit trail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnginePaths {
    pub state_dir: PathBuf,
    pub audit_dir: PathBuf,
}

impl EnginePaths {
    pub fn new(state_dir: impl Into<PathBuf>, audit_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
            audit_dir: audit_dir.into(),
        }
    }

    /// `<root>/state` and `<root>/audit`.
    pub fn under(root: &Path) -> Self {
        Self::new(root.join("state"), root.join("audit"))
    }
}

/// The two clients and the project filter for one run
#[derive(Clone, Copy)]
struct Endpoints<'a> {
    source: &'a dyn PlatformClient,
    target: &'a dyn PlatformClient,
    project: Option<&'a str>,
}

/// Orchestrates synchronization for one configuration
#[derive(Debug)]
pub struct SyncEngine {
    config: SyncConfiguration,
    transformer: FieldTransformer,
    tracker: ChangeTracker,
    detector: ConflictDetector,
    resolver: ConflictResolver,
    auditor: SyncAuditor,
    state: SyncState,
    dry_run: bool,
}

impl SyncEngine {
    /// Create an engine for `config`.
    ///
    /// # Arguments
    ///
    /// * `config` - The sync relationship to drive
    /// * `paths` - Directories owned by this engine's tracker and auditor
    pub fn new(config: SyncConfiguration, paths: EnginePaths) -> Self {
        let window = Duration::seconds(config.conflict_window_secs() as i64);
        Self {
            transformer: FieldTransformer::new(),
            tracker: ChangeTracker::new(paths.state_dir),
            detector: ConflictDetector::new(window),
            resolver: ConflictResolver::new(config.conflict_strategy()),
            auditor: SyncAuditor::new(paths.audit_dir),
            state: SyncState::default(),
            dry_run: false,
            config,
        }
    }

    /// Load a configuration file and build an engine from it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if any
    /// setting is out of range.
    pub fn from_yaml(path: &Path, paths: EnginePaths) -> Result<Self> {
        let config = SyncConfiguration::load(path)?;
        tracing::debug!(?path, name = config.name(), "Loaded sync configuration");
        Ok(Self::new(config, paths))
    }

    /// Write the configuration so that [`SyncEngine::from_yaml`] reproduces it.
    pub fn export_config(&self, path: &Path) -> Result<()> {
        self.config.save(path)
    }

    pub fn config(&self) -> &SyncConfiguration {
        &self.config
    }

    /// When enabled, no client writes, tracker updates or audit records are
    /// made; results still describe the would-be changes.
    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn transformer(&self) -> &FieldTransformer {
        &self.transformer
    }

    /// Register a named transform usable from field mappings.
    pub fn register_transformer<T>(&mut self, name: impl Into<String>, f: T)
    where
        T: Fn(&serde_json::Value) -> std::result::Result<serde_json::Value, String>
            + Send
            + Sync
            + 'static,
    {
        self.transformer.register_transformer(name, f);
    }

    /// Register the callback used by the custom conflict strategy.
    pub fn set_custom_resolver<F>(&mut self, f: F)
    where
        F: Fn(&SyncItem, &SyncItem, &[String]) -> SyncItem + Send + Sync + 'static,
    {
        self.resolver.set_custom_resolver(f);
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    pub fn auditor(&self) -> &SyncAuditor {
        &self.auditor
    }

    /// Problems that prevent a run from starting; empty means valid.
    pub fn validate_configuration(&self) -> Vec<String> {
        let mut errors = self.config.validate();

        for mapping in self.config.field_mappings() {
            if let Some(name) = mapping.transform()
                && !self.transformer.has_transformer(name)
            {
                errors.push(format!(
                    "Unknown transform '{}' on field '{}'",
                    name,
                    mapping.source_field()
                ));
            }
        }

        if self.config.conflict_strategy() == ConflictStrategy::Custom
            && !self.resolver.has_custom_resolver()
        {
            errors.push("Conflict strategy is 'custom' but no custom resolver is registered".into());
        }

        errors
    }

    /// Apply every mapping to source data, keyed by target field.
    ///
    /// Unmapped source fields are dropped. A mapping whose value and default
    /// are both absent contributes nothing.
    pub fn transform_fields(&self, source_data: &FieldMap) -> std::result::Result<FieldMap, TransformError> {
        let mut out = FieldMap::new();
        for mapping in self.config.field_mappings() {
            if let Some(value) = self
                .transformer
                .transform(source_data.get(mapping.source_field()), mapping)?
            {
                out.insert(mapping.target_field().to_string(), value);
            }
        }
        Ok(out)
    }

    /// Apply the bidirectional mappings target→source, keyed by source field.
    pub fn reverse_transform_fields(
        &self,
        target_data: &FieldMap,
    ) -> std::result::Result<FieldMap, TransformError> {
        let mut out = FieldMap::new();
        for mapping in self.config.field_mappings().iter().filter_map(|m| m.reversed()) {
            if let Some(value) = self
                .transformer
                .transform(target_data.get(mapping.source_field()), &mapping)?
            {
                out.insert(mapping.target_field().to_string(), value);
            }
        }
        Ok(out)
    }

    /// Field-by-field diff over the keys of `new`.
    ///
    /// A key is reported only when its value actually differs; numbers are
    /// compared numerically and a stored `null` counts as absent.
    pub fn compute_changes(old: &FieldMap, new: &FieldMap) -> BTreeMap<String, FieldChange> {
        new.iter()
            .filter_map(|(key, value)| {
                let before = old.get(key).filter(|v| !v.is_null());
                let same = match before {
                    Some(b) => crate::conflict::values_match(b, value),
                    None => value.is_null(),
                };
                (!same).then(|| {
                    (
                        key.clone(),
                        FieldChange {
                            old: before.cloned(),
                            new: value.clone(),
                        },
                    )
                })
            })
            .collect()
    }

    /// Run one sync pass.
    ///
    /// # Arguments
    ///
    /// * `source` - Client for the configured source platform
    /// * `target` - Client for the configured target platform
    /// * `project` - Optional project filter passed to both clients
    ///
    /// # Errors
    ///
    /// Fails before touching any item if the configuration is invalid, the
    /// custom strategy has no resolver, or a client is for the wrong
    /// platform. Listing items or persisting tracker state can also fail the
    /// run. Per-item failures never do; they are reported in the summary.
    pub async fn sync_project(
        &mut self,
        source: &dyn PlatformClient,
        target: &dyn PlatformClient,
        project: Option<&str>,
    ) -> Result<SyncSummary> {
        if self.config.conflict_strategy() == ConflictStrategy::Custom
            && !self.resolver.has_custom_resolver()
        {
            return Err(Error::CustomResolverMissing);
        }
        let errors = self.validate_configuration();
        if !errors.is_empty() {
            return Err(Error::InvalidConfiguration { errors });
        }
        check_platform(self.config.source_platform(), source)?;
        check_platform(self.config.target_platform(), target)?;

        let ends = Endpoints {
            source,
            target,
            project,
        };
        let name = self.config.name().to_string();
        let batch_size = self.config.batch_size();

        tracing::info!(
            config = %name,
            source = %self.config.source_platform(),
            target = %self.config.target_platform(),
            direction = %self.config.direction(),
            dry_run = self.dry_run,
            "Starting sync"
        );

        self.tracker.load_state(&name)?;
        let mut summary = SyncSummary::start(&name, self.dry_run);

        let target_items = self.fetch_all(target, project).await?;
        let target_index: HashMap<&str, &SyncItem> =
            target_items.iter().map(|t| (t.id.as_str(), t)).collect();
        let mut matched: HashSet<String> = HashSet::new();

        let mut start_at = 0;
        loop {
            let query = IssueQuery::new(project, start_at, batch_size);
            let page = with_retry(&self.retry_policy(), "search_issues", || {
                source.search_issues(&query)
            })
            .await?;
            let fetched = page.len();

            let mut batch = Vec::with_capacity(fetched);
            for raw in page {
                let item = SyncItem::from_raw(source.platform(), raw);
                let existing = self.match_target(&item, &target_index);
                if let Some(t) = existing {
                    matched.insert(t.id.clone());
                }

                let result = match self.sync_item(&item, existing, ends).await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!(item = %item.id, error = %e, "Item failed");
                        SyncResult::failed(
                            &item.id,
                            self.config.source_platform(),
                            self.config.target_platform(),
                            e.to_string(),
                        )
                    }
                };
                batch.push(self.record(result));
            }

            self.finish_batch(&name, batch, &mut summary)?;

            if fetched < batch_size {
                break;
            }
            start_at += fetched;
        }

        if self.config.is_bidirectional() {
            let orphans: Vec<&SyncItem> = target_items
                .iter()
                .filter(|t| !matched.contains(&t.id) && !self.tracker.is_linked_target(&t.id))
                .collect();

            for chunk in orphans.chunks(batch_size) {
                let mut batch = Vec::with_capacity(chunk.len());
                for orphan in chunk {
                    let result = match self.create_in_source(orphan, ends).await {
                        Ok(r) => r,
                        Err(e) => {
                            tracing::warn!(item = %orphan.id, error = %e, "Reverse create failed");
                            SyncResult::failed(
                                &orphan.id,
                                self.config.target_platform(),
                                self.config.source_platform(),
                                e.to_string(),
                            )
                        }
                    };
                    batch.push(self.record(result));
                }
                self.finish_batch(&name, batch, &mut summary)?;
            }
        }

        let summary = summary.finish();
        tracing::info!(
            config = %name,
            created = summary.created,
            updated = summary.updated,
            skipped = summary.skipped,
            conflicts = summary.conflicts,
            errors = summary.errors,
            "Sync finished"
        );
        Ok(summary)
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_config(&self.config)
    }

    async fn fetch_all(
        &self,
        client: &dyn PlatformClient,
        project: Option<&str>,
    ) -> Result<Vec<SyncItem>> {
        let batch_size = self.config.batch_size();
        let mut items = Vec::new();
        let mut start_at = 0;
        loop {
            let query = IssueQuery::new(project, start_at, batch_size);
            let page: Vec<RawIssue> = with_retry(&self.retry_policy(), "search_issues", || {
                client.search_issues(&query)
            })
            .await?;
            let fetched = page.len();
            items.extend(page.into_iter().map(|r| SyncItem::from_raw(client.platform(), r)));
            if fetched < batch_size {
                break;
            }
            start_at += fetched;
        }
        tracing::debug!(platform = %client.platform(), count = items.len(), "Fetched items");
        Ok(items)
    }

    /// The linked counterpart if one is recorded, else a target with the
    /// same id that is not already linked to another source item.
    fn match_target<'a>(
        &self,
        item: &SyncItem,
        index: &HashMap<&str, &'a SyncItem>,
    ) -> Option<&'a SyncItem> {
        if let Some(linked) = self.tracker.linked_target(&item.id) {
            return index.get(linked).copied();
        }
        if self.tracker.is_linked_target(&item.id) {
            tracing::debug!(item = %item.id, "Same-id target belongs to another item");
            return None;
        }
        index.get(item.id.as_str()).copied()
    }

    async fn sync_item(
        &mut self,
        item: &SyncItem,
        existing: Option<&SyncItem>,
        ends: Endpoints<'_>,
    ) -> Result<SyncResult> {
        let Some(existing) = existing else {
            tracing::debug!(item = %item.id, "New item");
            return self.create_in_target(item, ends).await;
        };

        let last_sync = self.tracker.get_last_sync_time(&item.id);
        let target_modified = last_sync.is_none_or(|t| existing.last_modified > t);

        if !self.tracker.has_changed(&item.id, &item.data) {
            if self.config.is_bidirectional() && target_modified {
                tracing::debug!(item = %item.id, "Target changed since last sync, pushing back");
                return self.update_source(item, existing, ends).await;
            }
            tracing::debug!(item = %item.id, "Unchanged");
            return Ok(SyncResult::skipped(
                &item.id,
                self.config.source_platform(),
                self.config.target_platform(),
            ));
        }

        let transformed = self.transform_fields(&item.data)?;

        if target_modified {
            let conflicts = self.detector.detect(
                item,
                existing,
                self.config.field_mappings(),
                &self.transformer,
            );
            if !conflicts.is_empty() {
                tracing::debug!(item = %item.id, ?conflicts, "Conflict detected");
                return self.settle_conflict(item, existing, transformed, &conflicts, ends).await;
            }
        }

        self.update_target(item, existing, transformed, ends).await
    }

    async fn settle_conflict(
        &mut self,
        item: &SyncItem,
        existing: &SyncItem,
        transformed: FieldMap,
        conflicts: &[String],
        ends: Endpoints<'_>,
    ) -> Result<SyncResult> {
        let resolution = match self.resolver.resolve(item, existing, conflicts) {
            Ok(r) => r,
            Err(Error::ManualResolutionRequired { conflicts, .. }) => {
                tracing::warn!(item = %item.id, "Conflict left for manual resolution");
                return Ok(SyncResult::conflict(
                    &item.id,
                    self.config.source_platform(),
                    self.config.target_platform(),
                    &conflicts,
                ));
            }
            Err(e) => return Err(e),
        };

        let result = match resolution.winner {
            Winner::Source => self.update_target(item, existing, transformed, ends).await?,
            Winner::Target if self.config.is_bidirectional() => {
                self.update_source(item, existing, ends).await?
            }
            Winner::Target => {
                // Keep the target as is and accept the source as seen.
                self.commit(&item.id, &existing.id, &item.data);
                SyncResult::skipped(
                    &item.id,
                    self.config.source_platform(),
                    self.config.target_platform(),
                )
            }
            Winner::Custom => {
                let data = if resolution.item.platform == self.config.source_platform() {
                    self.transform_fields(&resolution.item.data)?
                } else {
                    resolution.item.data.clone()
                };
                self.update_target(item, existing, data, ends).await?
            }
        };

        Ok(result.with_resolution(resolution.reason))
    }

    async fn create_in_target(&mut self, item: &SyncItem, ends: Endpoints<'_>) -> Result<SyncResult> {
        let fields = self.transform_fields(&item.data)?;
        let changes = creation_changes(&fields);

        if !self.dry_run {
            let created = with_retry(&self.retry_policy(), "create_issue", || {
                ends.target.create_issue(ends.project, &fields)
            })
            .await?;
            self.commit(&item.id, &created.id, &item.data);
            tracing::debug!(item = %item.id, target = %created.id, "Created in target");
        }

        Ok(SyncResult::completed(
            &item.id,
            self.config.source_platform(),
            self.config.target_platform(),
            SyncAction::Create,
            changes,
        ))
    }

    async fn update_target(
        &mut self,
        item: &SyncItem,
        existing: &SyncItem,
        transformed: FieldMap,
        ends: Endpoints<'_>,
    ) -> Result<SyncResult> {
        let (source_platform, target_platform) =
            (self.config.source_platform(), self.config.target_platform());
        let changes = Self::compute_changes(&existing.data, &transformed);

        if changes.is_empty() {
            self.commit(&item.id, &existing.id, &item.data);
            return Ok(SyncResult::skipped(&item.id, source_platform, target_platform));
        }

        if !self.dry_run {
            let patch = patch_from(&changes);
            let applied = with_retry(&self.retry_policy(), "update_issue", || {
                ends.target.update_issue(&existing.id, &patch)
            })
            .await?;
            if !applied {
                return Ok(SyncResult::failed(
                    &item.id,
                    source_platform,
                    target_platform,
                    format!("{} did not apply the update to {}", target_platform, existing.id),
                ));
            }
            self.commit(&item.id, &existing.id, &item.data);
        }

        Ok(SyncResult::completed(
            &item.id,
            source_platform,
            target_platform,
            SyncAction::Update,
            changes,
        ))
    }

    /// Write the target's values back to the source through the reversed
    /// mappings.
    async fn update_source(
        &mut self,
        item: &SyncItem,
        existing: &SyncItem,
        ends: Endpoints<'_>,
    ) -> Result<SyncResult> {
        let (source_platform, target_platform) =
            (self.config.source_platform(), self.config.target_platform());
        let reversed = self.reverse_transform_fields(&existing.data)?;
        let changes = Self::compute_changes(&item.data, &reversed);

        if changes.is_empty() {
            self.commit(&item.id, &existing.id, &item.data);
            return Ok(SyncResult::skipped(&item.id, target_platform, source_platform));
        }

        if !self.dry_run {
            let patch = patch_from(&changes);
            let applied = with_retry(&self.retry_policy(), "update_issue", || {
                ends.source.update_issue(&item.id, &patch)
            })
            .await?;
            if !applied {
                return Ok(SyncResult::failed(
                    &item.id,
                    target_platform,
                    source_platform,
                    format!("{} did not apply the update to {}", source_platform, item.id),
                ));
            }
            let mut merged = item.data.clone();
            merged.extend(patch);
            self.commit(&item.id, &existing.id, &merged);
        }

        Ok(SyncResult::completed(
            &item.id,
            target_platform,
            source_platform,
            SyncAction::Update,
            changes,
        ))
    }

    async fn create_in_source(&mut self, orphan: &SyncItem, ends: Endpoints<'_>) -> Result<SyncResult> {
        let fields = self.reverse_transform_fields(&orphan.data)?;
        let changes = creation_changes(&fields);

        if !self.dry_run {
            let created = with_retry(&self.retry_policy(), "create_issue", || {
                ends.source.create_issue(ends.project, &fields)
            })
            .await?;
            self.commit(&created.id, &orphan.id, &created.fields);
            tracing::debug!(item = %orphan.id, source = %created.id, "Created in source");
        }

        Ok(SyncResult::completed(
            &orphan.id,
            self.config.target_platform(),
            self.config.source_platform(),
            SyncAction::Create,
            changes,
        ))
    }

    /// Record a confirmed write-through. No-op in dry-run.
    fn commit(&mut self, source_id: &str, target_id: &str, source_data: &FieldMap) {
        if self.dry_run {
            return;
        }
        self.tracker.link(source_id, target_id);
        self.tracker.update_checksum(source_id, source_data);
    }

    fn record(&self, result: SyncResult) -> SyncResult {
        let result = result.with_dry_run(self.dry_run);
        if !self.dry_run
            && let Err(e) = self.auditor.log_sync(&result)
        {
            tracing::warn!(item = %result.item_id, error = %e, "Failed to write audit entry");
        }
        result
    }

    fn finish_batch(
        &mut self,
        name: &str,
        batch: Vec<SyncResult>,
        summary: &mut SyncSummary,
    ) -> Result<()> {
        self.state.absorb(&batch);
        if !self.dry_run {
            self.tracker.save_state(name)?;
        }

        let failed = batch
            .iter()
            .filter(|r| r.status == SyncStatus::Failed)
            .count();
        tracing::debug!(items = batch.len(), failed, "Batch done");

        for result in batch {
            summary.push(result);
        }
        Ok(())
    }
}

fn check_platform(expected: Platform, client: &dyn PlatformClient) -> Result<()> {
    let actual = client.platform();
    if actual != expected {
        return Err(Error::PlatformMismatch { expected, actual });
    }
    Ok(())
}

fn creation_changes(fields: &FieldMap) -> BTreeMap<String, FieldChange> {
    fields
        .iter()
        .map(|(k, v)| {
            (
                k.clone(),
                FieldChange {
                    old: None,
                    new: v.clone(),
                },
            )
        })
        .collect()
}

fn patch_from(changes: &BTreeMap<String, FieldChange>) -> FieldMap {
    changes
        .iter()
        .map(|(k, c)| (k.clone(), c.new.clone()))
        .collect()
}
