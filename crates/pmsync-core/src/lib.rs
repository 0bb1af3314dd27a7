//! Cross-platform issue synchronization engine
//!
//! This crate keeps issues on two project-management platforms in step:
//!
//! - **Field mapping**: typed conversion of source fields into target fields
//! - **Change tracking**: content checksums so unchanged items are skipped
//! - **Conflict handling**: detection of divergent edits and strategy-driven
//!   resolution
//! - **Audit trail**: one append-only JSON line per outcome, per day
//! - **SyncEngine**: batched orchestration over injected platform clients
//!
//! # Architecture
//!
//! ```text
//!                      pmsync-cli
//!                          |
//!                     pmsync-core
//!     +--------+--------+--+------+----------+---------+
//!     |        |        |         |          |         |
//!  mapping  tracker  conflict   audit    platform   engine
//!                          |
//!                      pmsync-fs
//! ```
//!
//! # Example
//!
//! ```ignore
//! use pmsync_core::{EnginePaths, InMemoryClient, Platform, SyncEngine};
//!
//! async fn run(config: pmsync_core::SyncConfiguration) -> pmsync_core::Result<()> {
//!     let source = InMemoryClient::new(Platform::Jira);
//!     let target = InMemoryClient::new(Platform::Github);
//!     let mut engine = SyncEngine::new(config, EnginePaths::under(".pmsync".as_ref()));
//!     let summary = engine.sync_project(&source, &target, None).await?;
//!     println!("created {}", summary.created);
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod config;
pub mod conflict;
pub mod engine;
pub mod error;
pub mod mapping;
pub mod model;
pub mod platform;
pub mod report;
pub mod tracker;

pub use audit::{AuditEntry, SyncAuditor};
pub use config::{ConflictStrategy, SyncConfiguration, SyncConfigurationSpec, SyncDirection};
pub use conflict::{
    CONCURRENT_MODIFICATION, ConflictDetector, ConflictResolver, CustomResolverFn, Resolution,
    Winner,
};
pub use engine::{EnginePaths, RetryPolicy, SyncEngine};
pub use error::{Error, Result};
pub use mapping::{FieldMapping, FieldMappingSpec, FieldTransformer, FieldType, TransformError, TransformFn};
pub use model::{FieldMap, Platform, SyncItem};
pub use platform::{
    InMemoryClient, IssueQuery, JsonFileClient, PlatformClient, PlatformError, PlatformResult,
    RawIssue, WriteOp,
};
pub use report::{FieldChange, SyncAction, SyncResult, SyncState, SyncStatus, SyncSummary};
pub use tracker::ChangeTracker;
