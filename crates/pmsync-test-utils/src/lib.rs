//! Shared test utilities for the pmsync workspace.
//!
//! This crate provides standardised fixtures so crate test suites do not
//! each hand-roll configuration files and issue snapshots. It is a
//! dev-dependency only and deliberately knows nothing about pmsync types:
//! everything is plain YAML text, JSON values and paths.
//!
//! # Modules
//!
//! - [`fixtures`]: configuration YAML and raw issue JSON builders
//! - [`workspace`]: [`TestWorkspace`](workspace::TestWorkspace) temp
//!   directory with the pmsync data/state/audit layout

pub mod fixtures;
pub mod workspace;
