//! Filesystem primitives for pmsync
//!
//! Provides canonical content checksums, atomic and append-only file I/O,
//! and format-agnostic configuration loading used by the sync core.

pub mod checksum;
pub mod config;
pub mod error;
pub mod io;
pub mod ident;

pub use checksum::{canonical_json, compute_content_checksum, compute_value_checksum};
pub use config::{ConfigFormat, ConfigStore};
pub use error::{Error, Result};
pub use ident::validate_identifier;
