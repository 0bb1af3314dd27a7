//! Error types for pmsync-core

use crate::mapping::TransformError;
use crate::model::Platform;
use crate::platform::PlatformError;

/// Result type for pmsync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in pmsync-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configuration failed validation; nothing was synchronized
    #[error("Invalid configuration: {}", .errors.join("; "))]
    InvalidConfiguration { errors: Vec<String> },

    /// A field mapping was declared with a blank field name
    #[error("Invalid field mapping: {message}")]
    InvalidFieldMapping { message: String },

    /// A numeric setting is outside its accepted range
    #[error("{setting} must be between {min} and {max}, got {value}")]
    OutOfRange {
        setting: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    /// A setting could not be parsed
    #[error("Invalid {setting}: {message}")]
    InvalidSetting {
        setting: &'static str,
        message: String,
    },

    #[error("Unknown platform: {name}")]
    UnknownPlatform { name: String },

    /// A client was supplied for a different platform than configured
    #[error("Expected a {expected} client, got {actual}")]
    PlatformMismatch { expected: Platform, actual: Platform },

    /// The MANUAL strategy refuses to pick a winner
    #[error("Manual resolution required for {item_id}: {}", .conflicts.join("; "))]
    ManualResolutionRequired {
        item_id: String,
        conflicts: Vec<String>,
    },

    /// The CUSTOM strategy was selected without registering a resolver
    #[error("Conflict strategy is 'custom' but no custom resolver is registered")]
    CustomResolverMissing,

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// Filesystem error from pmsync-fs
    #[error(transparent)]
    Fs(#[from] pmsync_fs::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
