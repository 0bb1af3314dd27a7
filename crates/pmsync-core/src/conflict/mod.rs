//! Conflict detection and resolution between two snapshots of one issue

mod detector;
mod resolver;

pub use detector::{CONCURRENT_MODIFICATION, ConflictDetector};
pub use resolver::{ConflictResolver, CustomResolverFn, Resolution, Winner};
pub(crate) use detector::values_match;
