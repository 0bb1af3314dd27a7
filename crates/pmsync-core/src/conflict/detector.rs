use chrono::Duration;
use serde_json::Value;

use crate::mapping::{FieldMapping, FieldTransformer};
use crate::model::SyncItem;

/// Description recorded when both sides changed at effectively the same time
pub const CONCURRENT_MODIFICATION: &str = "Concurrent modification";

/// Decides whether two snapshots of the same logical item disagree.
///
/// Detection never mutates either item.
#[derive(Debug, Clone)]
pub struct ConflictDetector {
    window: Duration,
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self::new(Duration::seconds(crate::config::DEFAULT_CONFLICT_WINDOW_SECS as i64))
    }
}

impl ConflictDetector {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Return one description per detected conflict; empty means none.
    ///
    /// Rules, in order:
    /// 1. timestamps closer together than the window → concurrent modification;
    ///    the gap is absolute, so it does not matter which side is newer
    /// 2. per mapping, the transformed source value differs from the target
    ///    field (only when the target carries the field)
    pub fn detect(
        &self,
        source: &SyncItem,
        target: &SyncItem,
        mappings: &[FieldMapping],
        transformer: &FieldTransformer,
    ) -> Vec<String> {
        let mut conflicts = Vec::new();

        let skew_ms = (source.last_modified - target.last_modified)
            .num_milliseconds()
            .abs();
        if skew_ms < self.window.num_milliseconds() {
            conflicts.push(CONCURRENT_MODIFICATION.to_string());
        }

        for mapping in mappings {
            let Some(target_value) = target.field(mapping.target_field()) else {
                continue;
            };

            match transformer.transform(source.field(mapping.source_field()), mapping) {
                Ok(Some(source_value)) => {
                    if !values_match(&source_value, target_value) {
                        conflicts.push(format!(
                            "Field '{}' differs: source {} vs target {}",
                            mapping.target_field(),
                            source_value,
                            target_value
                        ));
                    }
                }
                Ok(None) => {}
                Err(e) => conflicts.push(format!(
                    "Field '{}' cannot be compared: {}",
                    mapping.target_field(),
                    e
                )),
            }
        }

        conflicts
    }
}

/// Equality that treats `1` and `1.0` as the same number.
pub(crate) fn values_match(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}
