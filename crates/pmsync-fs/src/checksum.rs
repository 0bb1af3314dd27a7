//! SHA-256 checksum utilities
//!
//! Provides a single canonical checksum format (`sha256:<hex>`) used for
//! change detection. Structured values are hashed through a canonical JSON
//! rendering so that object key order never affects the result.

use std::collections::BTreeMap;

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Prefix for all checksums produced by this module
const PREFIX: &str = "sha256:";

/// Compute the SHA-256 checksum of string content.
///
/// Returns a string in the canonical format `"sha256:<hex>"`.
pub fn compute_content_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{}{:x}", PREFIX, hasher.finalize())
}

/// Compute the checksum of a JSON value, independent of object key order.
pub fn compute_value_checksum(value: &Value) -> String {
    compute_content_checksum(&canonical_json(value))
}

/// Render a JSON value with object keys sorted at every nesting level.
pub fn canonical_json(value: &Value) -> String {
    sort_keys(value).to_string()
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> =
                map.iter().map(|(k, v)| (k, sort_keys(v))).collect();
            // Map may preserve insertion order, so insert sorted.
            let mut out = serde_json::Map::new();
            for (k, v) in sorted {
                out.insert(k.clone(), v);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn content_checksum_has_prefix() {
        let checksum = compute_content_checksum("hello world");
        assert!(checksum.starts_with("sha256:"));
    }

    #[test]
    fn content_checksum_known_value() {
        let checksum = compute_content_checksum("hello world");
        assert_eq!(
            checksum,
            "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn value_checksum_ignores_key_order() {
        let a = json!({"a": 1, "b": 2});
        let b = json!({"b": 2, "a": 1});
        assert_eq!(compute_value_checksum(&a), compute_value_checksum(&b));
    }

    #[test]
    fn value_checksum_ignores_nested_key_order() {
        let a = json!({"outer": {"x": [1, {"p": 1, "q": 2}], "y": null}});
        let b = json!({"outer": {"y": null, "x": [1, {"q": 2, "p": 1}]}});
        assert_eq!(compute_value_checksum(&a), compute_value_checksum(&b));
    }

    #[test]
    fn value_checksum_respects_array_order() {
        let a = json!({"labels": ["bug", "ui"]});
        let b = json!({"labels": ["ui", "bug"]});
        assert_ne!(compute_value_checksum(&a), compute_value_checksum(&b));
    }

    #[test]
    fn canonical_json_sorts_keys() {
        let value = json!({"b": 1, "a": {"d": 2, "c": 3}});
        assert_eq!(canonical_json(&value), r#"{"a":{"c":3,"d":2},"b":1}"#);
    }
}
