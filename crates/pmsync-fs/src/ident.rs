//! Validation for names that become file-system path components

use std::sync::LazyLock;

use regex::Regex;

use crate::{Error, Result};

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("valid regex"));

const MAX_LEN: usize = 128;

/// Validate that `value` is safe to use as a single file name component.
///
/// Accepts ASCII letters, digits, `.`, `_` and `-`, starting with a letter
/// or digit. Rejects empty names, path separators and `..`.
pub fn validate_identifier(value: &str, kind: &str) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidIdentifier {
        kind: kind.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    };

    if value.trim().is_empty() {
        return Err(invalid("must not be empty"));
    }
    if value.len() > MAX_LEN {
        return Err(invalid("is too long"));
    }
    if value.contains("..") {
        return Err(invalid("must not contain '..'"));
    }
    if !IDENTIFIER.is_match(value) {
        return Err(invalid(
            "may only contain letters, digits, '.', '_' and '-'",
        ));
    }
    Ok(())
}
