//! [`TestWorkspace`] builder for pmsync test scenarios.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::TempDir;

/// A temporary directory laid out the way the `pmsync` CLI expects:
///
/// ```text
/// <root>/
///   sync.yaml            (written by write_config)
///   .pmsync/data/<platform>.json
///   .pmsync/state/
///   .pmsync/audit/
/// ```
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorkspace {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root().join(".pmsync").join("data")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root().join(".pmsync").join("state")
    }

    pub fn audit_dir(&self) -> PathBuf {
        self.root().join(".pmsync").join("audit")
    }

    /// Write `yaml` to `<root>/<file_name>` and return its path.
    pub fn write_config(&self, file_name: &str, yaml: &str) -> PathBuf {
        let path = self.root().join(file_name);
        fs::write(&path, yaml).unwrap();
        path
    }

    /// Store `issues` (a list of raw issue JSON values) for `platform`.
    pub fn write_issues(&self, platform: &str, issues: Vec<Value>) {
        let dir = self.data_dir();
        fs::create_dir_all(&dir).unwrap();
        let content = serde_json::to_string_pretty(&Value::Array(issues)).unwrap();
        fs::write(dir.join(format!("{platform}.json")), content).unwrap();
    }

    /// Stored issues for `platform`; empty if none were written.
    pub fn read_issues(&self, platform: &str) -> Vec<Value> {
        let path = self.data_dir().join(format!("{platform}.json"));
        match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)
                .unwrap_or_else(|e| panic!("Invalid issue file {}: {e}", path.display())),
            Err(_) => Vec::new(),
        }
    }

    /// Every audit line across all day files, parsed.
    pub fn audit_entries(&self) -> Vec<Value> {
        let Ok(dir) = fs::read_dir(self.audit_dir()) else {
            return Vec::new();
        };
        let mut files: Vec<PathBuf> = dir.filter_map(|e| e.ok().map(|e| e.path())).collect();
        files.sort();
        files
            .iter()
            .flat_map(|f| {
                fs::read_to_string(f)
                    .unwrap()
                    .lines()
                    .filter(|l| !l.trim().is_empty())
                    .map(|l| serde_json::from_str(l).unwrap())
                    .collect::<Vec<Value>>()
            })
            .collect()
    }

    /// Assert that `path` (relative to the root) exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_file_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            full_path.exists(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }

    /// Assert that `path` (relative to the root) does **not** exist.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_file_not_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            !full_path.exists(),
            "Expected file NOT to exist: {}",
            full_path.display()
        );
    }
}
