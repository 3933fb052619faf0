//! Result of one upgrade run: new contents for changed files and the
//! warnings each file collected along the way.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::local_files::FileSystem;

/// A warning raised by a rule against a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    /// 1-indexed line, 0 when the rule could not tell.
    pub line: usize,
    pub message: String,
}

impl Warning {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Per-path contents and warnings.
///
/// A path is in `changed_contents` only when its final bytes differ from
/// the original. Warnings can exist for unchanged paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changed_contents: BTreeMap<String, String>,
    warnings: BTreeMap<String, Vec<Warning>>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_contents(&mut self, path: &str, contents: String) {
        self.changed_contents.insert(path.to_string(), contents);
    }

    pub fn add_warning(&mut self, path: &str, warning: Warning) {
        self.warnings.entry(path.to_string()).or_default().push(warning);
    }

    pub fn add_warnings(&mut self, path: &str, warnings: Vec<Warning>) {
        if warnings.is_empty() {
            return;
        }
        self.warnings
            .entry(path.to_string())
            .or_default()
            .extend(warnings);
    }

    pub fn has_new_contents(&self, path: &str) -> bool {
        self.changed_contents.contains_key(path)
    }

    pub fn new_contents(&self, path: &str) -> Option<&str> {
        self.changed_contents.get(path).map(String::as_str)
    }

    pub fn warnings(&self, path: &str) -> &[Warning] {
        self.warnings.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn changed_contents(&self) -> &BTreeMap<String, String> {
        &self.changed_contents
    }

    /// Every path with new contents or warnings, sorted.
    pub fn affected_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self
            .changed_contents
            .keys()
            .chain(self.warnings.keys())
            .map(String::as_str)
            .collect();
        paths.sort_unstable();
        paths.dedup();
        paths
    }

    pub fn is_empty(&self) -> bool {
        self.changed_contents.is_empty() && self.warnings.is_empty()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.values().map(Vec::len).sum()
    }

    /// Write every changed file under `root`. Returns the number written.
    pub fn apply(&self, root: &Path, fs: &dyn FileSystem) -> Result<usize> {
        for (path, contents) in &self.changed_contents {
            let target = root.join(path);
            if let Some(parent) = target.parent() {
                fs.ensure_dir(parent)?;
            }
            fs.write(&target, contents)?;
            log_status!("write", "Updated {}", path);
        }
        Ok(self.changed_contents.len())
    }

    pub fn report(&self) -> UpgradeReport {
        let files: Vec<FileReport> = self
            .affected_paths()
            .into_iter()
            .map(|path| FileReport {
                path: path.to_string(),
                changed: self.has_new_contents(path),
                warnings: self.warnings(path).iter().map(Warning::to_string).collect(),
            })
            .collect();

        UpgradeReport {
            total_changed: self.changed_contents.len(),
            total_warnings: self.warning_count(),
            files,
        }
    }
}

/// Serializable view of a ChangeSet for the reporting layer.
#[derive(Debug, Clone, Serialize)]
pub struct UpgradeReport {
    pub files: Vec<FileReport>,
    pub total_changed: usize,
    pub total_warnings: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: String,
    pub changed: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}
