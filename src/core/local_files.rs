//! Filesystem seam. Rules never touch disk: the collection reads through
//! `FileSystem::read`/`list` and write-back goes through `write`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// One directory entry.
#[derive(Debug, Clone)]
pub struct Entry {
    pub path: PathBuf,
    pub is_dir: bool,
}

impl Entry {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|e| e.to_str())
    }
}

pub trait FileSystem {
    fn read(&self, path: &Path) -> Result<String>;
    /// Replace `path` with `content` in one step.
    fn write(&self, path: &Path, content: &str) -> Result<()>;
    /// Entries of `dir` sorted by path; empty when `dir` does not exist.
    fn list(&self, dir: &Path) -> Result<Vec<Entry>>;
    fn ensure_dir(&self, dir: &Path) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        Self
    }
}

fn io_error(err: io::Error, action: &str, path: &Path) -> Error {
    let message = match err.kind() {
        io::ErrorKind::NotFound => format!("File not found: {}", path.display()),
        _ => err.to_string(),
    };
    Error::internal_io(message, Some(format!("{} {}", action, path.display())))
}

impl FileSystem for LocalFs {
    fn read(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| io_error(e, "read", path))
    }

    fn write(&self, path: &Path, content: &str) -> Result<()> {
        let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
            return Err(Error::internal_io(
                format!("Invalid path: {}", path.display()),
                Some("write file".to_string()),
            ));
        };

        // Sibling temp file so the rename stays on one filesystem
        let staged = parent.join(format!(".{}.upgrade-tmp", name.to_string_lossy()));
        fs::write(&staged, content).map_err(|e| io_error(e, "write", &staged))?;
        fs::rename(&staged, path).map_err(|e| io_error(e, "replace", path))
    }

    fn list(&self, dir: &Path) -> Result<Vec<Entry>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries: Vec<Entry> = fs::read_dir(dir)
            .map_err(|e| io_error(e, "list", dir))?
            .flatten()
            .map(|entry| {
                let path = entry.path();
                Entry {
                    is_dir: path.is_dir(),
                    path,
                }
            })
            .collect();

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    fn ensure_dir(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).map_err(|e| io_error(e, "create", dir))
    }
}

pub fn local() -> LocalFs {
    LocalFs::new()
}
