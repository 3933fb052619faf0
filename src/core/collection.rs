//! File collections: the set of files an upgrade run reads.
//!
//! A collection hands out immutable `SourceItem` snapshots. Rules never
//! touch the filesystem; only the collection reads and only
//! `ChangeSet::apply` writes.

use std::path::{Path, PathBuf};

use glob_match::glob_match;
use serde::Serialize;

use crate::defaults::{COLLECTED_EXTENSIONS, COLLECTION_SKIP_DIRS};
use crate::error::Result;
use crate::local_files::{FileSystem, LocalFs};

/// One file as seen by the rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceItem {
    /// Path relative to the collection root, `/`-separated.
    pub path: String,
    /// Absolute (or root-joined) path on disk.
    pub full_path: String,
    pub contents: String,
}

impl SourceItem {
    pub fn new(path: impl Into<String>, full_path: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            full_path: full_path.into(),
            contents: contents.into(),
        }
    }

    /// Item whose full path is its relative path. Used for in-memory runs.
    pub fn in_memory(path: impl Into<String>, contents: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            full_path: path.clone(),
            path,
            contents: contents.into(),
        }
    }
}

/// Supplies the files for one upgrade run, in a stable order.
pub trait CodeCollection {
    fn items(&self) -> Result<Vec<SourceItem>>;
}

/// A fixed list of items, yielded in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryCollection {
    items: Vec<SourceItem>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, contents: &str) -> Self {
        self.items.push(SourceItem::in_memory(path, contents));
        self
    }

    pub fn push(&mut self, item: SourceItem) {
        self.items.push(item);
    }
}

impl CodeCollection for MemoryCollection {
    fn items(&self) -> Result<Vec<SourceItem>> {
        Ok(self.items.clone())
    }
}

/// Files under a directory on disk.
pub struct DiskCollection {
    root: PathBuf,
    excluded_paths: Vec<String>,
    fs: LocalFs,
}

impl DiskCollection {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            excluded_paths: Vec::new(),
            fs: LocalFs::new(),
        }
    }

    /// Drop any relative path matching one of these globs.
    pub fn excluding(mut self, patterns: &[String]) -> Self {
        self.excluded_paths.extend(patterns.iter().cloned());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_excluded(&self, relative: &str) -> bool {
        self.excluded_paths
            .iter()
            .any(|pattern| glob_match(pattern, relative))
    }

    fn walk(&self, dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
        for entry in self.fs.list(dir)? {
            if entry.is_dir {
                if COLLECTION_SKIP_DIRS.contains(&entry.file_name().as_str()) {
                    continue;
                }
                self.walk(&entry.path, files)?;
            } else if entry
                .extension()
                .is_some_and(|ext| COLLECTED_EXTENSIONS.contains(&ext))
            {
                files.push(entry.path);
            }
        }
        Ok(())
    }
}

impl CodeCollection for DiskCollection {
    fn items(&self) -> Result<Vec<SourceItem>> {
        let mut files = Vec::new();
        self.walk(&self.root, &mut files)?;

        let mut items = Vec::new();
        for file in files {
            let relative = relative_path(&self.root, &file);
            if self.is_excluded(&relative) {
                continue;
            }

            // Binary or unreadable files are not the rules' business
            let contents = match self.fs.read(&file) {
                Ok(contents) => contents,
                Err(e) => {
                    log_status!("upgrade", "Skipping {}: {}", relative, e.details["error"]);
                    continue;
                }
            };

            items.push(SourceItem::new(
                relative,
                file.to_string_lossy().to_string(),
                contents,
            ));
        }

        items.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(items)
    }
}

/// `/`-joined path of `file` relative to `root`.
pub fn relative_path(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn disk_collection_yields_sorted_relative_paths() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "templates/Page.ss", "<h1>$Title</h1>");
        touch(dir.path(), "_config/app.yml", "Name: app\n");
        touch(dir.path(), "lang/en.yml", "en: {}\n");

        let items = DiskCollection::new(dir.path()).items().unwrap();
        let paths: Vec<&str> = items.iter().map(|i| i.path.as_str()).collect();

        assert_eq!(paths, vec!["_config/app.yml", "lang/en.yml", "templates/Page.ss"]);
        assert_eq!(items[0].contents, "Name: app\n");
        assert!(items[0].full_path.ends_with("app.yml"));
    }

    #[test]
    fn disk_collection_skips_vendor_and_unknown_extensions() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "vendor/module/_config/config.yml", "a: b\n");
        touch(dir.path(), "node_modules/pkg/lang/src/en.json", "{}");
        touch(dir.path(), "images/logo.png", "not really a png");
        touch(dir.path(), "_config/config.yml", "a: b\n");

        let items = DiskCollection::new(dir.path()).items().unwrap();
        let paths: Vec<&str> = items.iter().map(|i| i.path.as_str()).collect();

        assert_eq!(paths, vec!["_config/config.yml"]);
    }

    #[test]
    fn disk_collection_applies_excluded_globs() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "thirdparty/lib/lang/en.yml", "en: {}\n");
        touch(dir.path(), "lang/en.yml", "en: {}\n");

        let items = DiskCollection::new(dir.path())
            .excluding(&["thirdparty/**".to_string()])
            .items()
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].path, "lang/en.yml");
    }

    #[test]
    fn memory_collection_keeps_insertion_order() {
        let collection = MemoryCollection::new()
            .with("b.ss", "b")
            .with("a.ss", "a");

        let items = collection.items().unwrap();
        assert_eq!(items[0].path, "b.ss");
        assert_eq!(items[1].full_path, "a.ss");
    }

    #[test]
    fn relative_path_uses_forward_slashes() {
        let root = Path::new("/project");
        let file = root.join("lang").join("src").join("en.json");
        assert_eq!(relative_path(root, &file), "lang/src/en.json");
    }
}
