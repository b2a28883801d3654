//! Recursive suffix-matching file discovery

use crate::error::BuildResult;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Walks a tree for files whose name ends with a suffix.
///
/// Directories whose base name is in `exclude_dirs` are pruned with
/// everything beneath them. The walk root itself is never pruned.
#[derive(Debug, Clone)]
pub struct FileFinder {
    suffix: String,
    exclude_dirs: Vec<String>,
}

impl FileFinder {
    /// Create a finder for the given suffix with no exclusions
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
            exclude_dirs: Vec::new(),
        }
    }

    /// Set excluded directory names
    pub fn with_exclusions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_dirs = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Lazily walk `root` depth-first, in file-name order.
    ///
    /// Each call starts a fresh walk, so the result reflects the tree at the
    /// time of iteration.
    pub fn find<'a>(
        &'a self,
        root: &Path,
    ) -> impl Iterator<Item = BuildResult<PathBuf>> + 'a {
        WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| entry.depth() == 0 || !self.is_excluded(entry))
            .filter_map(move |entry| match entry {
                Ok(entry) if self.matches(&entry) => Some(Ok(entry.into_path())),
                Ok(_) => None,
                Err(e) => Some(Err(e.into())),
            })
    }

    /// Collect every match under `root`
    pub fn find_all(&self, root: &Path) -> BuildResult<Vec<PathBuf>> {
        self.find(root).collect()
    }

    fn is_excluded(&self, entry: &DirEntry) -> bool {
        entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.exclude_dirs.iter().any(|ex| ex == name))
    }

    fn matches(&self, entry: &DirEntry) -> bool {
        entry.file_type().is_file()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(&self.suffix))
    }
}
