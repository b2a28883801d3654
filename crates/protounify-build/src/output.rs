//! Atomic, change-aware file output
//!
//! Rewritten sources and manifests go through [`write_if_changed`] so that a
//! rerun over an unchanged tree leaves mtimes alone and an interrupted write
//! never leaves a truncated file behind.

use crate::error::{BuildError, BuildResult};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Whether a write touched the disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Unchanged,
}

impl WriteOutcome {
    pub fn was_written(self) -> bool {
        matches!(self, Self::Written)
    }
}

/// Write `contents` to `path` unless the file already holds exactly those bytes.
///
/// Parent directories are created as needed. The data is written to a
/// temporary sibling and renamed over the destination.
pub fn write_if_changed(path: &Path, contents: &[u8]) -> BuildResult<WriteOutcome> {
    match fs::read(path) {
        Ok(existing) if existing == contents => return Ok(WriteOutcome::Unchanged),
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(BuildError::io(path, e)),
    }

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| BuildError::io(parent, e))?;
    tmp.write_all(contents)
        .map_err(|e| BuildError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| BuildError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| BuildError::io(path, e.error))?;

    Ok(WriteOutcome::Written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_creates_parents_and_writes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a/b/c.txt");

        let outcome = write_if_changed(&path, b"hello").unwrap();

        assert_eq!(outcome, WriteOutcome::Written);
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");
    }

    #[test]
    fn test_identical_content_is_not_rewritten() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("same.txt");
        fs::write(&path, "hello").unwrap();
        let before = fs::metadata(&path).unwrap().modified().unwrap();

        let outcome = write_if_changed(&path, b"hello").unwrap();

        assert_eq!(outcome, WriteOutcome::Unchanged);
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), before);
    }

    #[test]
    fn test_changed_content_replaces_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("file.txt");
        fs::write(&path, "old contents that are longer").unwrap();

        assert!(write_if_changed(&path, b"new").unwrap().was_written());
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        // No temporary files left behind
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
    }
}
