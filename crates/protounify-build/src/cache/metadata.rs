//! File metadata: modification times and content hashes

use crate::error::{BuildError, BuildResult};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::SystemTime;

/// Modification time of `path`, or `None` when it does not exist
pub fn modified(path: &Path) -> BuildResult<Option<SystemTime>> {
    match fs::metadata(path) {
        Ok(metadata) => metadata
            .modified()
            .map(Some)
            .map_err(|e| BuildError::io(path, e)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(BuildError::io(path, e)),
    }
}

/// An artifact is fresh when it exists and is not older than its source.
///
/// Equal timestamps count as fresh.
pub fn is_fresh_by_mtime(source: &Path, artifact: &Path) -> BuildResult<bool> {
    let Some(artifact_time) = modified(artifact)? else {
        return Ok(false);
    };
    let source_time = modified(source)?.ok_or_else(|| {
        BuildError::io(source, std::io::Error::from(ErrorKind::NotFound))
    })?;

    Ok(artifact_time >= source_time)
}

/// SHA-256 of the file's bytes, hex encoded
pub fn hash_file(path: &Path) -> BuildResult<String> {
    let content = fs::read(path).map_err(|e| BuildError::io(path, e))?;
    Ok(hash_bytes(&content))
}

pub fn hash_bytes(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}
