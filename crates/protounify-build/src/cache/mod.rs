//! Persisted build state for content-hash freshness
//!
//! Timestamps alone cannot tell a half-written artifact from a good one. The
//! build state records, per rewritten source, the hashes of the source and of
//! the artifact the compiler produced from it. A record that no longer matches
//! the disk forces a rebuild even when mtimes claim the artifact is fresh.

pub mod metadata;

use crate::error::{BuildError, BuildResult};
use crate::output::write_if_changed;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub use metadata::{hash_bytes, hash_file, is_fresh_by_mtime, modified};

const STATE_SCHEMA: u32 = 1;

/// Hashes recorded after a successful compile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    pub source_hash: String,
    pub artifact_hash: String,
}

/// Why a source is (or is not) recompiled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Artifact is up to date
    Fresh,
    /// Artifact does not exist
    MissingArtifact,
    /// Artifact is older than the source
    OutOfDate,
    /// Recorded hashes no longer match the files on disk
    HashMismatch,
}

impl Freshness {
    pub fn is_fresh(self) -> bool {
        matches!(self, Self::Fresh)
    }
}

impl std::fmt::Display for Freshness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fresh => write!(f, "fresh"),
            Self::MissingArtifact => write!(f, "artifact missing"),
            Self::OutOfDate => write!(f, "source newer than artifact"),
            Self::HashMismatch => write!(f, "content changed"),
        }
    }
}

/// Build-state record keyed by source path relative to the unified tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildState {
    schema: u32,
    #[serde(default)]
    entries: BTreeMap<String, StateEntry>,
}

impl Default for BuildState {
    fn default() -> Self {
        Self {
            schema: STATE_SCHEMA,
            entries: BTreeMap::new(),
        }
    }
}

impl BuildState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a state record. A missing file or an unknown schema yields an
    /// empty state.
    pub fn load(path: &Path) -> BuildResult<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(BuildError::io(path, e)),
        };

        let state: Self = serde_json::from_str(&content).map_err(|e| BuildError::StateError {
            path: path.to_path_buf(),
            error: e,
        })?;

        if state.schema != STATE_SCHEMA {
            tracing::debug!(
                "ignoring build state {} with schema {}",
                path.display(),
                state.schema
            );
            return Ok(Self::new());
        }

        Ok(state)
    }

    pub fn save(&self, path: &Path) -> BuildResult<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| BuildError::StateError {
            path: path.to_path_buf(),
            error: e,
        })?;
        write_if_changed(path, json.as_bytes())?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&StateEntry> {
        self.entries.get(key)
    }

    pub fn record(&mut self, key: impl Into<String>, entry: StateEntry) {
        self.entries.insert(key.into(), entry);
    }

    /// Drop entries whose key is not in `live`
    pub fn retain_keys(&mut self, live: &BTreeSet<String>) {
        self.entries.retain(|key, _| live.contains(key));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decides whether a source needs recompiling
#[derive(Debug, Clone)]
pub struct FreshnessCheck {
    use_hashes: bool,
}

impl FreshnessCheck {
    /// Pure mtime comparison
    pub fn mtime_only() -> Self {
        Self { use_hashes: false }
    }

    /// Mtime comparison, overridden by recorded hashes when present
    pub fn with_content_hashes() -> Self {
        Self { use_hashes: true }
    }

    pub fn uses_hashes(&self) -> bool {
        self.use_hashes
    }

    /// Classify `artifact` built from `source`.
    ///
    /// Without a state entry the artifact is fresh iff it exists and its
    /// mtime is not earlier than the source's. With an entry both recorded
    /// hashes must still match.
    pub fn check(
        &self,
        source: &Path,
        artifact: &Path,
        entry: Option<&StateEntry>,
    ) -> BuildResult<Freshness> {
        if modified(artifact)?.is_none() {
            return Ok(Freshness::MissingArtifact);
        }

        if let Some(entry) = entry.filter(|_| self.use_hashes) {
            let matches = hash_file(source)? == entry.source_hash
                && hash_file(artifact)? == entry.artifact_hash;
            return Ok(if matches {
                Freshness::Fresh
            } else {
                Freshness::HashMismatch
            });
        }

        if is_fresh_by_mtime(source, artifact)? {
            Ok(Freshness::Fresh)
        } else {
            Ok(Freshness::OutOfDate)
        }
    }

    /// Snapshot the hashes of a freshly compiled pair
    pub fn entry_for(source: &Path, artifact: &Path) -> BuildResult<StateEntry> {
        Ok(StateEntry {
            source_hash: hash_file(source)?,
            artifact_hash: hash_file(artifact)?,
        })
    }
}

/// Key used for a source in the build state
pub fn state_key(unified_tree: &Path, source: &Path) -> String {
    source
        .strip_prefix(unified_tree)
        .map(PathBuf::from)
        .unwrap_or_else(|_| source.to_path_buf())
        .to_string_lossy()
        .replace('\\', "/")
}
