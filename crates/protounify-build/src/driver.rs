//! Incremental compiler driver
//!
//! Walks the unified tree and invokes the compiler for every source whose
//! artifact is not fresh. Builds run one at a time in discovery order; the
//! first failure aborts the run.

use crate::cache::{state_key, BuildState, Freshness, FreshnessCheck};
use crate::compiler::{artifact_path, SchemaCompiler};
use crate::error::BuildResult;
use crate::finder::FileFinder;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Outcome of a compile pass
#[derive(Debug, Clone, Default)]
pub struct CompileReport {
    /// Sources found in the unified tree
    pub total: usize,
    /// Sources handed to the compiler, in order
    pub compiled: Vec<PathBuf>,
    /// Sources skipped as fresh
    pub fresh: usize,
    /// Time spent inside the compiler
    pub compile_time: Duration,
}

/// Sequential freshness-aware compiler driver
pub struct IncrementalDriver<'a> {
    compiler: &'a dyn SchemaCompiler,
    finder: FileFinder,
    unified_tree: PathBuf,
    include_root: PathBuf,
    source_suffix: String,
    artifact_suffix: String,
    check: FreshnessCheck,
}

impl<'a> IncrementalDriver<'a> {
    /// `unified_tree` is walked for sources; `include_root` is passed to the
    /// compiler as both output root and include path.
    pub fn new(
        compiler: &'a dyn SchemaCompiler,
        finder: FileFinder,
        unified_tree: impl Into<PathBuf>,
        include_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            compiler,
            source_suffix: finder.suffix().to_string(),
            finder,
            unified_tree: unified_tree.into(),
            include_root: include_root.into(),
            artifact_suffix: "_pb2.py".to_string(),
            check: FreshnessCheck::mtime_only(),
        }
    }

    pub fn with_artifact_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.artifact_suffix = suffix.into();
        self
    }

    pub fn with_check(mut self, check: FreshnessCheck) -> Self {
        self.check = check;
        self
    }

    /// Artifact expected for a source in the unified tree
    pub fn artifact_for(&self, source: &Path) -> PathBuf {
        artifact_path(source, &self.source_suffix, &self.artifact_suffix)
    }

    /// Classify one source against the build state
    pub fn freshness(&self, source: &Path, state: &BuildState) -> BuildResult<Freshness> {
        let artifact = self.artifact_for(source);
        let key = state_key(&self.unified_tree, source);
        self.check.check(source, &artifact, state.get(&key))
    }

    /// Compile every stale source, updating `state` as builds succeed.
    ///
    /// Entries for sources no longer present are dropped from `state`.
    pub fn run(&self, state: &mut BuildState) -> BuildResult<CompileReport> {
        let mut report = CompileReport::default();
        let mut live_keys = BTreeSet::new();

        for source in self.finder.find(&self.unified_tree) {
            let source = source?;
            report.total += 1;

            let key = state_key(&self.unified_tree, &source);
            let freshness = self.freshness(&source, state)?;
            live_keys.insert(key.clone());

            if freshness.is_fresh() {
                tracing::debug!("fresh {}", source.display());
                if self.check.uses_hashes() && state.get(&key).is_none() {
                    let artifact = self.artifact_for(&source);
                    state.record(key, FreshnessCheck::entry_for(&source, &artifact)?);
                }
                report.fresh += 1;
                continue;
            }

            tracing::debug!(
                "rebuilding {} with {} ({})",
                source.display(),
                self.compiler.name(),
                freshness
            );
            let started = Instant::now();
            let artifact = self.compiler.compile(&source, &self.include_root)?;
            report.compile_time += started.elapsed();

            if self.check.uses_hashes() {
                state.record(key, FreshnessCheck::entry_for(&source, &artifact)?);
            }
            report.compiled.push(source);
        }

        state.retain_keys(&live_keys);
        Ok(report)
    }
}
