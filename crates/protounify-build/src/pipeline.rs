//! Pipeline orchestration
//!
//! rewrite upstream roots → compile stale sources → aggregate manifests

use crate::aggregate::{AggregateReport, ModuleAggregator};
use crate::cache::{BuildState, FreshnessCheck};
use crate::compiler::{Protoc, SchemaCompiler};
use crate::driver::{CompileReport, IncrementalDriver};
use crate::error::{BuildError, BuildResult};
use crate::finder::FileFinder;
use crate::rewrite::{RewriteEngine, RuleSet};
use crate::selector::NamespaceRoot;
use protounify_config::Config;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Fully resolved pipeline settings
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Upstream roots in processing order
    pub roots: Vec<NamespaceRoot>,
    /// Parent of the unified tree; include root for the compiler
    pub output_base: PathBuf,
    /// `<output_base>/<namespace as path>`
    pub unified_tree: PathBuf,
    pub exclude_dirs: Vec<String>,
    pub source_suffix: String,
    pub artifact_suffix: String,
    pub manifest_name: String,
    pub protoc: PathBuf,
    /// Build-state record; `None` disables content hashing
    pub state_file: Option<PathBuf>,
}

impl PipelineConfig {
    /// Resolve loaded configuration against its project root
    pub fn from_config(config: &Config) -> Self {
        let project = &config.project;
        let upstream = config.upstream_dir();
        let output_base = config.output_base();
        let unified_tree = output_base.join(project.namespace().replace('.', "/"));

        Self {
            roots: project
                .roots()
                .iter()
                .map(|root| NamespaceRoot::from_config(&upstream, root))
                .collect(),
            unified_tree,
            output_base,
            exclude_dirs: project.exclude_dirs(),
            source_suffix: project.source_suffix().to_string(),
            artifact_suffix: project.artifact_suffix().to_string(),
            manifest_name: project.manifest_name().to_string(),
            protoc: resolve_executable(config, project.protoc()),
            state_file: project.content_hashes().then(|| config.state_file()),
        }
    }

    fn source_finder(&self) -> FileFinder {
        FileFinder::new(self.source_suffix.clone()).with_exclusions(self.exclude_dirs.clone())
    }

    fn artifact_finder(&self) -> FileFinder {
        FileFinder::new(self.artifact_suffix.clone()).with_exclusions(self.exclude_dirs.clone())
    }

    pub fn aggregator(&self) -> ModuleAggregator {
        ModuleAggregator::new(&self.output_base, &self.unified_tree, self.artifact_finder())
            .with_manifest_name(self.manifest_name.clone())
    }
}

/// Bare command names are looked up on PATH; anything with a separator is
/// project-relative
fn resolve_executable(config: &Config, protoc: &Path) -> PathBuf {
    if protoc.components().count() > 1 {
        config.resolve(protoc)
    } else {
        protoc.to_path_buf()
    }
}

/// Pipeline statistics
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub rewrite_time: Duration,
    pub compilation_time: Duration,
    pub aggregation_time: Duration,
    pub total_time: Duration,
}

/// Result of a successful run
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    /// Sources selected from upstream and materialized in the unified tree
    pub rewritten: Vec<PathBuf>,
    /// Rewritten sources whose contents changed on disk
    pub rewrites_written: usize,
    /// Upstream sources dropped by subtree filtering
    pub filtered_out: usize,
    pub compile: CompileReport,
    pub aggregate: AggregateReport,
    pub stats: PipelineStats,
}

/// Namespace-rewriting build pipeline
pub struct Pipeline {
    config: PipelineConfig,
    rules: RuleSet,
    compiler: Box<dyn SchemaCompiler>,
}

impl Pipeline {
    /// Pipeline for a loaded configuration, compiling with `protoc`
    pub fn new(config: &Config) -> BuildResult<Self> {
        let resolved = PipelineConfig::from_config(config);
        let rules = RuleSet::from_config(&config.project)?;
        let compiler = Protoc::new(&resolved.protoc)
            .with_suffixes(&resolved.source_suffix, &resolved.artifact_suffix);

        Ok(Self {
            config: resolved,
            rules,
            compiler: Box::new(compiler),
        })
    }

    /// Replace the schema compiler
    pub fn with_compiler(mut self, compiler: Box<dyn SchemaCompiler>) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run rewrite, compile and aggregate. Any error aborts the run.
    pub fn run(&self) -> BuildResult<PipelineReport> {
        let started = Instant::now();
        let mut report = PipelineReport::default();

        tracing::info!(
            "rewriting {} namespace roots into {}",
            self.config.roots.len(),
            self.config.unified_tree.display()
        );
        for rule in self.rules.rules() {
            tracing::debug!("rule {} -> {}", rule.pattern(), rule.replacement());
        }
        let phase = Instant::now();
        self.rewrite(&mut report)?;
        report.stats.rewrite_time = phase.elapsed();

        let phase = Instant::now();
        report.compile = self.compile()?;
        report.stats.compilation_time = phase.elapsed();

        let phase = Instant::now();
        report.aggregate = self.config.aggregator().run()?;
        report.stats.aggregation_time = phase.elapsed();

        report.stats.total_time = started.elapsed();
        tracing::info!(
            "compiled {}/{} sources, {} manifests in {:.2}s",
            report.compile.compiled.len(),
            report.compile.total,
            report.aggregate.manifests.len(),
            report.stats.total_time.as_secs_f64()
        );

        Ok(report)
    }

    fn rewrite(&self, report: &mut PipelineReport) -> BuildResult<()> {
        let engine = RewriteEngine::new(self.rules.clone(), &self.config.unified_tree);
        let finder = self.config.source_finder();

        for root in &self.config.roots {
            if !root.path.is_dir() {
                return Err(BuildError::NamespaceRootNotFound {
                    path: root.path.clone(),
                });
            }

            for input in finder.find(&root.path) {
                let source = root.classify(input?);
                if !source.selected {
                    report.filtered_out += 1;
                    continue;
                }

                let rewritten = engine.rewrite_file(&source)?;
                if rewritten.outcome.was_written() {
                    report.rewrites_written += 1;
                }
                report.rewritten.push(rewritten.output);
            }
        }

        Ok(())
    }

    fn compile(&self) -> BuildResult<CompileReport> {
        if !self.config.unified_tree.is_dir() {
            return Ok(CompileReport::default());
        }

        let check = if self.config.state_file.is_some() {
            FreshnessCheck::with_content_hashes()
        } else {
            FreshnessCheck::mtime_only()
        };
        let driver = IncrementalDriver::new(
            self.compiler.as_ref(),
            self.config.source_finder(),
            &self.config.unified_tree,
            &self.config.output_base,
        )
        .with_artifact_suffix(self.config.artifact_suffix.clone())
        .with_check(check);

        let mut state = match &self.config.state_file {
            Some(path) => BuildState::load(path)?,
            None => BuildState::new(),
        };

        // Save what succeeded even when a later compile fails
        let result = driver.run(&mut state);
        if let Some(path) = &self.config.state_file {
            state.save(path)?;
        }
        result
    }

    /// Dotted package names holding artifacts, for packaging
    pub fn discover_packages(&self) -> BuildResult<Vec<String>> {
        self.config.aggregator().discover_packages()
    }
}

/// Package discovery without constructing a pipeline. A missing unified tree
/// yields an empty list.
pub fn discover_packages(config: &Config) -> BuildResult<Vec<String>> {
    PipelineConfig::from_config(config)
        .aggregator()
        .discover_packages()
}

/// Remove the unified tree and build state
pub fn clean(config: &PipelineConfig) -> BuildResult<()> {
    remove_if_exists(&config.unified_tree, true)?;
    if let Some(state) = &config.state_file {
        remove_if_exists(state, false)?;
    }
    Ok(())
}

fn remove_if_exists(path: &Path, dir: bool) -> BuildResult<()> {
    let result = if dir {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BuildError::io(path, e)),
    }
}
