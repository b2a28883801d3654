//! protounify build pipeline
//!
//! Merges schema trees from several upstream projects into one namespace and
//! builds Python bindings over the result:
//! - Recursive discovery of schema files, pruning test fixtures
//! - Subtree selection per upstream root
//! - Ordered, line-based namespace rewriting
//! - Incremental protoc invocation (mtime plus content-hash build state)
//! - Per-directory and root import manifests
//!
//! # Example
//!
//! ```no_run
//! use protounify_build::Pipeline;
//! use protounify_config::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::new().load_from_directory(Path::new(".")).unwrap();
//! let report = Pipeline::new(&config).unwrap().run().unwrap();
//! println!("compiled {} files", report.compile.compiled.len());
//! ```

pub mod aggregate;
pub mod cache;
pub mod compiler;
pub mod driver;
pub mod error;
pub mod finder;
pub mod output;
pub mod pipeline;
pub mod rewrite;
pub mod selector;

// Re-export main types
pub use aggregate::{package_name, AggregateReport, Manifest, ModuleAggregator, ModuleGroup, ModuleGroups};
pub use cache::{BuildState, Freshness, FreshnessCheck, StateEntry};
pub use compiler::{artifact_path, Protoc, SchemaCompiler};
pub use driver::{CompileReport, IncrementalDriver};
pub use error::{BuildError, BuildResult};
pub use finder::FileFinder;
pub use output::{write_if_changed, WriteOutcome};
pub use pipeline::{clean, discover_packages, Pipeline, PipelineConfig, PipelineReport, PipelineStats};
pub use rewrite::{RewriteEngine, RewriteParams, RewriteRule, RewrittenFile, RuleSet};
pub use selector::{NamespaceRoot, SourceFile, SubtreeSelection};

// Re-export configuration types for convenience
pub use protounify_config::{Config, ConfigLoader};
