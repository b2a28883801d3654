//! Build pipeline error types

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Namespace root not found: {path}")]
    NamespaceRootNotFound { path: PathBuf },

    #[error("Invalid rewrite rule '{pattern}': {error}")]
    InvalidRule {
        pattern: String,
        error: regex::Error,
    },

    #[error("Failed to launch compiler {compiler} for {source_file}: {error}")]
    CompilerLaunch {
        compiler: PathBuf,
        source_file: PathBuf,
        error: std::io::Error,
    },

    #[error("Compiler failed for {source_file} ({status}): {stderr}")]
    CompilerFailed {
        source_file: PathBuf,
        status: ExitStatus,
        stderr: String,
    },

    #[error("Compiler produced no artifact for {source_file}: expected {artifact}")]
    MissingArtifact {
        source_file: PathBuf,
        artifact: PathBuf,
    },

    #[error("Path {path} is not under {base}")]
    OutsideTree { path: PathBuf, base: PathBuf },

    #[error("Build state error at {path}: {error}")]
    StateError {
        path: PathBuf,
        error: serde_json::Error,
    },

    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] protounify_config::ConfigError),
}

impl BuildError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Create an invalid rule error
    pub fn invalid_rule(pattern: impl Into<String>, error: regex::Error) -> Self {
        Self::InvalidRule {
            pattern: pattern.into(),
            error,
        }
    }

    /// Create a path-outside-tree error
    pub fn outside_tree(path: impl Into<PathBuf>, base: impl Into<PathBuf>) -> Self {
        Self::OutsideTree {
            path: path.into(),
            base: base.into(),
        }
    }
}
