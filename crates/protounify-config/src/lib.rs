//! protounify Configuration System
//!
//! Provides configuration for the namespace-rewriting build including:
//! - Project configuration (protounify.toml)
//! - Upstream namespace roots and their permitted subtrees
//! - Rewrite rule parameters and extra rules
//! - Compiler and incremental-build settings
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Built-in defaults (the envoyproto layout)
//! 2. Project config (./protounify.toml)
//! 3. Environment variables (PROTOUNIFY_*)
//!
//! # Example
//!
//! ```no_run
//! use protounify_config::ConfigLoader;
//! use std::path::Path;
//!
//! let loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! println!("unified namespace: {}", config.project.namespace());
//! ```

pub mod loader;
pub mod project;

use std::path::PathBuf;
use thiserror::Error;

/// Name of the project configuration file
pub const CONFIG_FILE_NAME: &str = "protounify.toml";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid path: {0}")]
    InvalidPath(PathBuf),
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use loader::{Config, ConfigLoader};
pub use project::{
    CompilerConfig, IncrementalConfig, OutputConfig, PackageConfig, ProjectConfig, RewriteConfig,
    RootConfig, RuleConfig, SourcesConfig, WILDCARD_SUBTREE,
};
