//! Configuration Loader
//!
//! Handles locating protounify.toml and applying environment overrides.

use crate::project::{CompilerConfig, IncrementalConfig, ProjectConfig};
use crate::{ConfigResult, CONFIG_FILE_NAME};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader
///
/// Sources, lowest priority first:
/// 1. Built-in defaults
/// 2. Project config (./protounify.toml, searched upwards)
/// 3. Environment variables (PROTOUNIFY_*)
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Skip environment overrides (used by embedding build hooks)
    ignore_env: bool,
}

/// Merged configuration result
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Directory protounify.toml was found in; relative paths resolve against it
    pub project_root: PathBuf,

    /// Whether a protounify.toml was found
    pub found: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { ignore_env: false }
    }

    /// Disable PROTOUNIFY_* environment overrides
    pub fn without_env(mut self) -> Self {
        self.ignore_env = true;
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find protounify.toml. When none is
    /// found the defaults apply with `start_dir` as project root.
    pub fn load_from_directory(&self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, project_config, found) = match self.find_project_config(start_dir)? {
            Some((root, config)) => (root, config, true),
            None => (start_dir.to_path_buf(), ProjectConfig::default(), false),
        };

        let project = self.apply_env_overrides(project_config)?;

        Ok(Config {
            project,
            project_root,
            found,
        })
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&self, config_path: &Path) -> ConfigResult<Config> {
        let project = ProjectConfig::load_from_file(config_path)?;
        let project = self.apply_env_overrides(project)?;

        let project_root = config_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default();

        Ok(Config {
            project,
            project_root,
            found: true,
        })
    }

    fn find_project_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<Option<(PathBuf, ProjectConfig)>> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.exists() {
                let project_config = ProjectConfig::load_from_file(&config_path)?;
                return Ok(Some((current, project_config)));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok(None),
            }
        }
    }

    /// Apply environment variable overrides to project config
    ///
    /// - `PROTOUNIFY_PROTOC=/opt/bin/protoc`
    /// - `PROTOUNIFY_CONTENT_HASHES=false`
    fn apply_env_overrides(&self, mut config: ProjectConfig) -> ConfigResult<ProjectConfig> {
        if self.ignore_env {
            return Ok(config);
        }

        if let Ok(protoc) = env::var("PROTOUNIFY_PROTOC") {
            if !protoc.is_empty() {
                config
                    .compiler
                    .get_or_insert_with(CompilerConfig::default)
                    .protoc = Some(PathBuf::from(protoc));
            }
        }

        if let Ok(hashes) = env::var("PROTOUNIFY_CONTENT_HASHES") {
            let enabled = matches!(hashes.to_lowercase().as_str(), "true" | "1" | "yes");
            config
                .incremental
                .get_or_insert_with(IncrementalConfig::default)
                .content_hashes = Some(enabled);
        }

        config.validate()?;
        Ok(config)
    }
}

impl Config {
    /// Resolve a project-relative path
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    /// Absolute upstream directory
    pub fn upstream_dir(&self) -> PathBuf {
        self.resolve(self.project.upstream_dir())
    }

    /// Absolute output base (parent of the unified tree)
    pub fn output_base(&self) -> PathBuf {
        self.resolve(self.project.output_base())
    }

    /// Absolute build-state record path
    pub fn state_file(&self) -> PathBuf {
        let state = self.project.state_file();
        if state.is_absolute() {
            state.to_path_buf()
        } else {
            self.output_base().join(state)
        }
    }
}
