//! External schema compiler boundary
//!
//! The compiler is opaque: the pipeline only needs "compile this one file
//! against this include root and tell me where the artifact is". Tests
//! substitute their own [`SchemaCompiler`].

use crate::error::{BuildError, BuildResult};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Artifact path for a source: the source suffix swapped for the artifact suffix
pub fn artifact_path(source: &Path, source_suffix: &str, artifact_suffix: &str) -> PathBuf {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.strip_suffix(source_suffix).unwrap_or(&name);
    source.with_file_name(format!("{stem}{artifact_suffix}"))
}

/// Compiles one schema file into one artifact
pub trait SchemaCompiler {
    /// Compile `source`, resolving imports against `include_root`, and return
    /// the artifact path. A failed compile is an error, never a partial result.
    fn compile(&self, source: &Path, include_root: &Path) -> BuildResult<PathBuf>;

    /// Human-readable name for logs
    fn name(&self) -> String;
}

/// `protoc --python_out` driver
#[derive(Debug, Clone)]
pub struct Protoc {
    executable: PathBuf,
    source_suffix: String,
    artifact_suffix: String,
}

impl Protoc {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            source_suffix: ".proto".to_string(),
            artifact_suffix: "_pb2.py".to_string(),
        }
    }

    /// Set the suffixes used to derive artifact paths
    pub fn with_suffixes(
        mut self,
        source_suffix: impl Into<String>,
        artifact_suffix: impl Into<String>,
    ) -> Self {
        self.source_suffix = source_suffix.into();
        self.artifact_suffix = artifact_suffix.into();
        self
    }

    /// Argument list: output flag, include flag, target file
    pub fn arguments(&self, source: &Path, include_root: &Path) -> Vec<String> {
        vec![
            format!("--python_out={}", include_root.display()),
            format!("-I{}", include_root.display()),
            source.display().to_string(),
        ]
    }

    fn command_line(&self, args: &[String]) -> String {
        std::iter::once(self.executable.display().to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl SchemaCompiler for Protoc {
    fn compile(&self, source: &Path, include_root: &Path) -> BuildResult<PathBuf> {
        let args = self.arguments(source, include_root);
        tracing::info!("{}", self.command_line(&args));

        let output = Command::new(&self.executable)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| BuildError::CompilerLaunch {
                compiler: self.executable.clone(),
                source_file: source.to_path_buf(),
                error: e,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            tracing::warn!("{}", stderr);
            return Err(BuildError::CompilerFailed {
                source_file: source.to_path_buf(),
                status: output.status,
                stderr,
            });
        }

        if !stderr.is_empty() {
            tracing::warn!("{}", stderr);
        }

        let artifact = artifact_path(source, &self.source_suffix, &self.artifact_suffix);
        if !artifact.exists() {
            return Err(BuildError::MissingArtifact {
                source_file: source.to_path_buf(),
                artifact,
            });
        }

        Ok(artifact)
    }

    fn name(&self) -> String {
        self.executable.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_path_swaps_suffix() {
        assert_eq!(
            artifact_path(Path::new("/out/envoyproto/sub/y.proto"), ".proto", "_pb2.py"),
            PathBuf::from("/out/envoyproto/sub/y_pb2.py")
        );
    }

    #[test]
    fn test_artifact_path_keeps_inner_dots() {
        assert_eq!(
            artifact_path(Path::new("a/v1.alpha.proto"), ".proto", "_pb2.py"),
            PathBuf::from("a/v1.alpha_pb2.py")
        );
    }

    #[test]
    fn test_protoc_arguments() {
        let protoc = Protoc::new("/usr/bin/protoc");
        assert_eq!(
            protoc.arguments(Path::new("/base/envoyproto/x.proto"), Path::new("/base")),
            vec![
                "--python_out=/base".to_string(),
                "-I/base".to_string(),
                "/base/envoyproto/x.proto".to_string(),
            ]
        );
    }

    #[test]
    fn test_missing_executable_is_launch_error() {
        let protoc = Protoc::new("/nonexistent/protounify/protoc");
        let err = protoc
            .compile(Path::new("/tmp/x.proto"), Path::new("/tmp"))
            .unwrap_err();
        assert!(matches!(err, BuildError::CompilerLaunch { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_fatal() {
        let protoc = Protoc::new("false");
        let err = protoc
            .compile(Path::new("/tmp/x.proto"), Path::new("/tmp"))
            .unwrap_err();
        assert!(matches!(err, BuildError::CompilerFailed { .. }));
    }
}
