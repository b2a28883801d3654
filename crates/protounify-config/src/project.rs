//! Project Configuration (protounify.toml)
//!
//! Every section is optional. Accessors on [`ProjectConfig`] return the
//! effective value, falling back to the envoyproto layout when a key is absent.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Subtree marker meaning "accept every file under the root"
pub const WILDCARD_SUBTREE: &str = ".";

const DEFAULT_NAMESPACE: &str = "envoyproto";
const DEFAULT_UPSTREAM_DIR: &str = "protobuf-libs";
const DEFAULT_EXCLUDE_DIR: &str = "tests";
const DEFAULT_PROTOC: &str = "/usr/bin/protoc";
const DEFAULT_SOURCE_SUFFIX: &str = ".proto";
const DEFAULT_ARTIFACT_SUFFIX: &str = "_pb2.py";
const DEFAULT_MANIFEST_NAME: &str = "__init__.py";
const DEFAULT_STATE_FILE: &str = ".protounify/state.json";
const DEFAULT_LEGACY_NAMESPACE: &str = "envoy";
const DEFAULT_WELL_KNOWN_PACKAGE: &str = "google.protobuf";

const DEFAULT_LEGACY_PACKAGES: &[&str] = &["udpa", "xds"];

const DEFAULT_IMPORT_ROOTS: &[&str] = &[
    "envoy",
    "contrib",
    "udpa",
    "xds",
    "validate",
    "google/api",
    "google/logging",
    "google/longrunning",
    "google/rpc",
    "opentelemetry",
    "opencensus",
    "io/prometheus/client",
    "cel/expr",
    "bazel",
];

const DEFAULT_ROOTS: &[(&str, &[&str])] = &[
    ("envoy", &[WILDCARD_SUBTREE]),
    ("xds", &[WILDCARD_SUBTREE]),
    ("prometheus-client-model", &[WILDCARD_SUBTREE]),
    ("protoc-gen-validate", &["validate"]),
    (
        "googleapis",
        &["google/api", "google/logging", "google/longrunning", "google/rpc"],
    ),
    ("opentelemetry", &[WILDCARD_SUBTREE]),
    ("opencensus/src", &[WILDCARD_SUBTREE]),
    ("cel/proto", &["cel/expr"]),
];

/// Project configuration from protounify.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Unified package settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<PackageConfig>,

    /// Upstream source trees
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<SourcesConfig>,

    /// Output tree location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,

    /// External schema compiler
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler: Option<CompilerConfig>,

    /// Namespace rewrite parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewrite: Option<RewriteConfig>,

    /// Incremental build settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incremental: Option<IncrementalConfig>,
}

/// Unified package configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PackageConfig {
    /// Namespace every rewritten package is moved under (default: "envoyproto")
    pub namespace: String,
}

/// Upstream source configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct SourcesConfig {
    /// Directory holding the upstream checkouts (default: "protobuf-libs")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_dir: Option<PathBuf>,

    /// Directory names pruned during traversal (default: ["tests"])
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_dirs: Option<Vec<String>>,

    /// Namespace roots; replaces the built-in list when non-empty
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roots: Vec<RootConfig>,
}

/// One upstream namespace root
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RootConfig {
    /// Path relative to the upstream directory
    pub path: PathBuf,

    /// Permitted relative subtrees; `"."` accepts everything
    #[serde(default = "wildcard_subtrees")]
    pub subtrees: Vec<String>,
}

fn wildcard_subtrees() -> Vec<String> {
    vec![WILDCARD_SUBTREE.to_string()]
}

impl RootConfig {
    /// Create a root accepting every file beneath it
    pub fn wildcard(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            subtrees: wildcard_subtrees(),
        }
    }

    /// Create a root restricted to the given subtrees
    pub fn with_subtrees<I, S>(path: impl Into<PathBuf>, subtrees: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into(),
            subtrees: subtrees.into_iter().map(Into::into).collect(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Base directory; the unified tree is `<base>/<namespace>` (default: ".")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<PathBuf>,
}

/// Compiler configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct CompilerConfig {
    /// Path to protoc (default: "/usr/bin/protoc")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protoc: Option<PathBuf>,

    /// Schema source suffix (default: ".proto")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_suffix: Option<String>,

    /// Generated binding suffix (default: "_pb2.py")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_suffix: Option<String>,

    /// Aggregation manifest file name (default: "__init__.py")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_name: Option<String>,
}

/// Rewrite rule parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct RewriteConfig {
    /// Legacy top-level packages referenced without a namespace (default: udpa, xds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legacy_packages: Option<Vec<String>>,

    /// Legacy namespace referenced fully-qualified (default: "envoy")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legacy_namespace: Option<String>,

    /// Well-known package forced to full qualification (default: "google.protobuf")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub well_known_package: Option<String>,

    /// Import directories moved under the unified tree
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_roots: Option<Vec<String>>,

    /// Extra rules applied after the standard ones
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleConfig>,
}

/// A user-supplied rewrite rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    /// Regular expression matched against each line
    pub pattern: String,

    /// Replacement, `$1`/`${name}` expand capture groups
    pub replacement: String,
}

/// Incremental build configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct IncrementalConfig {
    /// Track source/artifact content hashes in addition to mtimes (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hashes: Option<bool>,

    /// Build-state record, relative to the output base
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,
}

impl ProjectConfig {
    /// Load project configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the project configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(pkg) = &self.package {
            if !is_valid_namespace(&pkg.namespace) {
                return Err(ConfigError::invalid(
                    "package.namespace",
                    format!("'{}' is not a dotted identifier", pkg.namespace),
                ));
            }
        }

        for root in self.sources.iter().flat_map(|s| s.roots.iter()) {
            validate_root(root)?;
        }

        if let Some(compiler) = &self.compiler {
            for (field, value) in [
                ("compiler.source_suffix", &compiler.source_suffix),
                ("compiler.artifact_suffix", &compiler.artifact_suffix),
                ("compiler.manifest_name", &compiler.manifest_name),
            ] {
                if value.as_deref() == Some("") {
                    return Err(ConfigError::invalid(field, "cannot be empty"));
                }
            }
        }

        if let Some(rewrite) = &self.rewrite {
            if rewrite.legacy_namespace.as_deref() == Some("") {
                return Err(ConfigError::invalid(
                    "rewrite.legacy_namespace",
                    "cannot be empty",
                ));
            }
            for rule in &rewrite.rules {
                if rule.pattern.is_empty() {
                    return Err(ConfigError::invalid(
                        "rewrite.rules.pattern",
                        "pattern cannot be empty",
                    ));
                }
            }
        }

        Ok(())
    }

    /// Unified namespace
    pub fn namespace(&self) -> &str {
        self.package
            .as_ref()
            .map(|p| p.namespace.as_str())
            .unwrap_or(DEFAULT_NAMESPACE)
    }

    /// Upstream directory, relative to the project root
    pub fn upstream_dir(&self) -> &Path {
        self.sources
            .as_ref()
            .and_then(|s| s.upstream_dir.as_deref())
            .unwrap_or_else(|| Path::new(DEFAULT_UPSTREAM_DIR))
    }

    /// Directory names pruned from every traversal
    pub fn exclude_dirs(&self) -> Vec<String> {
        self.sources
            .as_ref()
            .and_then(|s| s.exclude_dirs.clone())
            .unwrap_or_else(|| vec![DEFAULT_EXCLUDE_DIR.to_string()])
    }

    /// Configured namespace roots, or the built-in envoyproto list
    pub fn roots(&self) -> Vec<RootConfig> {
        match &self.sources {
            Some(sources) if !sources.roots.is_empty() => sources.roots.clone(),
            _ => DEFAULT_ROOTS
                .iter()
                .map(|(path, subtrees)| RootConfig::with_subtrees(*path, subtrees.iter().copied()))
                .collect(),
        }
    }

    /// Output base, relative to the project root
    pub fn output_base(&self) -> &Path {
        self.output
            .as_ref()
            .and_then(|o| o.base.as_deref())
            .unwrap_or_else(|| Path::new("."))
    }

    pub fn protoc(&self) -> &Path {
        self.compiler
            .as_ref()
            .and_then(|c| c.protoc.as_deref())
            .unwrap_or_else(|| Path::new(DEFAULT_PROTOC))
    }

    pub fn source_suffix(&self) -> &str {
        self.compiler
            .as_ref()
            .and_then(|c| c.source_suffix.as_deref())
            .unwrap_or(DEFAULT_SOURCE_SUFFIX)
    }

    pub fn artifact_suffix(&self) -> &str {
        self.compiler
            .as_ref()
            .and_then(|c| c.artifact_suffix.as_deref())
            .unwrap_or(DEFAULT_ARTIFACT_SUFFIX)
    }

    pub fn manifest_name(&self) -> &str {
        self.compiler
            .as_ref()
            .and_then(|c| c.manifest_name.as_deref())
            .unwrap_or(DEFAULT_MANIFEST_NAME)
    }

    pub fn legacy_packages(&self) -> Vec<String> {
        self.rewrite
            .as_ref()
            .and_then(|r| r.legacy_packages.clone())
            .unwrap_or_else(|| to_owned_list(DEFAULT_LEGACY_PACKAGES))
    }

    pub fn legacy_namespace(&self) -> &str {
        self.rewrite
            .as_ref()
            .and_then(|r| r.legacy_namespace.as_deref())
            .unwrap_or(DEFAULT_LEGACY_NAMESPACE)
    }

    pub fn well_known_package(&self) -> &str {
        self.rewrite
            .as_ref()
            .and_then(|r| r.well_known_package.as_deref())
            .unwrap_or(DEFAULT_WELL_KNOWN_PACKAGE)
    }

    pub fn import_roots(&self) -> Vec<String> {
        self.rewrite
            .as_ref()
            .and_then(|r| r.import_roots.clone())
            .unwrap_or_else(|| to_owned_list(DEFAULT_IMPORT_ROOTS))
    }

    /// Extra rewrite rules, in declaration order
    pub fn extra_rules(&self) -> &[RuleConfig] {
        self.rewrite
            .as_ref()
            .map(|r| r.rules.as_slice())
            .unwrap_or(&[])
    }

    pub fn content_hashes(&self) -> bool {
        self.incremental
            .as_ref()
            .and_then(|i| i.content_hashes)
            .unwrap_or(true)
    }

    /// Build-state record, relative to the output base
    pub fn state_file(&self) -> &Path {
        self.incremental
            .as_ref()
            .and_then(|i| i.state_file.as_deref())
            .unwrap_or_else(|| Path::new(DEFAULT_STATE_FILE))
    }
}

fn to_owned_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// A namespace is one or more identifiers joined by dots
fn is_valid_namespace(namespace: &str) -> bool {
    !namespace.is_empty()
        && namespace.split('.').all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

fn validate_root(root: &RootConfig) -> ConfigResult<()> {
    if root.path.as_os_str().is_empty() {
        return Err(ConfigError::invalid(
            "sources.roots.path",
            "path cannot be empty",
        ));
    }

    if root.path.is_absolute() {
        return Err(ConfigError::InvalidPath(root.path.clone()));
    }

    if root.subtrees.is_empty() {
        return Err(ConfigError::invalid(
            format!("sources.roots '{}'", root.path.display()),
            "subtrees cannot be empty; use [\".\"] to accept everything",
        ));
    }

    for subtree in &root.subtrees {
        if subtree.is_empty() || Path::new(subtree).is_absolute() {
            return Err(ConfigError::invalid(
                format!("sources.roots '{}'", root.path.display()),
                format!("invalid subtree '{}'", subtree),
            ));
        }
    }

    Ok(())
}
