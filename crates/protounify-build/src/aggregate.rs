//! Module aggregation
//!
//! Groups compiled artifacts by directory and emits one import manifest per
//! directory plus a root manifest that imports every artifact. Groups and the
//! stems inside them are sorted, so manifests are byte-identical across runs
//! and filesystems.

use crate::error::{BuildError, BuildResult};
use crate::finder::FileFinder;
use crate::output::write_if_changed;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Artifacts found directly in one directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleGroup {
    /// Directory holding the artifacts
    pub dir: PathBuf,
    /// Dotted package name of `dir`
    pub package: String,
    /// Sorted artifact stems (file name minus the artifact suffix)
    pub stems: Vec<String>,
}

/// Immutable directory → artifacts mapping.
///
/// Keyed by package name then directory: two directories can share a dotted
/// name (`a/b.c` and `a/b/c`) and still get a group each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleGroups {
    groups: BTreeMap<(String, PathBuf), ModuleGroup>,
}

impl ModuleGroups {
    /// Group artifact paths. Every path must live under `output_base`.
    pub fn from_artifacts<I>(output_base: &Path, artifact_suffix: &str, artifacts: I) -> BuildResult<Self>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut groups: BTreeMap<(String, PathBuf), ModuleGroup> = BTreeMap::new();

        for artifact in artifacts {
            let dir = artifact
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            let package = package_name(output_base, &dir)?;
            let stem = artifact
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(artifact_suffix))
                .unwrap_or_default()
                .to_string();

            groups
                .entry((package.clone(), dir.clone()))
                .or_insert_with(|| ModuleGroup {
                    dir,
                    package,
                    stems: Vec::new(),
                })
                .stems
                .push(stem);
        }

        for group in groups.values_mut() {
            group.stems.sort();
            group.stems.dedup();
        }

        Ok(Self { groups })
    }

    /// Group for the artifacts directly inside `dir`
    pub fn get(&self, dir: &Path) -> Option<&ModuleGroup> {
        self.groups.values().find(|g| g.dir == dir)
    }

    /// Groups in package-name order
    pub fn iter(&self) -> impl Iterator<Item = &ModuleGroup> {
        self.groups.values()
    }

    /// Sorted, de-duplicated package names
    pub fn packages(&self) -> Vec<String> {
        let mut packages: Vec<String> = self.groups.keys().map(|(p, _)| p.clone()).collect();
        packages.dedup();
        packages
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of artifacts across all groups
    pub fn artifact_count(&self) -> usize {
        self.groups.values().map(|g| g.stems.len()).sum()
    }
}

/// Dotted package name for `dir`: the path below `output_base` with
/// separators replaced by dots
pub fn package_name(output_base: &Path, dir: &Path) -> BuildResult<String> {
    let relative = dir
        .strip_prefix(output_base)
        .map_err(|_| BuildError::outside_tree(dir, output_base))?;

    let segments: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    Ok(segments.join("."))
}

/// A rendered manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub path: PathBuf,
    pub contents: String,
}

/// Result of an aggregation pass
#[derive(Debug, Clone, Default)]
pub struct AggregateReport {
    pub groups: ModuleGroups,
    /// Every manifest rendered, in write order
    pub manifests: Vec<PathBuf>,
    /// Manifests whose contents changed on disk
    pub written: usize,
}

/// Emits aggregation manifests over the unified tree
#[derive(Debug, Clone)]
pub struct ModuleAggregator {
    output_base: PathBuf,
    unified_tree: PathBuf,
    finder: FileFinder,
    manifest_name: String,
}

impl ModuleAggregator {
    /// `finder` selects artifacts (its suffix is the artifact suffix)
    pub fn new(
        output_base: impl Into<PathBuf>,
        unified_tree: impl Into<PathBuf>,
        finder: FileFinder,
    ) -> Self {
        Self {
            output_base: output_base.into(),
            unified_tree: unified_tree.into(),
            finder,
            manifest_name: "__init__.py".to_string(),
        }
    }

    pub fn with_manifest_name(mut self, name: impl Into<String>) -> Self {
        self.manifest_name = name.into();
        self
    }

    /// Scan the unified tree. A missing tree has no groups.
    pub fn group(&self) -> BuildResult<ModuleGroups> {
        if !self.unified_tree.is_dir() {
            return Ok(ModuleGroups::default());
        }
        let artifacts = self.finder.find_all(&self.unified_tree)?;
        ModuleGroups::from_artifacts(&self.output_base, self.finder.suffix(), artifacts)
    }

    /// Python module name of an artifact, relative to its package
    fn module_suffix(&self) -> &str {
        let suffix = self.finder.suffix();
        suffix.strip_suffix(".py").unwrap_or(suffix)
    }

    fn render_aliases(&self, group: &ModuleGroup, out: &mut String) {
        for stem in &group.stems {
            out.push_str(&format!(
                "import {}.{}{} as {}\n",
                group.package,
                stem,
                self.module_suffix(),
                stem
            ));
        }
        let quoted: Vec<String> = group.stems.iter().map(|s| format!("'{s}'")).collect();
        out.push_str(&format!("\n__all__ = [{}]\n", quoted.join(", ")));
    }

    /// Manifest for one directory: aliased imports then the export list
    pub fn render_group(&self, group: &ModuleGroup) -> Manifest {
        let mut contents = String::new();
        self.render_aliases(group, &mut contents);
        Manifest {
            path: group.dir.join(&self.manifest_name),
            contents,
        }
    }

    /// Root manifest: a fully-qualified import of every artifact.
    ///
    /// When the unified tree root holds artifacts itself, its aliases and
    /// export list follow the imports in the same file.
    pub fn render_root(&self, groups: &ModuleGroups) -> Manifest {
        let mut contents = String::new();
        for group in groups.iter() {
            for stem in &group.stems {
                contents.push_str(&format!(
                    "import {}.{}{}\n",
                    group.package,
                    stem,
                    self.module_suffix()
                ));
            }
        }

        if let Some(root_group) = groups.get(&self.unified_tree) {
            contents.push('\n');
            self.render_aliases(root_group, &mut contents);
        }

        Manifest {
            path: self.unified_tree.join(&self.manifest_name),
            contents,
        }
    }

    /// Render all manifests: one per group (except the root's) then the root.
    /// No artifacts, no manifests.
    pub fn render(&self, groups: &ModuleGroups) -> Vec<Manifest> {
        if groups.is_empty() {
            return Vec::new();
        }

        let mut manifests: Vec<Manifest> = groups
            .iter()
            .filter(|g| g.dir != self.unified_tree)
            .map(|g| self.render_group(g))
            .collect();
        manifests.push(self.render_root(groups));
        manifests
    }

    /// Group, render and write every manifest
    pub fn run(&self) -> BuildResult<AggregateReport> {
        let groups = self.group()?;
        let mut report = AggregateReport::default();

        for manifest in self.render(&groups) {
            if write_if_changed(&manifest.path, manifest.contents.as_bytes())?.was_written() {
                tracing::info!("writing {}", manifest.path.display());
                report.written += 1;
            }
            report.manifests.push(manifest.path);
        }

        report.groups = groups;
        Ok(report)
    }

    /// Dotted names of every package holding an artifact; empty when the
    /// unified tree does not exist
    pub fn discover_packages(&self) -> BuildResult<Vec<String>> {
        Ok(self.group()?.packages())
    }
}
