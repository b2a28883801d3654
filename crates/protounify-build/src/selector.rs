//! Namespace roots and subtree selection

use protounify_config::{RootConfig, WILDCARD_SUBTREE};
use std::path::{Path, PathBuf};

/// Which subtrees of a namespace root are eligible for rewriting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtreeSelection {
    /// Every file under the root
    All,
    /// Only files inside (or nested below) these relative directories
    Only(Vec<PathBuf>),
}

impl SubtreeSelection {
    /// Build a selection from configured subtree strings.
    ///
    /// Any occurrence of the wildcard marker turns the selection into `All`.
    pub fn from_subtrees<I, S>(subtrees: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut permitted = Vec::new();
        for subtree in subtrees {
            let subtree = subtree.as_ref();
            if subtree == WILDCARD_SUBTREE {
                return Self::All;
            }
            permitted.push(PathBuf::from(subtree.trim_end_matches('/')));
        }
        Self::Only(permitted)
    }

    /// Decide whether a file at `relative_path` (relative to its root) is included.
    ///
    /// Matching is by path segment: the file's directory must equal a
    /// permitted subtree or be nested beneath one.
    pub fn includes(&self, relative_path: &Path) -> bool {
        match self {
            Self::All => true,
            Self::Only(permitted) => {
                let dir = relative_path.parent().unwrap_or_else(|| Path::new(""));
                permitted.iter().any(|subtree| dir.starts_with(subtree))
            }
        }
    }
}

/// An upstream project root and its permitted subtrees
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceRoot {
    /// Absolute directory of the upstream tree
    pub path: PathBuf,
    pub selection: SubtreeSelection,
}

impl NamespaceRoot {
    pub fn new(path: impl Into<PathBuf>, selection: SubtreeSelection) -> Self {
        Self {
            path: path.into(),
            selection,
        }
    }

    /// Resolve a configured root against the upstream directory
    pub fn from_config(upstream_dir: &Path, config: &RootConfig) -> Self {
        Self::new(
            upstream_dir.join(&config.path),
            SubtreeSelection::from_subtrees(&config.subtrees),
        )
    }

    /// Classify a discovered file
    pub fn classify(&self, input: PathBuf) -> SourceFile {
        let relative = input
            .strip_prefix(&self.path)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| input.clone());
        let selected = self.selection.includes(&relative);

        SourceFile {
            input,
            relative,
            selected,
        }
    }
}

/// A schema file discovered under a namespace root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute input path
    pub input: PathBuf,
    /// Path relative to the namespace root
    pub relative: PathBuf,
    /// Whether the file survived subtree filtering
    pub selected: bool,
}
