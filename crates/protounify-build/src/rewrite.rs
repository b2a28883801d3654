//! Namespace rewriting
//!
//! Moves every upstream package under a single namespace by folding an
//! ordered list of regex substitutions over each line of each schema file.
//! The transformation is purely textual: rules fire inside comments and
//! string literals too.

use crate::error::{BuildError, BuildResult};
use crate::output::{write_if_changed, WriteOutcome};
use crate::selector::SourceFile;
use protounify_config::ProjectConfig;
use regex::Regex;
use std::borrow::Cow;
use std::fs;
use std::path::PathBuf;

/// One textual substitution
#[derive(Debug, Clone)]
pub struct RewriteRule {
    pattern: Regex,
    replacement: String,
}

impl RewriteRule {
    /// Compile a rule. `replacement` expands `$1` / `${name}` groups.
    pub fn new(pattern: &str, replacement: impl Into<String>) -> BuildResult<Self> {
        let pattern = Regex::new(pattern).map_err(|e| BuildError::invalid_rule(pattern, e))?;
        Ok(Self {
            pattern,
            replacement: replacement.into(),
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Replace every non-overlapping match in `line`
    pub fn apply<'a>(&self, line: &'a str) -> Cow<'a, str> {
        self.pattern.replace_all(line, self.replacement.as_str())
    }
}

/// Parameters of the standard envoyproto rule set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteParams {
    /// Namespace inserted in front of every package
    pub namespace: String,
    /// Top-level packages referenced bare (`udpa.`, `xds.`)
    pub legacy_packages: Vec<String>,
    /// Package referenced fully-qualified with a leading dot (`.envoy.`)
    pub legacy_namespace: String,
    /// Package that must always resolve from the root (`google.protobuf`)
    pub well_known_package: String,
    /// Import directories relocated under the unified tree
    pub import_roots: Vec<String>,
}

impl RewriteParams {
    pub fn from_config(config: &ProjectConfig) -> Self {
        Self {
            namespace: config.namespace().to_string(),
            legacy_packages: config.legacy_packages(),
            legacy_namespace: config.legacy_namespace().to_string(),
            well_known_package: config.well_known_package().to_string(),
            import_roots: config.import_roots(),
        }
    }

    /// Directory of the unified tree relative to the output base
    fn namespace_dir(&self) -> String {
        self.namespace.replace('.', "/")
    }
}

impl Default for RewriteParams {
    fn default() -> Self {
        Self::from_config(&ProjectConfig::default())
    }
}

fn alternation(items: &[String]) -> String {
    items
        .iter()
        .map(|item| regex::escape(item))
        .collect::<Vec<_>>()
        .join("|")
}

/// Ordered rule list. Rules are not commutative.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<RewriteRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// The standard rules, in application order:
    ///
    /// 1. `package x;` gains the namespace prefix
    /// 2. bare legacy package references gain the namespace prefix
    /// 3. `(validate.rules)` / `(validate.required)` options point into the namespace
    /// 4. whitespace-preceded `.legacy.` references gain the namespace prefix
    /// 5. imports from allow-listed directories move under the unified tree
    /// 6. the well-known package is forced to full qualification
    pub fn standard(params: &RewriteParams) -> BuildResult<Self> {
        let ns = &params.namespace;
        let mut set = Self::new();

        set.push(RewriteRule::new(r"^package ", format!("package {ns}."))?);

        if !params.legacy_packages.is_empty() {
            set.push(RewriteRule::new(
                &format!(r"\b({})\.", alternation(&params.legacy_packages)),
                format!("{ns}.${{1}}."),
            )?);
        }

        set.push(RewriteRule::new(
            r"\(validate\.(rules|required)\)",
            format!("(.{ns}.validate.${{1}})"),
        )?);

        let legacy = &params.legacy_namespace;
        set.push(RewriteRule::new(
            &format!(r"(\s+)\.{}\.", regex::escape(legacy)),
            format!("${{1}}.{ns}.{legacy}."),
        )?);

        if !params.import_roots.is_empty() {
            set.push(RewriteRule::new(
                &format!(
                    r#"^import (public )?"({})/"#,
                    alternation(&params.import_roots)
                ),
                format!(r#"import ${{1}}"{}/${{2}}/"#, params.namespace_dir()),
            )?);
        }

        let well_known = &params.well_known_package;
        set.push(RewriteRule::new(
            &format!(r"([^\.]){}\.", regex::escape(well_known)),
            format!("${{1}}.{well_known}."),
        )?);

        Ok(set)
    }

    /// Standard rules followed by the configured extra rules
    pub fn from_config(config: &ProjectConfig) -> BuildResult<Self> {
        let mut set = Self::standard(&RewriteParams::from_config(config))?;
        for rule in config.extra_rules() {
            set.push(RewriteRule::new(&rule.pattern, rule.replacement.clone())?);
        }
        Ok(set)
    }

    pub fn push(&mut self, rule: RewriteRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[RewriteRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Fold every rule, in order, over one line
    pub fn rewrite_line(&self, line: &str) -> String {
        self.rules
            .iter()
            .fold(line.to_string(), |acc, rule| rule.apply(&acc).into_owned())
    }

    /// Rewrite a whole file, line by line. Line terminators are preserved.
    pub fn rewrite_text(&self, text: &str) -> String {
        text.split_inclusive('\n')
            .map(|line| self.rewrite_line(line))
            .collect()
    }
}

/// Result of rewriting one source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenFile {
    pub input: PathBuf,
    pub output: PathBuf,
    pub outcome: WriteOutcome,
}

/// Materializes selected sources into the unified tree
#[derive(Debug, Clone)]
pub struct RewriteEngine {
    rules: RuleSet,
    unified_tree: PathBuf,
}

impl RewriteEngine {
    pub fn new(rules: RuleSet, unified_tree: impl Into<PathBuf>) -> Self {
        Self {
            rules,
            unified_tree: unified_tree.into(),
        }
    }

    /// Output location: the root-relative path re-anchored at the unified tree
    pub fn output_path(&self, source: &SourceFile) -> PathBuf {
        self.unified_tree.join(&source.relative)
    }

    /// Rewrite one file into the unified tree
    pub fn rewrite_file(&self, source: &SourceFile) -> BuildResult<RewrittenFile> {
        let text =
            fs::read_to_string(&source.input).map_err(|e| BuildError::io(&source.input, e))?;
        let output = self.output_path(source);
        let outcome = write_if_changed(&output, self.rules.rewrite_text(&text).as_bytes())?;

        match outcome {
            WriteOutcome::Written => tracing::info!("writing {}", output.display()),
            WriteOutcome::Unchanged => tracing::debug!("unchanged {}", output.display()),
        }

        Ok(RewrittenFile {
            input: source.input.clone(),
            output,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn standard() -> RuleSet {
        RuleSet::standard(&RewriteParams::default()).unwrap()
    }

    #[test]
    fn test_standard_rule_count() {
        assert_eq!(standard().len(), 6);
    }

    #[test]
    fn test_package_declaration() {
        assert_eq!(
            standard().rewrite_line("package envoy.config.core.v3;\n"),
            "package envoyproto.envoy.config.core.v3;\n"
        );
    }

    #[test]
    fn test_package_keyword_only_at_line_start() {
        assert_eq!(
            standard().rewrite_line("// see package foo\n"),
            "// see package foo\n"
        );
    }

    #[test]
    fn test_legacy_package_reference() {
        assert_eq!(
            standard().rewrite_line("  xds.core.v3.ResourceLocator locator = 1;\n"),
            "  envoyproto.xds.core.v3.ResourceLocator locator = 1;\n"
        );
        assert_eq!(
            standard().rewrite_line("option (udpa.annotations.file_status).package_version_status = ACTIVE;\n"),
            "option (envoyproto.udpa.annotations.file_status).package_version_status = ACTIVE;\n"
        );
    }

    #[test]
    fn test_legacy_package_needs_word_boundary() {
        assert_eq!(
            standard().rewrite_line("  myxds.Thing t = 1;\n"),
            "  myxds.Thing t = 1;\n"
        );
    }

    #[test]
    fn test_validate_annotation() {
        assert_eq!(
            standard().rewrite_line("  string name = 1 [(validate.rules).string = {min_len: 1}];\n"),
            "  string name = 1 [(.envoyproto.validate.rules).string = {min_len: 1}];\n"
        );
        assert_eq!(
            standard().rewrite_line("  oneof x { option (validate.required) = true; }\n"),
            "  oneof x { option (.envoyproto.validate.required) = true; }\n"
        );
    }

    #[test]
    fn test_fully_qualified_legacy_reference() {
        assert_eq!(
            standard().rewrite_line("  .envoy.config.core.v3.Address address = 1;\n"),
            "  .envoyproto.envoy.config.core.v3.Address address = 1;\n"
        );
    }

    #[test]
    fn test_import_relocation() {
        let rules = standard();
        assert_eq!(
            rules.rewrite_line("import \"envoy/config/core/v3/base.proto\";\n"),
            "import \"envoyproto/envoy/config/core/v3/base.proto\";\n"
        );
        assert_eq!(
            rules.rewrite_line("import public \"google/api/annotations.proto\";\n"),
            "import public \"envoyproto/google/api/annotations.proto\";\n"
        );
        assert_eq!(
            rules.rewrite_line("import \"io/prometheus/client/metrics.proto\";\n"),
            "import \"envoyproto/io/prometheus/client/metrics.proto\";\n"
        );
    }

    #[test]
    fn test_import_outside_allow_list_untouched() {
        let rules = standard();
        assert_eq!(
            rules.rewrite_line("import \"google/protobuf/any.proto\";\n"),
            "import \"google/protobuf/any.proto\";\n"
        );
        assert_eq!(
            rules.rewrite_line("import \"google/type/date.proto\";\n"),
            "import \"google/type/date.proto\";\n"
        );
    }

    #[test]
    fn test_well_known_package_forced_absolute() {
        let rules = standard();
        assert_eq!(
            rules.rewrite_line("  google.protobuf.Duration timeout = 1;\n"),
            "  .google.protobuf.Duration timeout = 1;\n"
        );
        assert_eq!(
            rules.rewrite_line("  .google.protobuf.Duration timeout = 1;\n"),
            "  .google.protobuf.Duration timeout = 1;\n"
        );
    }

    #[test]
    fn test_rules_compose_on_one_line() {
        assert_eq!(
            standard().rewrite_line(
                "  map<string, google.protobuf.Any> m = 1 [(validate.rules).map = {min_pairs: 1}];\n"
            ),
            "  map<string, .google.protobuf.Any> m = 1 [(.envoyproto.validate.rules).map = {min_pairs: 1}];\n"
        );
    }

    #[test]
    fn test_rewrite_text_preserves_line_endings() {
        let text = "syntax = \"proto3\";\n\npackage validate;\nmessage M {}";
        assert_eq!(
            standard().rewrite_text(text),
            "syntax = \"proto3\";\n\npackage envoyproto.validate;\nmessage M {}"
        );
    }

    #[test]
    fn test_custom_namespace_and_import_dir() {
        let params = RewriteParams {
            namespace: "acme.proto".to_string(),
            ..RewriteParams::default()
        };
        let rules = RuleSet::standard(&params).unwrap();

        assert_eq!(
            rules.rewrite_line("package envoy.type.v3;\n"),
            "package acme.proto.envoy.type.v3;\n"
        );
        assert_eq!(
            rules.rewrite_line("import \"xds/core/v3/authority.proto\";\n"),
            "import \"acme/proto/xds/core/v3/authority.proto\";\n"
        );
    }

    #[test]
    fn test_extra_rules_run_after_standard() {
        let mut rules = standard();
        // Sees the already-prefixed package name
        rules.push(RewriteRule::new(r"^package envoyproto\.", "package renamed.").unwrap());

        assert_eq!(
            rules.rewrite_line("package envoy.api;\n"),
            "package renamed.envoy.api;\n"
        );
    }

    #[test]
    fn test_invalid_rule_reports_pattern() {
        let err = RewriteRule::new("(unclosed", "x").unwrap_err();
        assert!(matches!(err, BuildError::InvalidRule { ref pattern, .. } if pattern == "(unclosed"));
    }
}
