//! Configuration loading and validation tests

use pretty_assertions::assert_eq;
use protounify_config::{ConfigLoader, ProjectConfig, RootConfig, CONFIG_FILE_NAME};
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn create_config_file(dir: &Path, content: &str) -> PathBuf {
    let config_path = dir.join(CONFIG_FILE_NAME);
    fs::write(&config_path, content).unwrap();
    config_path
}

fn load(dir: &Path) -> protounify_config::ConfigResult<protounify_config::Config> {
    ConfigLoader::new().without_env().load_from_directory(dir)
}

// ============================================================================
// Config Loading Tests
// ============================================================================

#[test]
fn test_load_when_no_config_exists() {
    let temp_dir = TempDir::new().unwrap();

    let config = load(temp_dir.path()).unwrap();

    assert!(!config.found);
    assert_eq!(config.project_root, temp_dir.path());
    assert_eq!(config.project.namespace(), "envoyproto");
    assert_eq!(config.upstream_dir(), temp_dir.path().join("protobuf-libs"));
}

#[test]
fn test_load_with_empty_config() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "");

    let config = load(temp_dir.path()).unwrap();

    // Empty config is valid (all sections optional)
    assert!(config.found);
    assert_eq!(config.project, ProjectConfig::default());
}

#[test]
fn test_load_from_subdirectory_finds_parent() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "[package]\nnamespace = \"parentproto\"\n");

    let nested = temp_dir.path().join("sub1").join("sub2");
    fs::create_dir_all(&nested).unwrap();

    let config = load(&nested).unwrap();

    assert_eq!(config.project.namespace(), "parentproto");
    assert_eq!(config.project_root, temp_dir.path());
}

#[test]
fn test_load_from_specific_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = create_config_file(
        temp_dir.path(),
        r#"
[sources]
upstream_dir = "third_party"

[[sources.roots]]
path = "googleapis"
subtrees = ["google/api", "google/rpc"]
"#,
    );

    let config = ConfigLoader::new()
        .without_env()
        .load_from_file(&config_path)
        .unwrap();

    assert_eq!(config.upstream_dir(), temp_dir.path().join("third_party"));
    assert_eq!(
        config.project.roots(),
        vec![RootConfig::with_subtrees(
            "googleapis",
            ["google/api", "google/rpc"]
        )]
    );
}

#[test]
fn test_absolute_output_base_is_kept() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("elsewhere");
    create_config_file(
        temp_dir.path(),
        &format!("[output]\nbase = {:?}\n", out.display().to_string()),
    );

    let config = load(temp_dir.path()).unwrap();

    assert_eq!(config.output_base(), out);
}

// ============================================================================
// Invalid Config Tests
// ============================================================================

#[rstest]
#[case::broken_toml("[package\nnamespace = \"broken\n")]
#[case::unknown_field("[package]\nnamespace = \"x\"\nversion = \"1.0\"\n")]
#[case::unknown_section("[formatting]\nindent = 4\n")]
#[case::bad_namespace("[package]\nnamespace = \"not a namespace\"\n")]
#[case::empty_subtrees("[[sources.roots]]\npath = \"envoy\"\nsubtrees = []\n")]
#[case::absolute_root("[[sources.roots]]\npath = \"/abs/envoy\"\n")]
#[case::empty_suffix("[compiler]\nartifact_suffix = \"\"\n")]
#[case::empty_rule_pattern("[[rewrite.rules]]\npattern = \"\"\nreplacement = \"x\"\n")]
fn test_invalid_config_rejected(#[case] content: &str) {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), content);

    assert!(load(temp_dir.path()).is_err());
}

#[test]
fn test_missing_file_reports_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let result = ProjectConfig::load_from_file(&temp_dir.path().join(CONFIG_FILE_NAME));

    assert!(matches!(
        result,
        Err(protounify_config::ConfigError::NotFound(_))
    ));
}

// ============================================================================
// Rewrite Parameters
// ============================================================================

#[test]
fn test_rewrite_overrides() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(
        temp_dir.path(),
        r#"
[rewrite]
legacy_namespace = "istio"
well_known_package = "google.type"
import_roots = ["istio", "google/type"]

[[rewrite.rules]]
pattern = '^option go_package = ".*";'
replacement = ""

[[rewrite.rules]]
pattern = "Legacy"
replacement = "Modern"
"#,
    );

    let config = load(temp_dir.path()).unwrap();
    let project = &config.project;

    assert_eq!(project.legacy_namespace(), "istio");
    assert_eq!(project.well_known_package(), "google.type");
    assert_eq!(
        project.import_roots(),
        vec!["istio".to_string(), "google/type".to_string()]
    );
    let patterns: Vec<&str> = project
        .extra_rules()
        .iter()
        .map(|r| r.pattern.as_str())
        .collect();
    assert_eq!(patterns, vec![r#"^option go_package = ".*";"#, "Legacy"]);
    // Untouched keys keep their defaults
    assert_eq!(
        project.legacy_packages(),
        vec!["udpa".to_string(), "xds".to_string()]
    );
}
