//! End-to-end tests for the `protounify` binary
//!
//! A shell script stands in for protoc, so these tests run on unix only.
#![cfg(unix)]

use predicates::prelude::*;
use pretty_assertions::assert_eq;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::TempDir;

/// Fake protoc: touches `<stem>_pb2.py` beside the target file (third argument)
const FAKE_PROTOC: &str = "#!/bin/sh\nf=\"$3\"\nprintf '# generated\\n' > \"${f%.proto}_pb2.py\"\n";

const FAILING_PROTOC: &str = "#!/bin/sh\necho \"broken schema: $3\" >&2\nexit 3\n";

fn write_executable(path: &Path, script: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, script).unwrap();
    let mut perms = fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).unwrap();
}

fn create_project(protoc_script: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    fs::write(
        root.join("protounify.toml"),
        r#"
[[sources.roots]]
path = "alpha"

[[sources.roots]]
path = "beta"
subtrees = ["lib"]

[compiler]
protoc = "tools/protoc"
"#,
    )
    .unwrap();
    write_executable(&root.join("tools/protoc"), protoc_script);

    for (rel, content) in [
        ("protobuf-libs/alpha/x.proto", "package alpha;\n"),
        ("protobuf-libs/alpha/sub/y.proto", "package alpha.sub;\n"),
        ("protobuf-libs/beta/lib/z.proto", "package beta.lib;\n"),
        ("protobuf-libs/beta/other/w.proto", "package beta.other;\n"),
    ] {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    temp
}

fn protounify(dir: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("protounify");
    cmd.current_dir(dir)
        .env_remove("PROTOUNIFY_PROTOC")
        .env_remove("PROTOUNIFY_CONTENT_HASHES")
        .env("RUST_LOG", "info");
    cmd
}

#[test]
fn test_build_succeeds() {
    let project = create_project(FAKE_PROTOC);
    let tree = project.path().join("envoyproto");

    protounify(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Build succeeded"))
        .stdout(predicate::str::contains("Compiled:  3 of 3"));

    assert!(tree.join("x_pb2.py").is_file());
    assert!(tree.join("sub/y_pb2.py").is_file());
    assert!(tree.join("lib/z_pb2.py").is_file());
    assert!(!tree.join("other").exists());
    assert_eq!(
        fs::read_to_string(tree.join("sub/__init__.py")).unwrap(),
        "import envoyproto.sub.y_pb2 as y\n\n__all__ = ['y']\n"
    );
}

#[test]
fn test_logs_writes_and_compiler_invocations() {
    let project = create_project(FAKE_PROTOC);

    protounify(project.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("writing"))
        .stderr(predicate::str::contains("--python_out="));
}

#[test]
fn test_second_run_compiles_nothing() {
    let project = create_project(FAKE_PROTOC);
    let manifest = project.path().join("envoyproto/__init__.py");

    protounify(project.path()).assert().success();
    let before = fs::read_to_string(&manifest).unwrap();

    protounify(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Compiled:  0 of 3 (3 fresh)"))
        .stderr(predicate::str::contains("--python_out=").not());

    assert_eq!(before, fs::read_to_string(&manifest).unwrap());
}

#[test]
fn test_runs_from_subdirectory() {
    let project = create_project(FAKE_PROTOC);
    let nested = project.path().join("protobuf-libs/alpha");

    protounify(&nested).assert().success();

    assert!(project.path().join("envoyproto/x_pb2.py").is_file());
}

#[test]
fn test_compiler_failure_exits_nonzero() {
    let project = create_project(FAILING_PROTOC);

    protounify(project.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Build failed"))
        .stderr(predicate::str::contains("broken schema"));

    assert!(!project.path().join("envoyproto/__init__.py").exists());
}

#[test]
fn test_missing_namespace_root_exits_nonzero() {
    let project = create_project(FAKE_PROTOC);
    fs::remove_dir_all(project.path().join("protobuf-libs/beta")).unwrap();

    protounify(project.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("beta"));
}

#[test]
fn test_invalid_config_exits_nonzero() {
    let project = create_project(FAKE_PROTOC);
    fs::write(project.path().join("protounify.toml"), "[sources]\nbogus = 1\n").unwrap();

    protounify(project.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn test_env_overrides_compiler() {
    let project = create_project(FAILING_PROTOC);
    write_executable(&project.path().join("tools/good-protoc"), FAKE_PROTOC);

    protounify(project.path())
        .env("PROTOUNIFY_PROTOC", project.path().join("tools/good-protoc"))
        .assert()
        .success();
}
