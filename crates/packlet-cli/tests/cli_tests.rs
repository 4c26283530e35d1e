//! End-to-end tests for the packlet binary.
//!
//! These spawn the real binary in a temporary project and assert on exit
//! codes, stderr, and the files written to dist.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn packlet() -> Command {
    Command::cargo_bin("packlet").unwrap()
}

#[test]
fn help_lists_the_build_command() {
    packlet()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"));
}

#[test]
fn build_in_a_minimal_project_emits_artifacts() {
    let project = TempDir::new().unwrap();
    write_file(
        &project.path().join("package.json"),
        r#"{"name":"demo-pkg","version":"0.0.0"}"#,
    );
    write_file(
        &project.path().join("src/index.ts"),
        "export const answer: number = 42;\n",
    );

    packlet()
        .current_dir(project.path())
        .args(["build", "--formats", "esm"])
        .assert()
        .success()
        .stderr(predicate::str::contains("esm"));

    assert!(project.path().join("dist/demo-pkg.esm.js").is_file());
    assert!(project.path().join("dist/demo-pkg.esm.js.map").is_file());
    assert!(project.path().join("dist/index.d.ts").is_file());
}

#[test]
fn out_dir_flag_moves_the_artifact_set() {
    let project = TempDir::new().unwrap();
    write_file(
        &project.path().join("package.json"),
        r#"{"name":"demo-pkg","version":"0.0.0"}"#,
    );
    write_file(
        &project.path().join("src/index.ts"),
        "export const answer: number = 42;\n",
    );

    packlet()
        .current_dir(project.path())
        .args(["build", "--formats", "esm", "--out-dir", "build"])
        .assert()
        .success();

    assert!(project.path().join("build/demo-pkg.esm.js").is_file());
    assert!(!project.path().join("dist").exists());
}

#[test]
fn build_without_a_name_fails_with_guidance() {
    let project = TempDir::new().unwrap();
    write_file(
        &project.path().join("src/index.ts"),
        "export const answer = 42;\n",
    );

    packlet()
        .current_dir(project.path())
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--name"));
}

#[test]
fn name_flag_replaces_the_manifest() {
    let project = TempDir::new().unwrap();
    write_file(
        &project.path().join("src/index.ts"),
        "export const answer: number = 42;\n",
    );

    packlet()
        .current_dir(project.path())
        .args(["build", "--formats", "esm", "--name", "standalone"])
        .assert()
        .success();

    assert!(project.path().join("dist/standalone.esm.js").is_file());
}

#[test]
fn broken_source_exits_nonzero() {
    let project = TempDir::new().unwrap();
    write_file(
        &project.path().join("package.json"),
        r#"{"name":"demo-pkg","version":"0.0.0"}"#,
    );
    write_file(
        &project.path().join("src/index.ts"),
        "export const = broken;\n",
    );

    packlet()
        .current_dir(project.path())
        .args(["build", "--formats", "esm"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed"));
}
