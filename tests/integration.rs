// Integration tests for the testmine CLI surface.
//
// These tests use assert_cmd to invoke the binary and verify
// exit codes and argument validation.

use assert_cmd::Command;
use predicates::prelude::*;

/// Helper to build a Command for the testmine binary.
fn testmine() -> Command {
    Command::cargo_bin("testmine").expect("binary should exist")
}

#[test]
fn cli_version_flag() {
    testmine()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("testmine"));
}

#[test]
fn cli_help_flag() {
    testmine()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Mine Python test functions"));
}

#[test]
fn collect_requires_repo_id() {
    testmine()
        .arg("collect")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn inspect_requires_path() {
    testmine()
        .arg("inspect")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn collect_rejects_unknown_archive_format() {
    testmine()
        .args(["collect", "owner/repo", "--archive-format", "rar"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn quiet_and_verbose_conflict() {
    testmine()
        .args(["-q", "-v", "inspect", "."])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}
