use assert_cmd::Command;
use flate2::write::GzEncoder;
use flate2::Compression;
use predicates::prelude::*;
use std::fs::{self, File};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("temp dir should be created"),
        }
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    fn repo_root(&self) -> PathBuf {
        self.path("repos")
    }

    fn test_root(&self) -> PathBuf {
        self.path("tests")
    }

    fn archive_root(&self) -> PathBuf {
        self.path("archives")
    }

    fn write(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        fs::create_dir_all(path.parent().expect("file should have a parent"))
            .expect("parent should be created");
        fs::write(path, content).expect("file should write");
    }

    fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("testmine").expect("binary should compile");
        cmd.env("HOME", self.dir.path()).env_remove("RUST_LOG");
        cmd
    }

    fn collect(&self, repo_id: &str) -> Command {
        let mut cmd = self.command();
        cmd.arg("collect")
            .arg(repo_id)
            .arg("--repo-root")
            .arg(self.repo_root())
            .arg("--test-root")
            .arg(self.test_root())
            .arg("--archive-root")
            .arg(self.archive_root());
        cmd
    }
}

fn write_tar_gz(path: &Path, files: &[(&str, &str)]) {
    fs::create_dir_all(path.parent().expect("archive should have a parent"))
        .expect("archive dir should be created");
    let file = File::create(path).expect("archive should be created");
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        builder
            .append_data(&mut header, name, content.as_bytes())
            .expect("entry should append");
    }
    builder
        .into_inner()
        .expect("tar should finish")
        .finish()
        .expect("gzip should finish");
}

#[test]
fn collect_local_tree_writes_relative_identifiers() {
    let ws = Workspace::new();
    ws.write(
        "repos/owner#repo/pkg/tests/test_math.py",
        r#"
import unittest

class MathTest(unittest.TestCase):
    def test_add(self):
        self.assertEqual(2, 1 + 1)

def test_sub():
    assert 1 - 1 == 0

def test_no_assert():
    pass
"#,
    );

    ws.collect("owner/repo")
        .arg("--no-download")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Loaded 1 repos to be processed"))
        .stdout(predicate::str::contains("Collected 2 tests from 1 files in total"));

    let output = fs::read_to_string(ws.path("tests/owner#repo.txt")).expect("output should exist");
    assert_eq!(
        output,
        "pkg/tests/test_math.py::MathTest.test_add\npkg/tests/test_math.py::test_sub\n"
    );
    assert!(
        ws.path("repos/owner#repo").is_dir(),
        "pre-existing tree must not be removed"
    );
}

#[test]
fn collect_twice_skips_and_keeps_output() {
    let ws = Workspace::new();
    ws.write("repos/owner#repo/test_a.py", "def test_a():\n    assert 1\n");

    ws.collect("owner/repo").arg("--no-download").assert().code(0);
    let first = fs::read(ws.path("tests/owner#repo.txt")).expect("output should exist");

    ws.collect("owner/repo")
        .arg("--no-download")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Processed 1 repos with 1 skipped"));
    let second = fs::read(ws.path("tests/owner#repo.txt")).expect("output should exist");
    assert_eq!(first, second);
}

#[test]
fn collect_missing_tree_without_download_is_not_found() {
    let ws = Workspace::new();

    ws.collect("owner/absent")
        .arg("--no-download")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("1 not found"));

    assert!(!ws.path("tests/owner#absent.txt").exists());
}

#[test]
fn collect_extracts_cached_archive_and_cleans_up() {
    let ws = Workspace::new();
    let archive = ws.archive_root().join("owner#repo.tar.gz");
    write_tar_gz(
        &archive,
        &[("owner-repo-1a2b3c/test_foo.py", "def test_x(): assert True\n")],
    );

    ws.collect("owner/repo")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Collected 1 tests from 1 files in total"));

    assert_eq!(
        fs::read_to_string(ws.path("tests/owner#repo.txt")).expect("output should exist"),
        "test_foo.py::test_x\n"
    );
    assert!(!ws.path("repos/owner#repo").exists());
    assert!(archive.is_file(), "archive stays cached");
}

#[test]
fn collect_malformed_archive_reports_extract_failed() {
    let ws = Workspace::new();
    write_tar_gz(
        &ws.archive_root().join("owner#repo.tar.gz"),
        &[("first/test_a.py", ""), ("second/test_b.py", "")],
    );

    ws.collect("owner/repo")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("1 extract failed"));

    assert!(!ws.path("repos/owner#repo").exists());
    let leftovers = fs::read_dir(ws.repo_root())
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(leftovers, 0);
}

#[test]
fn collect_reads_id_list_with_limit_and_json_summary() {
    let ws = Workspace::new();
    ws.write("repos/a#one/test_a.py", "def test_a():\n    assert 1\n");
    ws.write("repos/b#two/test_b.py", "def test_b():\n    assert 1\n");
    ws.write("ids.txt", "a/one\n\nb/two\nc/three\n");

    let assert = ws
        .collect(&ws.path("ids.txt").to_string_lossy())
        .args(["--no-download", "--limit", "2", "-j", "2", "--format", "json"])
        .assert()
        .code(0);

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("stdout is utf-8");
    let json_start = stdout.find('{').expect("json summary should be printed");
    let summary: serde_json::Value =
        serde_json::from_str(stdout[json_start..].trim()).expect("summary should be json");
    assert_eq!(summary["requested"], 2);
    assert_eq!(summary["statuses"]["success"], 2);
    assert_eq!(summary["total_tests"], 2);
    assert!(!ws.path("tests/c#three.txt").exists());
}

#[test]
fn collect_reports_timed_out_repos_in_a_pool() {
    let ws = Workspace::new();
    ws.write("repos/a#fast/test_a.py", "def test_a():\n    assert 1\n");
    ws.write("ids.txt", "a/fast\nb/slow\n");
    // Accepts connections at the socket level but never answers.
    let silent = TcpListener::bind("127.0.0.1:0").expect("listener should bind");
    let port = silent.local_addr().expect("listener has an address").port();
    ws.write(
        "testmine.toml",
        &format!(
            "[fetch]\napi_base = \"http://127.0.0.1:{port}\"\nconnect_timeout = 2\ntransfer_timeout = 3\n"
        ),
    );

    ws.collect(&ws.path("ids.txt").to_string_lossy())
        .arg("--config")
        .arg(ws.path("testmine.toml"))
        .args(["--timeout", "1", "-j", "2"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("1 repos timeout"))
        .stdout(predicate::str::contains("Processed 1 repos with 0 skipped"))
        .stdout(predicate::str::contains("Collected 1 tests from 1 files in total"));

    assert!(ws.path("tests/a#fast.txt").is_file());
    assert!(!ws.path("tests/b#slow.txt").exists());
    assert!(!ws.path("repos/b#slow").exists());
    drop(silent);
}

#[test]
fn collect_rejects_unknown_config_keys() {
    let ws = Workspace::new();
    ws.write("testmine.toml", "repo_rot = \"typo\"\n");

    ws.collect("owner/repo")
        .arg("--config")
        .arg(ws.path("testmine.toml"))
        .assert()
        .code(3)
        .stderr(predicate::str::contains("config parse error"));
}

#[test]
fn collect_rejects_malformed_single_id() {
    let ws = Workspace::new();

    ws.collect("not-a-repo-id")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("invalid repository id"));
}

#[test]
fn inspect_directory_prints_relative_identifiers() {
    let ws = Workspace::new();
    ws.write(
        "project/tests/test_cls.py",
        "class TestThing:\n    @staticmethod\n    def check():\n        assert True\n",
    );
    ws.write("project/tests/test_broken.py", "def test_x(:\n");

    ws.command()
        .arg("inspect")
        .arg(ws.path("project"))
        .assert()
        .code(0)
        .stdout(predicate::str::diff("tests/test_cls.py::TestThing.check\n"));
}

#[test]
fn inspect_reports_unparsable_file() {
    let ws = Workspace::new();
    ws.write("test_broken.py", "def test_x(:\n");

    ws.command()
        .arg("inspect")
        .arg(ws.path("test_broken.py"))
        .assert()
        .code(3)
        .stderr(predicate::str::contains("syntax error"));
}
