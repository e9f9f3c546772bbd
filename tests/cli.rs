//! End-to-end tests driving the overalls binary against a fake `go`

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const FAKE_GO: &str = include_str!("fixtures/fake_go.sh");

struct Fixture {
    project: TempDir,
    _bin: TempDir,
    go: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let bin = TempDir::new().unwrap();
        let go = bin.path().join("go");
        fs::write(&go, FAKE_GO).unwrap();
        fs::set_permissions(&go, fs::Permissions::from_mode(0o755)).unwrap();
        Self {
            project: TempDir::new().unwrap(),
            _bin: bin,
            go,
        }
    }

    fn root(&self) -> &Path {
        self.project.path()
    }

    fn touch(&self, rel: &str) {
        let path = self.root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "package x\n").unwrap();
    }

    fn overalls(&self) -> Command {
        let mut cmd = Command::cargo_bin("overalls").unwrap();
        cmd.arg(format!("--project={}", self.root().display()))
            .arg(format!("--go={}", self.go.display()))
            .arg("--no-color")
            .env_remove("RUST_LOG");
        cmd
    }

    fn report(&self) -> PathBuf {
        self.root().join("overalls.coverprofile")
    }
}

#[test]
fn merges_every_package_and_skips_vendor() {
    let fx = Fixture::new();
    fx.touch("A/foo_test.go");
    fx.touch("B/C/bar_test.go");
    fx.touch("vendor/baz_test.go");

    fx.overalls()
        .assert()
        .success()
        .stdout(predicate::str::contains("Test package: ./A"))
        .stdout(predicate::str::contains("Test package: ./B/C"))
        .stdout(predicate::str::contains("./vendor").not());

    let merged = fs::read_to_string(fx.report()).unwrap();
    let mut lines: Vec<&str> = merged.lines().collect();
    assert_eq!(lines.remove(0), "mode: count");
    lines.sort();
    assert_eq!(lines, vec!["./A/x.go:1.1,2.2 1 1", "./B/C/x.go:1.1,2.2 1 1"]);
}

#[test]
fn failing_package_aborts_without_report() {
    let fx = Fixture::new();
    fx.touch("good/g_test.go");
    fx.touch("bad/b_test.go");
    fx.touch("bad/FAIL");

    fx.overalls()
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("ERROR:"))
        .stderr(predicate::str::contains("./bad"));

    assert!(!fx.report().exists());
}

#[test]
fn empty_project_gets_header_only() {
    let fx = Fixture::new();
    fx.touch("docs/README.go");

    fx.overalls().arg("--covermode=set").assert().success();
    assert_eq!(fs::read_to_string(fx.report()).unwrap(), "mode: set\n");
}

#[test]
fn pass_through_args_follow_test() {
    let fx = Fixture::new();
    fx.touch("pkg/p_test.go");

    fx.overalls()
        .args(["--", "-race", "-short"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "args: test -race -short -covermode=count -coverprofile=profile.coverprofile",
        ));
}

#[test]
fn config_file_supplies_defaults() {
    let fx = Fixture::new();
    fx.touch("pkg/p_test.go");
    fx.touch("gen/g_test.go");
    fs::write(
        fx.root().join("overalls.toml"),
        "[overalls]\ncovermode = \"atomic\"\nignore = [\"gen\"]\nconcurrency = 1\n",
    )
    .unwrap();

    fx.overalls().assert().success();
    let merged = fs::read_to_string(fx.report()).unwrap();
    assert_eq!(merged, "mode: atomic\n./pkg/x.go:1.1,2.2 1 1\n");
}

#[test]
fn command_line_overrides_config_file() {
    let fx = Fixture::new();
    fx.touch("pkg/p_test.go");
    fs::write(fx.root().join("overalls.toml"), "[overalls]\ncovermode = \"atomic\"\n").unwrap();

    fx.overalls().arg("--covermode=set").assert().success();
    assert!(fs::read_to_string(fx.report())
        .unwrap()
        .starts_with("mode: set\n"));
}

#[test]
fn invalid_covermode_is_rejected_before_running() {
    let fx = Fixture::new();
    fx.touch("pkg/p_test.go");

    fx.overalls()
        .arg("--covermode=lines")
        .assert()
        .failure()
        .stderr(predicate::str::contains("lines"));
    assert!(!fx.report().exists());
}

#[test]
fn missing_go_tool_is_reported() {
    let fx = Fixture::new();
    fx.touch("pkg/p_test.go");

    let mut cmd = Command::cargo_bin("overalls").unwrap();
    cmd.arg(format!("--project={}", fx.root().display()))
        .arg("--go=/definitely/not/here/go")
        .arg("--no-color")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing tool"));
}

#[test]
fn missing_project_is_reported() {
    let fx = Fixture::new();
    let missing = fx.root().join("nope");

    let mut cmd = Command::cargo_bin("overalls").unwrap();
    cmd.arg(format!("--project={}", missing.display()))
        .arg("--no-color")
        .env_remove("GOPATH")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid project path"));
}
