//! Integration tests for the bw binary.
//!
//! These tests exercise the full CLI against real git repositories.

use std::path::Path;
use std::process::Command as StdCommand;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A repository with master and develop (one commit each past the root),
/// plus a layout definition.
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new(layout: &str) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let sandbox = Self { dir };
        sandbox.git(&["init", "-b", "master"]);
        sandbox.git(&["config", "user.email", "test@example.com"]);
        sandbox.git(&["config", "user.name", "Test User"]);
        sandbox.commit("README.md", "Initial commit");
        sandbox.git(&["checkout", "-b", "develop"]);
        sandbox.commit("develop.txt", "Develop work");
        sandbox.git(&["checkout", "master"]);
        sandbox.write_layout(layout);
        sandbox
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn git(&self, args: &[&str]) -> String {
        let output = StdCommand::new("git")
            .args(args)
            .current_dir(self.path())
            .output()
            .expect("git command failed");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    fn commit(&self, file: &str, message: &str) {
        std::fs::write(self.path().join(file), message).unwrap();
        self.git(&["add", file]);
        self.git(&["commit", "-m", message]);
    }

    fn layout_path(&self) -> std::path::PathBuf {
        self.path().join(".git/branchwise/layout")
    }

    fn write_layout(&self, layout: &str) {
        let path = self.layout_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, layout).unwrap();
    }

    fn add_bare_remote(&self, name: &str) -> TempDir {
        let remote = TempDir::new().unwrap();
        let status = StdCommand::new("git")
            .args(["init", "--bare"])
            .current_dir(remote.path())
            .status()
            .unwrap();
        assert!(status.success());
        self.git(&["remote", "add", name, &remote.path().to_string_lossy()]);
        remote
    }

    fn bw(&self) -> Command {
        let mut cmd = bw();
        cmd.arg("--cwd").arg(self.path());
        cmd
    }
}

/// The binary with the global config pointed away from the user's home.
fn bw() -> Command {
    let mut cmd = Command::cargo_bin("bw").unwrap();
    cmd.env("BRANCHWISE_CONFIG", "/nonexistent/branchwise.toml")
        .env_remove("BRANCHWISE_LOG");
    cmd
}

#[test]
fn version_and_help() {
    bw().arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("bw"));
    bw().arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("traverse"));
}

#[test]
fn outside_a_repository_fails() {
    let dir = TempDir::new().unwrap();
    bw().arg("--cwd")
        .arg(dir.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open repository"));
}

#[test]
fn missing_layout_is_explained() {
    let sandbox = Sandbox::new("");
    std::fs::remove_file(sandbox.layout_path()).unwrap();
    sandbox
        .bw()
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No branch layout found"));
}

#[test]
fn status_lists_tree() {
    let sandbox = Sandbox::new("master\n    develop\n");
    sandbox
        .bw()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("master\n  develop [in sync]"));

    sandbox.commit("master.txt", "Master work");
    sandbox
        .bw()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("develop [out of sync]"));
}

#[test]
fn status_json() {
    let sandbox = Sandbox::new("master\n    develop\n");
    let output = sandbox.bw().args(["status", "--json"]).output().unwrap();
    assert!(output.status.success());

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows[0]["branch"], "master");
    assert_eq!(rows[0]["parent"], serde_json::Value::Null);
    assert_eq!(rows[1]["branch"], "develop");
    assert_eq!(rows[1]["parent_status"], "InSync");
    assert_eq!(rows[1]["remote_status"], "NoRemotes");
}

#[test]
fn invalid_layout_reports_line() {
    let sandbox = Sandbox::new("master\n    develop frozen=yes\n");
    sandbox
        .bw()
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 2"));
}

#[test]
fn fork_point_prints_merge_base() {
    let sandbox = Sandbox::new("master\n    develop\n");
    let master = sandbox.git(&["rev-parse", "master"]);
    sandbox.commit("master.txt", "Master work");

    sandbox
        .bw()
        .args(["fork-point", "develop"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(master))
        .stdout(predicate::str::contains("source: merge-base"));

    sandbox
        .bw()
        .args(["fork-point", "master"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("has no parent"));
}

#[test]
fn log_lists_only_the_branch_commits() {
    let sandbox = Sandbox::new("master\n    child\n");
    let root = sandbox.git(&["rev-parse", "master"]);
    sandbox.git(&["checkout", "-b", "child"]);
    sandbox.commit("child1.txt", "First child commit");
    let first = sandbox.git(&["rev-parse", "HEAD"]);
    sandbox.commit("child2.txt", "Second child commit");
    let second = sandbox.git(&["rev-parse", "HEAD"]);

    for args in [&["log"][..], &["log", "child"], &["log", "refs/heads/child"]] {
        sandbox
            .bw()
            .args(args)
            .assert()
            .success()
            .stdout(predicate::str::contains(first.as_str()))
            .stdout(predicate::str::contains(second.as_str()))
            .stdout(predicate::str::contains(root.as_str()).not());
    }
}

#[test]
fn traverse_with_yes_rebases() {
    let sandbox = Sandbox::new("master\n    develop\n");
    sandbox.commit("master.txt", "Master work");

    sandbox
        .bw()
        .args(["--yes", "traverse"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Rebase develop onto master? (y, N, q, yq)"));

    sandbox.git(&["merge-base", "--is-ancestor", "master", "develop"]);
}

#[test]
fn traverse_without_answers_changes_nothing() {
    let sandbox = Sandbox::new("master\n    develop\n");
    sandbox.commit("master.txt", "Master work");
    let before = sandbox.git(&["rev-parse", "develop"]);

    sandbox
        .bw()
        .args(["--no-interactive", "traverse"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Traversal interrupted."));

    assert_eq!(sandbox.git(&["rev-parse", "develop"]), before);
}

#[test]
fn traverse_persists_slide_out() {
    let sandbox = Sandbox::new("master\n    develop\n        feature push=no\n");
    sandbox.git(&["checkout", "-b", "feature", "develop"]);
    sandbox.commit("feature.txt", "Feature work");
    sandbox.git(&["checkout", "master"]);
    sandbox.git(&["merge", "--ff-only", "develop"]);

    sandbox
        .bw()
        .args(["--yes", "traverse"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Slid out: develop"));

    let layout = std::fs::read_to_string(sandbox.layout_path()).unwrap();
    assert_eq!(layout, "master\n    feature push=no\n");
}

#[test]
fn pr_prep_without_remotes() {
    let sandbox = Sandbox::new("master\n    develop\n");
    sandbox
        .bw()
        .args(["pr-prep", "develop"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Could not create pull request - there are no remote repositories!",
        ));
}

#[test]
fn pr_prep_pushes_head_and_base() {
    let sandbox = Sandbox::new("master\n    develop\n");
    let _origin = sandbox.add_bare_remote("origin");

    sandbox
        .bw()
        .args(["--yes", "pr-prep", "develop"])
        .assert()
        .success()
        .stdout(predicate::str::contains("base: master"))
        .stdout(predicate::str::contains("remote: origin"))
        .stderr(predicate::str::contains("Push untracked branch develop to origin? (y, Q)"))
        .stderr(predicate::str::contains(
            "Warn: Base branch for this PR (master) is not found on remote, pushing...",
        ));

    assert_eq!(
        sandbox.git(&["rev-parse", "origin/develop"]),
        sandbox.git(&["rev-parse", "develop"])
    );
    assert_eq!(sandbox.git(&["rev-parse", "origin/master"]), sandbox.git(&["rev-parse", "master"]));
}

#[test]
fn remote_resolution_prefers_sole_remote() {
    let sandbox = Sandbox::new("master\n    develop\n");
    let _upstream = sandbox.add_bare_remote("upstream");
    sandbox
        .bw()
        .args(["remote", "develop"])
        .assert()
        .success()
        .stdout(predicate::str::contains("upstream (only remote)"));
}

#[test]
fn unattended_remote_choice_fails() {
    let sandbox = Sandbox::new("master\n    develop\n");
    let _first = sandbox.add_bare_remote("origin_1");
    let _second = sandbox.add_bare_remote("origin_2");

    sandbox
        .bw()
        .args(["--no-interactive", "remote", "develop"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "cannot choose a remote for branch develop among origin_1, origin_2",
        ));

    sandbox
        .bw()
        .args(["--no-interactive", "pr-prep", "develop"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not prepare pull request"))
        .stderr(predicate::str::contains("cannot choose a remote"));
}

#[test]
fn config_shows_defaults() {
    let sandbox = Sandbox::new("master\n");
    sandbox
        .bw()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("origin_policy = \"assume\""))
        .stdout(predicate::str::contains("fetch = false"));

    std::fs::write(
        sandbox.path().join(".git/branchwise/config.toml"),
        "fetch = true\n",
    )
    .unwrap();
    sandbox
        .bw()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("fetch = true"));
}
