// Integration tests for the buildmeta binary
use std::{
    path::Path,
    process::{Command, Output},
};

use pretty_assertions::assert_eq;
use tempfile::{TempDir, tempdir};

const POLICY_VARS: [&str; 4] = [
    "STABLE_STRATEGY",
    "STABLE_BRANCHES_REGEX",
    "GITHUB_REF",
    "GITHUB_OUTPUT",
];

fn buildmeta(dir: &Path, args: &[&str], env: &[(&str, &str)]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_buildmeta"));
    command.args(args).current_dir(dir).env("NO_COLOR", "1");

    for key in POLICY_VARS {
        command.env_remove(key);
    }
    for (k, v) in env {
        command.env(k, v);
    }

    command.output().expect("Failed to run binary")
}

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "ci")
        .env("GIT_AUTHOR_EMAIL", "ci@example.com")
        .env("GIT_COMMITTER_NAME", "ci")
        .env("GIT_COMMITTER_EMAIL", "ci@example.com")
        .status()
        .expect("git is required for these tests");
    assert!(status.success(), "git {args:?} failed");
}

fn git_repo(branch: &str) -> TempDir {
    let dir = tempdir().unwrap();
    git(dir.path(), &["init", "-q"]);
    git(dir.path(), &["symbolic-ref", "HEAD", &format!("refs/heads/{branch}")]);
    git(
        dir.path(),
        &["-c", "commit.gpgsign=false", "commit", "-q", "--allow-empty", "-m", "init"],
    );
    dir
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn test_missing_strategy_exits_with_one() {
    let dir = tempdir().unwrap();
    let output = buildmeta(dir.path(), &[], &[("GITHUB_REF", "refs/heads/main")]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("STABLE_STRATEGY"));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_unknown_strategy_exits_with_one() {
    let dir = tempdir().unwrap();
    let output = buildmeta(
        dir.path(),
        &[],
        &[("STABLE_STRATEGY", "sometimes"), ("GITHUB_REF", "refs/heads/main")],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("sometimes"));
}

#[test]
fn test_branch_without_pattern_exits_with_one() {
    let dir = tempdir().unwrap();
    let output = buildmeta(
        dir.path(),
        &[],
        &[("STABLE_STRATEGY", "branch"), ("GITHUB_REF", "refs/heads/main")],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("STABLE_BRANCHES_REGEX"));
}

#[test]
fn test_missing_ref_exits_with_one() {
    let dir = tempdir().unwrap();
    let output = buildmeta(dir.path(), &[], &[("STABLE_STRATEGY", "always")]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("GITHUB_REF"));
}

#[test]
fn test_usage_error_exits_with_one() {
    let dir = tempdir().unwrap();
    let output = buildmeta(dir.path(), &["--bogus"], &[]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_help_exits_with_zero() {
    let dir = tempdir().unwrap();
    let output = buildmeta(dir.path(), &["--help"], &[]);
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("--output-format"));
}

#[test]
fn test_git_failure_exits_with_one() {
    let dir = tempdir().unwrap();
    let ceiling = dir.path().parent().unwrap().display().to_string();
    let mut command = Command::new(env!("CARGO_BIN_EXE_buildmeta"));
    let output = command
        .current_dir(dir.path())
        .env("NO_COLOR", "1")
        .env("GIT_CEILING_DIRECTORIES", ceiling)
        .env("STABLE_STRATEGY", "always")
        .env("GITHUB_REF", "refs/heads/main")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let report = stderr(&output);
    assert!(report.contains("rev-parse"));
    // git's own stderr is carried into the report
    assert!(report.contains("not a git repository"));
}

#[test]
fn test_set_output_in_repository() {
    let repo = git_repo("release/1.0");
    let output = buildmeta(
        repo.path(),
        &[],
        &[
            ("STABLE_STRATEGY", "branch"),
            ("STABLE_BRANCHES_REGEX", "^release/.*"),
            ("GITHUB_REF", "refs/heads/release/1.0"),
        ],
    );

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<_> = stdout.lines().collect();

    assert_eq!(lines[0], "Stable build:  true");
    assert!(lines[1].starts_with("Timestamp:     "));
    assert_eq!(lines[3], "Git branch:    release/1.0");
    assert_eq!(lines[6], "");

    let names: Vec<_> = lines[7..]
        .iter()
        .map(|l| {
            l.strip_prefix("::set-output name=")
                .and_then(|rest| rest.split("::").next())
                .unwrap()
        })
        .collect();
    assert_eq!(
        names,
        ["timestamp", "git-sha", "git-branch", "docker", "is-stable", "helm"]
    );
    assert_eq!(lines[11], "::set-output name=is-stable::true");
    assert_eq!(lines[12], "::set-output name=helm::");
}

#[test]
fn test_json_output_quiet() {
    let repo = git_repo("feature/x");
    let output = buildmeta(
        repo.path(),
        &["--quiet", "--output-format", "json"],
        &[("STABLE_STRATEGY", "never"), ("GITHUB_REF", "refs/heads/feature/x")],
    );

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["git-branch"], "feature/x");
    assert_eq!(value["is-stable"], "false");

    let timestamp = value["timestamp"].as_str().unwrap();
    let sha = value["git-sha"].as_str().unwrap();
    assert_eq!(sha.len(), 7);
    assert_eq!(value["helm"], format!("-{timestamp}+{sha}"));
    assert_eq!(value["docker"], format!("-{timestamp}.{sha}"));
}

#[test]
fn test_json_output_keeps_summary_off_stdout() {
    let repo = git_repo("main");
    let output = buildmeta(
        repo.path(),
        &["--output-format", "json"],
        &[("STABLE_STRATEGY", "never"), ("GITHUB_REF", "x")],
    );

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["is-stable"], "false");
    assert!(stderr(&output).contains("Stable build:  false"));
}

#[test]
fn test_template_output_keeps_summary_off_stdout() {
    let repo = git_repo("main");
    let output = buildmeta(
        repo.path(),
        &["--output-format", "template", "--template", "{{ name }}={{ value }}"],
        &[("STABLE_STRATEGY", "always"), ("GITHUB_REF", "x")],
    );

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines.len(), 6);
    assert!(lines[0].starts_with("timestamp="));
    assert_eq!(lines[4], "is-stable=true");
    assert_eq!(lines[5], "helm=");
}
