//! Integration tests for the git-guardian CLI.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;

fn guardian() -> Command {
    Command::cargo_bin("git-guardian").expect("binary exists")
}

fn git(path: &Path, args: &[&str]) {
    let output = std::process::Command::new("git")
        .args(args)
        .current_dir(path)
        .output()
        .expect("run git");
    assert!(output.status.success(), "git {args:?} failed");
}

/// Creates a git repository with one commit on `main`.
fn create_test_repo() -> TempDir {
    let temp = TempDir::new().expect("create temp dir");
    let path = temp.path();

    git(path, &["init", "--initial-branch=main"]);
    git(path, &["config", "user.email", "test@test.com"]);
    git(path, &["config", "user.name", "Test"]);
    git(path, &["config", "commit.gpgsign", "false"]);
    std::fs::write(path.join("README.md"), "# demo\n").expect("write readme");
    git(path, &["add", "README.md"]);
    git(path, &["commit", "-m", "initial commit"]);

    temp
}

fn write_config(temp: &TempDir, content: &str) {
    std::fs::write(temp.path().join(".mcp.yml"), content).expect("write config");
}

/// Parses each stdout line as a JSON-RPC response.
fn responses(stdout: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("response is JSON"))
        .collect()
}

#[test]
fn test_help() {
    guardian()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pre-push validation agent"));
}

#[test]
fn test_version_flag() {
    guardian()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_version_subcommand() {
    guardian()
        .arg("version")
        .assert()
        .success()
        .stdout(format!("git-guardian v{}\n", env!("CARGO_PKG_VERSION")));
}

// =============================================================================
// Protocol server
// =============================================================================

#[test]
fn test_serve_session() {
    let input = [
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
        json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call", "params": {"name": "format_disk"}}),
        json!({"jsonrpc": "2.0", "id": 4, "method": "shutdown"}),
    ]
    .iter()
    .map(Value::to_string)
    .collect::<Vec<_>>()
    .join("\n");

    let output = guardian()
        .arg("serve")
        .write_stdin(format!("{input}\n"))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let responses = responses(&output);
    assert_eq!(responses.len(), 4, "notification must not be answered");

    assert_eq!(responses[0]["id"], 1);
    assert_eq!(responses[0]["result"]["serverInfo"]["name"], "git-guardian");

    let tools = responses[1]["result"]["tools"].as_array().expect("tools");
    let names: Vec<_> = tools.iter().filter_map(|t| t["name"].as_str()).collect();
    assert_eq!(
        names,
        ["analyze_commits", "explain_failure", "run_checks", "run_tests", "validate_push"]
    );

    assert_eq!(responses[2]["error"]["code"], -32602);
    assert_eq!(responses[2]["error"]["message"], "Tool not found: format_disk");

    assert_eq!(responses[3]["error"]["code"], -32601);
}

#[test]
fn test_serve_is_default_and_answers_parse_errors() {
    let output = guardian()
        .write_stdin("{not json\n")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let responses = responses(&output);
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["id"], Value::Null);
    assert_eq!(responses[0]["error"]["code"], -32700);
}

#[test]
fn test_serve_explain_failure_tool() {
    let request = json!({
        "jsonrpc": "2.0",
        "id": 7,
        "method": "tools/call",
        "params": {"name": "explain_failure", "arguments": {"failure_type": "shellcheck"}},
    });

    let output = guardian()
        .arg("serve")
        .write_stdin(format!("{request}\n"))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let responses = responses(&output);
    let content = &responses[0]["result"]["content"][0];
    assert_eq!(content["type"], "text");
    let inner: Value = serde_json::from_str(content["text"].as_str().expect("text")).expect("JSON text");
    assert!(inner["explanation"].as_str().expect("explanation").contains("Shellcheck found issues"));
}

#[test]
fn test_serve_logs_to_file() {
    let temp = TempDir::new().expect("create temp dir");
    let log = temp.path().join("guardian.log");

    guardian()
        .args(["serve", "--log-file"])
        .arg(&log)
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::is_empty());

    let content = std::fs::read_to_string(&log).expect("read log");
    assert!(content.contains("Protocol server starting"));
}

// =============================================================================
// Explain
// =============================================================================

#[test]
fn test_explain_known_type() {
    guardian()
        .args(["explain", "gofmt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gofmt -w"));
}

#[test]
fn test_explain_unknown_type_with_details() {
    guardian()
        .args(["explain", "mystery", "--details", "line 3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Check 'mystery' failed"))
        .stdout(predicate::str::contains("Details:\nline 3"));
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_init_creates_config() {
    let temp = TempDir::new().expect("create temp dir");

    guardian()
        .arg("init")
        .current_dir(temp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Created .mcp.yml"));

    guardian()
        .arg("check-config")
        .current_dir(temp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_init_already_exists() {
    let temp = TempDir::new().expect("create temp dir");
    write_config(&temp, "tests: []\n");

    guardian()
        .arg("init")
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    guardian()
        .args(["init", "--force"])
        .current_dir(temp.path())
        .assert()
        .success();

    let content = std::fs::read_to_string(temp.path().join(".mcp.yml")).expect("read config");
    assert!(content.contains("go test ./..."));
}

#[test]
fn test_check_config_missing() {
    let temp = TempDir::new().expect("create temp dir");

    guardian()
        .arg("check-config")
        .current_dir(temp.path())
        .assert()
        .code(78)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_check_config_rejects_duplicates() {
    let temp = TempDir::new().expect("create temp dir");
    write_config(
        &temp,
        "tests:\n  - name: unit\n    command: \"true\"\n  - name: unit\n    command: \"true\"\n",
    );

    guardian()
        .arg("check-config")
        .current_dir(temp.path())
        .assert()
        .code(78)
        .stderr(predicate::str::contains("duplicate test name"));
}

// =============================================================================
// Validate
// =============================================================================

#[test]
fn test_validate_outside_repo() {
    let temp = TempDir::new().expect("create temp dir");

    guardian()
        .args(["validate", "--repo"])
        .arg(temp.path())
        .assert()
        .code(65);
}

#[cfg(unix)]
#[test]
fn test_validate_passing_push() {
    let temp = create_test_repo();
    write_config(&temp, "tests:\n  - name: unit\n    command: \"true\"\n    blocking: true\n");

    guardian()
        .arg("validate")
        .current_dir(temp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Push allowed"));
}

#[cfg(unix)]
#[test]
fn test_validate_blocking_failure_json() {
    let temp = create_test_repo();
    write_config(&temp, "tests:\n  - name: unit\n    command: exit 3\n    blocking: true\n");

    let output = guardian()
        .args(["validate", "--json"])
        .current_dir(temp.path())
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();

    let verdict: Value = serde_json::from_slice(&output).expect("verdict JSON");
    assert_eq!(verdict["success"], false);
    assert_eq!(verdict["commits"], 1);
    assert_eq!(verdict["tests"][0]["error"], "exit status 3");
}

#[test]
fn test_validate_nothing_to_push() {
    let temp = create_test_repo();
    git(temp.path(), &["update-ref", "refs/remotes/origin/main", "HEAD"]);

    guardian()
        .arg("validate")
        .current_dir(temp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("No unpushed commits to validate"));
}

#[cfg(unix)]
#[test]
fn test_validate_repo_subdirectory_runs_tests_there() {
    let temp = create_test_repo();
    let service = temp.path().join("service");
    std::fs::create_dir(&service).expect("create service dir");
    std::fs::write(service.join("marker"), "").expect("write marker");
    std::fs::write(
        service.join(".mcp.yml"),
        "tests:\n  - name: local\n    command: test -f marker\n    blocking: true\n",
    )
    .expect("write config");

    guardian()
        .args(["validate", "--repo", "service"])
        .current_dir(temp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Push allowed"));
}
