//! E2E tests for `wm replay` and `wm config`.
//!
//! Each test runs the `wm` binary as a subprocess in an isolated temp directory.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

/// Build a Command targeting the `wm` binary, rooted in `dir`.
fn wm_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("wm"));
    cmd.current_dir(dir);
    // Keep the user's own config and format preferences out of the test.
    cmd.env("XDG_CONFIG_HOME", dir.join(".xdg"));
    cmd.env_remove("FORMAT");
    // Suppress tracing output that goes to stderr
    cmd.env("WAYMARK_LOG", "error");
    cmd
}

fn write_history(dir: &Path) {
    let history = json!([
        {
            "timestamp": "2025-10-09T08:00:00Z",
            "events": [
                {"type": "user_request", "content": "Why is the build red?"},
                {"type": "agent_start", "agent": "planner", "message": "looking"},
                {"type": "tool_used", "tool_run_id": "run1", "tool_name": "grep", "status": "running"},
                {"type": "tool_used", "tool_run_id": "run1", "tool_name": "grep", "status": "completed"},
                {"type": "something_new", "payload": 1},
                {"type": "workflow_complete"}
            ]
        },
        {
            "timestamp": "2025-10-09T09:30:00.250Z",
            "events": [
                {"type": "tool_used", "tool_run_id": "run1", "tool_name": "read", "status": "running"}
            ]
        }
    ]);
    std::fs::write(dir.join("history.json"), history.to_string()).expect("write history");
}

fn replay_json(dir: &Path, extra: &[&str]) -> Value {
    let output = wm_cmd(dir)
        .args(["replay", "history.json", "--format", "json"])
        .args(extra)
        .output()
        .expect("replay should not crash");
    assert!(
        output.status.success(),
        "replay failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("replay --format json should produce JSON")
}

// ---------------------------------------------------------------------------
// Replay
// ---------------------------------------------------------------------------

#[test]
fn replay_json_has_one_session_per_record() {
    let dir = TempDir::new().expect("tempdir");
    write_history(dir.path());

    let sessions = replay_json(dir.path(), &[]);
    let sessions = sessions.as_array().expect("array of sessions");
    assert_eq!(sessions.len(), 2);

    assert_eq!(sessions[0]["id"], "history-1759996800000-0");
    assert_eq!(sessions[1]["id"], "history-1760002200250-1");
    assert_eq!(sessions[0]["user_query"], "Why is the build red?");
    assert_eq!(sessions[1]["user_query"], Value::Null);
    assert_eq!(sessions[0]["is_expanded"], false);

    let run = &sessions[0]["tool_runs"]["run1"];
    assert_eq!(run["status"], "completed");
    assert_eq!(run["started_at"], run["completed_at"]);
    assert_eq!(sessions[1]["tool_runs"]["run1"]["tool_name"], "read");
}

#[test]
fn replay_expanded_flag_overrides_history_default() {
    let dir = TempDir::new().expect("tempdir");
    write_history(dir.path());

    let sessions = replay_json(dir.path(), &["--expanded"]);
    assert!(
        sessions
            .as_array()
            .expect("array")
            .iter()
            .all(|s| s["is_expanded"] == true)
    );
}

#[test]
fn replay_text_shows_placeholder_for_missing_query() {
    let dir = TempDir::new().expect("tempdir");
    write_history(dir.path());

    wm_cmd(dir.path())
        .args(["replay", "history.json", "--format", "text", "--expanded"])
        .assert()
        .success()
        .stdout(predicate::str::contains("session history-1759996800000-0"))
        .stdout(predicate::str::contains("query: (no request recorded)"))
        .stdout(predicate::str::contains("agent history-1759996800000-0:agent:0 start planner looking"));
}

#[test]
fn replay_uses_project_config() {
    let dir = TempDir::new().expect("tempdir");
    write_history(dir.path());
    std::fs::create_dir_all(dir.path().join(".waymark")).expect("mkdir");
    std::fs::write(
        dir.path().join(".waymark/config.toml"),
        "[sessions]\nplaceholder_query = \"(silent)\"\nhistory_expanded = true\n\n[history]\nid_prefix = \"past\"\n",
    )
    .expect("write config");

    let sessions = replay_json(dir.path(), &[]);
    assert_eq!(sessions[0]["id"], "past-1759996800000-0");
    assert_eq!(sessions[0]["is_expanded"], true);

    wm_cmd(dir.path())
        .args(["replay", "history.json", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("query: (silent)"));
}

#[test]
fn replay_reads_stdin() {
    let dir = TempDir::new().expect("tempdir");
    wm_cmd(dir.path())
        .args(["replay", "-", "--format", "json"])
        .write_stdin(r#"[{"timestamp": "2025-10-09T08:00:00Z", "events": []}]"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("history-1759996800000-0"));
}

#[test]
fn replay_rejects_non_history_document() {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(dir.path().join("history.json"), r#"{"not": "a list"}"#).expect("write");

    let output = wm_cmd(dir.path())
        .args(["replay", "history.json", "--format", "json"])
        .output()
        .expect("replay should not crash");
    assert_eq!(output.status.code(), Some(2));
    let err: Value = serde_json::from_slice(&output.stderr).expect("error JSON on stderr");
    assert_eq!(err["error"]["error_code"], "E2003");
}

#[test]
fn replay_missing_file_is_unreadable_input() {
    let dir = TempDir::new().expect("tempdir");
    wm_cmd(dir.path())
        .args(["replay", "nope.json", "--format", "text"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("error[E1002]: Failed to read nope.json"));
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[test]
fn config_reports_defaults_and_resolved_output() {
    let dir = TempDir::new().expect("tempdir");
    let output = wm_cmd(dir.path())
        .args(["config", "--format", "json"])
        .output()
        .expect("config should not crash");
    assert!(output.status.success());
    let config: Value = serde_json::from_slice(&output.stdout).expect("config JSON");
    assert_eq!(config["resolved_output"], "json");
    assert_eq!(config["project"]["sessions"]["live_expanded"], true);
    assert_eq!(config["project"]["history"]["id_prefix"], "history");
}

#[test]
fn config_parse_error_has_code() {
    let dir = TempDir::new().expect("tempdir");
    std::fs::create_dir_all(dir.path().join(".waymark")).expect("mkdir");
    std::fs::write(dir.path().join(".waymark/config.toml"), "[sessions\n").expect("write");

    wm_cmd(dir.path())
        .args(["config", "--format", "text"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("error[E1001]"));
}
