//! CLI integration tests for the Docket command-line interface.
//!
//! These tests verify:
//! - Help text is displayed correctly
//! - Argument parsing and input validation
//! - Config discovery and the explicit `--config` file
//!
//! Note: no test talks to a model. Runs that reach the pipeline use an
//! Ollama config with an empty document set, which issues no calls.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command for the docket binary, isolated from the user's config.
fn docket(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("docket").unwrap();
    cmd.current_dir(workdir)
        .env("DOCKET_CONFIG_DIR", workdir.join("config-home"))
        .env_remove("DOCKET_CONFIG");
    cmd
}

fn write_ollama_config(dir: &Path) {
    fs::write(
        dir.join("docket.toml"),
        r#"
[llm]
backend = "ollama"
model = "llama3"
"#,
    )
    .unwrap();
}

fn write_input(dir: &Path, contents: &str) -> std::path::PathBuf {
    let path = dir.join("input.json");
    fs::write(&path, contents).unwrap();
    path
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    let dir = TempDir::new().unwrap();
    docket(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Docket"))
        .stdout(predicate::str::contains("chronology"));
}

#[test]
fn test_version_displays() {
    let dir = TempDir::new().unwrap();
    docket(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("docket"));
}

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    docket(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_run_help() {
    let dir = TempDir::new().unwrap();
    docket(dir.path())
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--query"))
        .stdout(predicate::str::contains("--limit"))
        .stdout(predicate::str::contains("--workers"))
        .stdout(predicate::str::contains("--strip-citations"))
        .stdout(predicate::str::contains("--check"));
}

#[test]
fn test_unknown_subcommand_rejected() {
    let dir = TempDir::new().unwrap();
    docket(dir.path()).arg("summarize").assert().failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// Run Command Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_run_requires_input() {
    let dir = TempDir::new().unwrap();
    docket(dir.path()).arg("run").assert().failure();
}

#[test]
fn test_run_missing_input_file() {
    let dir = TempDir::new().unwrap();
    docket(dir.path())
        .args(["run", "missing.json", "--query", "q"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read input file"));
}

#[test]
fn test_run_invalid_input_json() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "{ not json");
    docket(dir.path())
        .arg("run")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse input file"));
}

#[test]
fn test_run_without_query() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), r#"{"documents": []}"#);
    docket(dir.path())
        .arg("run")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No query given"));
}

#[test]
fn test_run_rejects_zero_workers() {
    let dir = TempDir::new().unwrap();
    write_ollama_config(dir.path());
    let input = write_input(dir.path(), r#"{"query": "q", "documents": []}"#);
    docket(dir.path())
        .arg("run")
        .arg(&input)
        .args(["--workers", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("map_workers"));
}

#[test]
fn test_run_requires_model() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), r#"{"query": "q", "documents": []}"#);
    docket(dir.path())
        .arg("run")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("model"));
}

#[test]
fn test_run_empty_document_set_reports_no_events() {
    let dir = TempDir::new().unwrap();
    write_ollama_config(dir.path());
    let input = write_input(dir.path(), r#"{"query": "What happened?", "documents": []}"#);
    docket(dir.path())
        .arg("run")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("No timeline events were found"));
}

#[test]
fn test_run_json_output() {
    let dir = TempDir::new().unwrap();
    write_ollama_config(dir.path());
    let input = write_input(dir.path(), r#"{"documents": []}"#);
    docket(dir.path())
        .arg("run")
        .arg(&input)
        .args(["--query", "What happened?", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no_events_found"))
        .stdout(predicate::str::contains("prompts_issued"));
}

#[test]
fn test_run_check_fails_on_unreachable_backend() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("docket.toml"),
        r#"
[llm]
backend = "custom"
base_url = "http://127.0.0.1:1/v1"
model = "local"
"#,
    )
    .unwrap();
    let input = write_input(dir.path(), r#"{"query": "q", "documents": []}"#);
    docket(dir.path())
        .arg("run")
        .arg(&input)
        .arg("--check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not reachable"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Command Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_path_lists_search_order() {
    let dir = TempDir::new().unwrap();
    docket(dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"))
        .stdout(predicate::str::contains("docket.toml"))
        .stdout(predicate::str::contains("not found"));
}

#[test]
fn test_config_show_project_file() {
    let dir = TempDir::new().unwrap();
    write_ollama_config(dir.path());
    docket(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ollama"))
        .stdout(predicate::str::contains("llama3"))
        .stdout(predicate::str::contains("event_limit"));
}

#[test]
fn test_config_show_plaintext_key_warning() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("docket.toml"),
        "[llm]\nbackend = \"openai\"\nmodel = \"gpt-4o-mini\"\napi_key = \"sk-test\"\n",
    )
    .unwrap();
    docket(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("plaintext"));
}

#[test]
fn test_explicit_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    fs::write(&path, "[timeline]\nevent_limit = 7\n").unwrap();
    docket(dir.path())
        .arg("--config")
        .arg(&path)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.toml"))
        .stdout(predicate::str::contains("7"));
}

#[test]
fn test_explicit_config_missing() {
    let dir = TempDir::new().unwrap();
    docket(dir.path())
        .args(["--config", "nope.toml", "config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn test_config_init_local() {
    let dir = TempDir::new().unwrap();
    docket(dir.path())
        .args(["config", "init", "--local"])
        .assert()
        .success()
        .stdout(predicate::str::contains("docket.toml"));

    let written = fs::read_to_string(dir.path().join("docket.toml")).unwrap();
    assert!(written.contains("[llm]"));
    assert!(written.contains("[timeline]"));

    docket(dir.path())
        .args(["config", "init", "--local"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}
