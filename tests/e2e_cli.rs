//! CLI end-to-end tests
//!
//! Tests for the episodex command-line interface.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::process::Command;
use tempfile::tempdir;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Get a command for the episodex binary
#[allow(deprecated)]
fn episodex_cmd() -> Command {
    Command::cargo_bin("episodex").unwrap()
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = episodex_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = episodex_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("episodex"))
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = episodex_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_scan_requires_files() {
    let mut cmd = episodex_cmd();
    cmd.arg("scan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--files"));
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

#[test]
fn test_validate_defaults() {
    let mut cmd = episodex_cmd();
    cmd.arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("using defaults"))
        .stdout(predicate::str::contains("graphql.anilist.co"));
}

#[test]
fn test_validate_config_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("episodex.toml");
    fs::write(
        &config_path,
        r#"
[scan]
username = "kaede"
enhanced = true

[limiter.catalog]
permits = 30
window_secs = 60
"#,
    )
    .unwrap();

    let mut cmd = episodex_cmd();
    cmd.arg("validate")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("User: kaede"))
        .stdout(predicate::str::contains("30 per 60s"));
}

#[test]
fn test_validate_rejects_zero_permits() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("episodex.toml");
    fs::write(&config_path, "[limiter.analysis]\npermits = 0\n").unwrap();

    let mut cmd = episodex_cmd();
    cmd.args(["--config"])
        .arg(&config_path)
        .arg("validate")
        .assert()
        .failure();
}

#[test]
fn test_validate_missing_file() {
    let mut cmd = episodex_cmd();
    cmd.args(["validate", "/nonexistent/episodex.toml"])
        .assert()
        .failure();
}

// ---------------------------------------------------------------------------
// scan
// ---------------------------------------------------------------------------

#[test]
fn test_scan_rejects_malformed_files_list() {
    let dir = tempdir().unwrap();
    let files_path = dir.path().join("files.json");
    fs::write(&files_path, "{ not json").unwrap();

    let mut cmd = episodex_cmd();
    cmd.arg("scan")
        .arg("--files")
        .arg(&files_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse files list"));
}

fn write_scan_inputs(
    dir: &std::path::Path,
    server: &MockServer,
) -> (std::path::PathBuf, std::path::PathBuf) {
    let config_path = dir.join("episodex.toml");
    fs::write(
        &config_path,
        format!(
            r#"
[catalog]
anilist_url = "{uri}"
anizip_url = "{uri}"
request_timeout_secs = 5

[scan]
username = "owner"
"#,
            uri = server.uri()
        ),
    )
    .unwrap();

    let files_path = dir.join("files.json");
    let files = json!([{
        "path": "/anime/Mushishi/[Group] Mushishi - 05.mkv",
        "parsed_data": { "title": "Mushishi", "episode": "05" }
    }]);
    fs::write(&files_path, files.to_string()).unwrap();

    (config_path, files_path)
}

fn mushishi() -> Value {
    json!({
        "id": 457,
        "title": { "romaji": "Mushishi", "english": "Mushi-Shi", "native": null },
        "synonyms": [],
        "format": "TV",
        "status": "FINISHED",
        "episodes": 26,
        "nextAiringEpisode": null,
        "startDate": { "year": 2005, "month": 10, "day": 23 },
        "relations": { "edges": [] }
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scan_writes_hydrated_files() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "variables": { "userName": "owner" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "MediaListCollection": { "lists": [{ "entries": [{ "media": mushishi() }] }] } }
        })))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let (config_path, files_path) = write_scan_inputs(dir.path(), &server);
    let output_path = dir.path().join("out.json");

    let mut cmd = episodex_cmd();
    cmd.arg("--config")
        .arg(&config_path)
        .arg("scan")
        .arg("--files")
        .arg(&files_path)
        .arg("--output")
        .arg(&output_path);

    let assert = tokio::task::spawn_blocking(move || cmd.assert()).await.unwrap();
    assert
        .success()
        .stdout(predicate::str::contains("1 matched, 0 unmatched"));

    let output: Value = serde_json::from_str(&fs::read_to_string(&output_path).unwrap()).unwrap();
    assert_eq!(output["summary"]["matched"], 1);
    assert_eq!(output["files"][0]["media_id"], 457);
    assert_eq!(output["files"][0]["metadata"]["episode"], 5);
    assert_eq!(output["files"][0]["metadata"]["anidb_episode"], "5");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scan_without_candidates_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "variables": { "userName": "owner" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "MediaListCollection": { "lists": [] } }
        })))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let (config_path, files_path) = write_scan_inputs(dir.path(), &server);

    let mut cmd = episodex_cmd();
    cmd.arg("--config")
        .arg(&config_path)
        .arg("scan")
        .arg("--files")
        .arg(&files_path);

    let assert = tokio::task::spawn_blocking(move || cmd.assert()).await.unwrap();
    assert
        .failure()
        .stderr(predicate::str::contains("No candidate media"));
}
