//! Integration tests for the `paydesk` CLI binary.
//!
//! Argument parsing, help output, and shell completions run without a
//! backend; list and form commands run against a wiremock server.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `paydesk` binary with env isolation.
///
/// Clears all `PAYDESK_*` env vars and points config directories at a
/// throwaway path so tests never touch the user's real configuration.
fn paydesk_cmd(home: &tempfile::TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("paydesk");
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .env_remove("RUST_LOG")
        .env_remove("PAYDESK_PROFILE")
        .env_remove("PAYDESK_API_URL")
        .env_remove("PAYDESK_TOKEN")
        .env_remove("PAYDESK_OUTPUT")
        .env_remove("PAYDESK_INSECURE")
        .env_remove("PAYDESK_TIMEOUT");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn api_path(suffix: &str) -> String {
    format!("/api/payments/{suffix}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = paydesk_cmd(&home).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = tempfile::tempdir().unwrap();
    paydesk_cmd(&home).arg("--help").assert().success().stdout(
        predicate::str::contains("countries")
            .and(predicate::str::contains("devices"))
            .and(predicate::str::contains("transactions")),
    );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    paydesk_cmd(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("paydesk"));
}

#[test]
fn test_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    paydesk_cmd(&home)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_invalid_status_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    paydesk_cmd(&home)
        .args(["devices", "list", "--status", "sleeping"])
        .assert()
        .code(2);
}

// ── Configuration ───────────────────────────────────────────────────

#[test]
fn test_no_backend_configured() {
    let home = tempfile::tempdir().unwrap();
    let output = paydesk_cmd(&home).args(["countries", "list"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("No backend configured"), "{text}");
}

#[test]
fn test_unknown_profile() {
    let home = tempfile::tempdir().unwrap();
    let output = paydesk_cmd(&home)
        .args(["--profile", "staging", "countries", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(combined_output(&output).contains("Profile 'staging' not found"));
}

#[test]
fn test_config_profiles_empty() {
    let home = tempfile::tempdir().unwrap();
    paydesk_cmd(&home)
        .args(["config", "profiles"])
        .assert()
        .success()
        .stderr(predicate::str::contains("No profiles configured"));
}

// ── Against a backend ───────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_countries_list_plain_filters_client_side() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("countries/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                { "id": 1, "nom": "Ghana", "code": "GH", "is_active": true },
                { "id": 2, "nom": "Senegal", "code": "SN", "is_active": false }
            ]
        })))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    paydesk_cmd(&home)
        .args(["--api-url", &server.uri(), "-o", "plain"])
        .args(["countries", "list", "--search", "SENEGAL"])
        .assert()
        .success()
        .stdout("2\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_devices_list_json_offline_only() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("stats/devices/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "name": "A", "is_online": true },
            { "id": 2, "name": "B", "is_online": false }
        ])))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let output = paydesk_cmd(&home)
        .args(["--api-url", &server.uri(), "-o", "json-compact"])
        .args(["devices", "list", "--status", "offline"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows, json!([{ "id": 2, "name": "B", "is_online": false }]));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_country_exits_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("countries/99/")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "Not found." })))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    paydesk_cmd(&home)
        .args(["--api-url", &server.uri(), "countries", "get", "99"])
        .assert()
        .code(4);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_token_exits_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("networks/")))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "detail": "Token expired" })),
        )
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    paydesk_cmd(&home)
        .args(["--api-url", &server.uri(), "--token", "stale", "networks", "list"])
        .assert()
        .code(3);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invalid_country_form_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(api_path("countries/")))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let output = paydesk_cmd(&home)
        .args(["--api-url", &server.uri(), "countries", "create", "--code", "GH"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("nom is required"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_backend_field_errors_are_shown() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(api_path("countries/")))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "code": ["country with this code already exists."] })),
        )
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let output = paydesk_cmd(&home)
        .args(["--api-url", &server.uri()])
        .args(["countries", "create", "--nom", "Ghana", "--code", "GH"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(
        combined_output(&output).contains("code: country with this code already exists."),
        "{}",
        combined_output(&output)
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_transaction_update_requires_a_field() {
    let home = tempfile::tempdir().unwrap();
    paydesk_cmd(&home)
        .args(["--api-url", "http://127.0.0.1:9", "transactions", "update", "tx-1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nothing to update"));
}
