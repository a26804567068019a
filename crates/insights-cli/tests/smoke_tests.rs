//! Smoke tests for the insights CLI

#![allow(deprecated)] // Command::cargo_bin
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn insights() -> Command {
    Command::cargo_bin("insights").expect("insights binary should exist")
}

fn bundled(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("scenarios")
        .join(name)
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    insights()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_lists_subcommands() {
    insights()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("frames"))
        .stdout(predicate::str::contains("setup"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_no_args_fails() {
    insights().assert().failure();
}

// ============================================================================
// Frames
// ============================================================================

#[test]
fn test_frames_bundled_scenario() {
    insights()
        .args(["--color", "never", "frames"])
        .arg(bundled("nested-frames.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("iframe#payment > iframe#challenge > #submit"))
        .stdout(predicate::str::contains("3 of 5 windows collecting"))
        .stdout(predicate::str::contains("#banner").not());
}

#[test]
fn test_frames_json_output() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("page.yaml");
    fs::write(
        &path,
        "frames:\n  - selector: 'iframe#a'\n    results:\n      - requirement: focus-indicator\n        selector: '#b'\n",
    )
    .unwrap();

    let output = insights()
        .args(["frames", "--format", "json"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["windows"], 2);
    assert_eq!(report["results"][0]["requirementId"], "focus-indicator");
    assert_eq!(report["results"][0]["selector"][0], "iframe#a");
    assert_eq!(report["completed"].as_array().map(Vec::len), Some(1));
}

#[test]
fn test_frames_invalid_scenario() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("page.yaml");
    fs::write(&path, "frames:\n  - selector: ''\n").unwrap();

    insights()
        .arg("frames")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("frame selector is empty"));
}

#[test]
fn test_frames_bad_runner_config() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("insights.yaml");
    fs::write(&config, "frame_runner:\n  ping_timeout_ms: 0\n").unwrap();

    insights()
        .arg("frames")
        .arg(bundled("nested-frames.yaml"))
        .arg("--config")
        .arg(&config)
        .assert()
        .failure();
}

// ============================================================================
// Setup
// ============================================================================

#[test]
fn test_setup_happy_path() {
    insights()
        .args(["--color", "never", "setup"])
        .arg(bundled("android-happy-path.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("installing-service"))
        .stdout(predicate::str::contains("Connected to com.contoso.checkout on port 62442"));
}

#[test]
fn test_setup_no_devices() {
    insights()
        .args(["setup", "--format", "json"])
        .arg(bundled("android-no-devices.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"prompt-connect-to-device\""));
}

#[test]
fn test_setup_auto_start() {
    insights()
        .args(["setup", "--format", "json"])
        .arg(bundled("android-auto-start.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"autoStarted\": true"))
        .stdout(predicate::str::contains("\"prompt-choose-device\""));
}

#[test]
fn test_setup_expectation_mismatch() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("device.yaml");
    fs::write(
        &path,
        "actions:\n  - action: ready-to-start\nexpect: prompt-connected-start-testing\n",
    )
    .unwrap();

    insights()
        .arg("setup")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "setup ended on prompt-locate-adb, expected prompt-connected-start-testing",
        ));
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn test_config_defaults() {
    insights()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("ping_timeout_ms: 500"))
        .stdout(predicate::str::contains("verbosity: normal"));
}

#[test]
fn test_config_quiet_prints_yaml_only() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("insights.json");
    fs::write(&path, r#"{"frame_runner":{"ping_timeout_ms":250}}"#).unwrap();

    insights()
        .args(["--quiet", "config", "--file"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("ping_timeout_ms: 250"))
        .stdout(predicate::str::contains("verbosity:").not());
}
