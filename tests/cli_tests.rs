//! Integration tests for the command line entry point

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn bridge() -> Command {
    let mut cmd = Command::cargo_bin("adb-bridge").unwrap();
    cmd.env_remove("ADB_BRIDGE_SINK_URI")
        .env_remove("ADB_BRIDGE_PORT")
        .env_remove("ADB_BRIDGE_ADB")
        .env_remove("ADB_BRIDGE_LOG_FILE")
        .env_remove("ANDROID_SERIAL");
    cmd
}

#[test]
fn test_cli_help_flag() {
    bridge()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("--sink-uri"))
        .stdout(predicate::str::contains("--device"));
}

#[test]
fn test_cli_version_flag() {
    bridge()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("adb-bridge"));
}

#[test]
fn test_invalid_sink_uri_is_config_error() {
    bridge()
        .args(["--sink-uri", "http://localhost:6544"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Configuration problem"));
}

#[test]
fn test_invalid_port_env_is_config_error() {
    bridge()
        .env("ADB_BRIDGE_PORT", "not-a-port")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("ADB_BRIDGE_PORT"));
}

#[test]
fn test_missing_adb_is_reported() {
    let temp = TempDir::new().unwrap();
    let log_file = temp.path().join("adb_bridge.log");

    bridge()
        .args(["--adb", "/nonexistent/platform-tools/adb"])
        .arg("--log-file")
        .arg(&log_file)
        .assert()
        .code(5)
        .stderr(predicate::str::contains("adb is not available"));

    assert!(log_file.exists());
}

#[test]
fn test_verbose_shows_error_code() {
    bridge()
        .args(["-v", "--adb", "/nonexistent/platform-tools/adb"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("[E3001]"));
}

#[test]
fn test_unknown_flag() {
    bridge()
        .arg("--no-such-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}
