//! CLI integration tests

use std::process::{Command, Output};

fn hpp(args: &[&str]) -> Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "hpp-cli", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = hpp(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("House Price Pipeline"), "Should show app name");
    assert!(stdout.contains("ingest"), "Should show ingest command");
    assert!(stdout.contains("validate-split"), "Should show validate-split command");
    assert!(stdout.contains("train"), "Should show train command");
    assert!(stdout.contains("predict"), "Should show predict command");
    assert!(stdout.contains("remote"), "Should show remote command");
    assert!(stdout.contains("--config"), "Should show config option");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = hpp(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("hpp"), "Should show binary name");
}

#[test]
fn test_ingest_help() {
    let output = hpp(&["ingest", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Ingest help should succeed");
    assert!(stdout.contains("--source"), "Should show source option");
}

#[test]
fn test_predict_help() {
    let output = hpp(&["predict", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Predict help should succeed");
    assert!(stdout.contains("--sample"), "Should show sample option");
    assert!(stdout.contains("--file"), "Should show file option");
}

#[test]
fn test_remote_help() {
    let output = hpp(&["remote", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Remote help should succeed");
    assert!(stdout.contains("schema"), "Should show schema command");
    assert!(stdout.contains("health"), "Should show health command");
    assert!(stdout.contains("metrics"), "Should show metrics command");
}

/// `--sample` and `--file` are mutually exclusive and one is required
#[test]
fn test_predict_requires_one_payload_source() {
    let output = hpp(&["predict"]);
    assert!(!output.status.success(), "Predict without a source should fail");

    let output = hpp(&["predict", "--sample", "--file", "payload.json"]);
    assert!(!output.status.success(), "Predict with both sources should fail");
}

#[test]
fn test_missing_config_fails() {
    let output = hpp(&["--config", "/nonexistent/hpp/config.yaml", "train"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Train without config should fail");
    assert!(
        stderr.contains("config file not found"),
        "Should name the missing config: {stderr}"
    );
}
