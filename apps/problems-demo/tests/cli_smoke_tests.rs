#![allow(clippy::unwrap_used, clippy::expect_used)]

//! CLI smoke tests for the problems-demo binary

use std::process::{Command, Stdio};

use tempfile::TempDir;

fn run_demo(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_problems-demo"))
        .args(args)
        .env_remove("PROBLEMS__HANDLERS")
        .env_remove("PROBLEMS__DECLARED_STATUSES")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to execute problems-demo")
}

fn write_config(dir: &TempDir, yaml: &str) -> String {
    let path = dir.path().join("problems.yaml");
    std::fs::write(&path, yaml).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn help_lists_options_and_commands() {
    let output = run_demo(&["--help"]);
    assert!(output.status.success(), "Help command should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"), "Should contain usage information");
    assert!(stdout.contains("--config"), "Should mention config option");
    assert!(stdout.contains("--print-config"));
    assert!(stdout.contains("check"), "Should contain 'check' subcommand");
}

#[test]
fn check_accepts_valid_config() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        "declared_statuses:\n  - exception: QuotaExceeded\n    status: 429\n",
    );

    let output = run_demo(&["--config", &config, "check"]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("Configuration is valid"));
}

#[test]
fn check_rejects_unknown_class() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        "declared_statuses:\n  - exception: NoSuchError\n    status: 400\n",
    );

    let output = run_demo(&["--config", &config, "check"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("NoSuchError"));
}

#[test]
fn missing_config_file_fails() {
    let output = run_demo(&["--config", "/definitely/not/here.yaml", "check"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("config file does not exist"));
}

#[test]
fn print_config_emits_effective_mappings() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        "handlers:\n  - method: GET\n    path: /users/{id}\n    mappings:\n      - exception: TypeMismatch\n",
    );

    let output = run_demo(&["--config", &config, "--print-config"]);
    assert!(output.status.success());

    let printed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let mapping = &printed["handlers"][0]["mappings"][0];
    assert_eq!(mapping["exception"], "TypeMismatch");
    assert_eq!(mapping["status"], 400);
    assert_eq!(mapping["type"], "GENERIC_PROBLEM");
}
