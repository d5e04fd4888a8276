//! CLI tests: spawn the conductor binary and check output and exit codes.
//!
//! None of these reach a language model.

use std::fs;
use std::process::Command;

use conductor::exit_codes;
use conductor::io::config::{ConductorConfig, load_config};

fn conductor() -> Command {
    Command::new(env!("CARGO_BIN_EXE_conductor"))
}

#[test]
fn init_writes_default_config() {
    let temp = tempfile::tempdir().expect("tempdir");
    let status = conductor()
        .current_dir(temp.path())
        .arg("init")
        .status()
        .expect("conductor init");
    assert_eq!(status.code(), Some(exit_codes::OK));

    let cfg = load_config(&temp.path().join(".conductor/config.toml")).expect("load");
    assert_eq!(cfg, ConductorConfig::default());
}

#[test]
fn run_without_goal_fails_with_exit_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = conductor()
        .current_dir(temp.path())
        .args(["run", "--report", "report.json"])
        .output()
        .expect("conductor run");

    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("Failed: Run failed: User goal not provided."),
        "{stdout}"
    );

    let report: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(temp.path().join("report.json")).expect("report"),
    )
    .expect("json");
    assert_eq!(report["outcome"]["status"], "failed");
    assert_eq!(report["steps"], 0);
    assert!(temp.path().join("conductor.log").exists());
}

#[test]
fn tool_refuses_denylisted_command() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = conductor()
        .current_dir(temp.path())
        .args(["tool", r#"{"tool": "RunShellCommand", "command": "sudo reboot"}"#])
        .output()
        .expect("conductor tool");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim_end(),
        "Error: Destructive or privileged command detected. Execution aborted for safety."
    );
}

#[test]
fn tool_writes_content_with_commas() {
    let temp = tempfile::tempdir().expect("tempdir");
    let status = conductor()
        .current_dir(temp.path())
        .args([
            "tool",
            r#"{"tool": "WriteFile", "path": "out/list.txt", "content": "x, y, z"}"#,
        ])
        .status()
        .expect("conductor tool");

    assert_eq!(status.code(), Some(exit_codes::OK));
    assert_eq!(
        fs::read_to_string(temp.path().join("out/list.txt")).expect("read"),
        "x, y, z"
    );
}

#[test]
fn malformed_tool_request_is_invalid() {
    let temp = tempfile::tempdir().expect("tempdir");
    let status = conductor()
        .current_dir(temp.path())
        .args(["tool", r#"{"tool": "FormatDisk"}"#])
        .status()
        .expect("conductor tool");
    assert_eq!(status.code(), Some(exit_codes::INVALID));
}

#[test]
fn invalid_config_is_rejected() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(temp.path().join("bad.toml"), "recursion_limit = 0\n").expect("write");
    let status = conductor()
        .current_dir(temp.path())
        .args(["--config", "bad.toml", "run", "goal"])
        .status()
        .expect("conductor run");
    assert_eq!(status.code(), Some(exit_codes::INVALID));
}
