//! Integration tests for the CLI binary.
//!
//! Verifies that the `pin` binary responds to basic flags and drives a
//! small init / set / export session against a temporary data directory.
//!
//! This test is registered as a [[test]] in the pin-identity-cli crate
//! so that CARGO_BIN_EXE_pin is available.

use std::path::Path;
use std::process::{Command, Output};

/// Get a Command pointing to the `pin` binary.
fn pin_binary() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_pin"));
    cmd.env_remove("PIN_BASE_URL").env_remove("RUST_LOG");
    cmd
}

fn pin_in(dir: &Path, args: &[&str]) -> Output {
    pin_binary()
        .arg("--data-dir")
        .arg(dir)
        .args(["--base-url", "https://pin.example"])
        .args(args)
        .output()
        .expect("failed to execute pin")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn cli_responds_to_help() {
    let output = pin_binary()
        .arg("--help")
        .output()
        .expect("failed to execute pin --help");

    assert!(
        output.status.success(),
        "pin --help should exit with success, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let out = stdout(&output);
    assert!(
        out.contains("Usage") && out.contains("domains"),
        "pin --help output should contain usage information, got: {out}"
    );
}

#[test]
fn cli_responds_to_version() {
    let output = pin_binary()
        .arg("--version")
        .output()
        .expect("failed to execute pin --version");

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("pin") && out.contains("0.1"), "got: {out}");
}

#[test]
fn cli_exits_with_error_on_unknown_flag() {
    let output = pin_binary()
        .arg("--nonexistent-flag")
        .output()
        .expect("failed to execute pin");

    assert!(
        !output.status.success(),
        "pin with unknown flag should exit with error"
    );
}

#[test]
fn cli_export_before_init_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = pin_in(dir.path(), &["export"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("pin init"));
}

#[test]
fn cli_init_set_and_export_session() {
    let dir = tempfile::tempdir().unwrap();

    let init = pin_in(dir.path(), &["init", "--handle", "alice", "--name", "Alice"]);
    assert!(init.status.success(), "init failed: {}", String::from_utf8_lossy(&init.stderr));
    assert!(stdout(&init).contains("Protected domain: pin.example"));

    let set = pin_in(dir.path(), &["set", "email", "alice@example.com"]);
    assert!(set.status.success());

    // Email is private by default.
    let public = pin_in(dir.path(), &["export", "--format", "json"]);
    assert!(public.status.success());
    let body = stdout(&public);
    let envelope: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(envelope["meta"]["version"], "pinc-1");
    assert_eq!(envelope["meta"]["view"], "public");
    assert_eq!(envelope["identity"]["handle"], "alice");
    assert!(!body.contains("alice@example.com"));

    let vis = pin_in(dir.path(), &["visibility", "set", "email", "public"]);
    assert!(vis.status.success());
    let card = pin_in(dir.path(), &["export", "--format", "vcf"]);
    assert!(stdout(&card).contains("EMAIL;TYPE=work:alice@example.com"));

    let domains = pin_in(dir.path(), &["domains", "list"]);
    assert!(stdout(&domains).contains("[protected]"));
}

#[test]
fn cli_rejects_unknown_format() {
    let dir = tempfile::tempdir().unwrap();
    assert!(pin_in(dir.path(), &["init", "--handle", "bob"]).status.success());
    let output = pin_in(dir.path(), &["export", "--format", "pdf"]);
    assert!(!output.status.success());
}

#[test]
fn cli_verbose_logs_state_changes() {
    let dir = tempfile::tempdir().unwrap();

    let quiet = pin_in(dir.path(), &["init", "--handle", "carol"]);
    assert!(quiet.status.success());
    assert!(!String::from_utf8_lossy(&quiet.stderr).contains("created identity"));

    let set = pin_in(dir.path(), &["-v", "set", "location", "Berlin"]);
    assert!(set.status.success());
    let stderr = String::from_utf8_lossy(&set.stderr);
    assert!(stderr.contains("updated location on identity"), "stderr: {stderr}");
}
