//! Integration tests for the arbor binary
//!
//! These drive the built CLI end to end on temporary files.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const GUARD_OLD: &str = r#"function foo() { return 1; }
function bar() { console.log("Bar says: " + x.greeting); }
function test() { bar(); foo(); }
"#;

const GUARD_NEW: &str = r#"function foo() { return 1; }
function bar() { if (!x) return; console.log("Bar says: " + x.greeting); }
function test() { bar(); foo(); }
"#;

fn arbor(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_arbor"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run arbor")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

fn write_pair(dir: &Path, old: &str, new: &str) {
    fs::write(dir.join("old.js"), old).unwrap();
    fs::write(dir.join("new.js"), new).unwrap();
}

#[test]
fn test_cli_invocation() {
    let dir = TempDir::new().unwrap();
    let output = arbor(dir.path(), &["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("Structural source diff"));

    let output = arbor(dir.path(), &["version"]);
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("Arbor v"));
}

#[test]
fn test_diff_reports_guard_as_json() {
    let dir = TempDir::new().unwrap();
    write_pair(dir.path(), GUARD_OLD, GUARD_NEW);

    let output = arbor(dir.path(), &["diff", "old.js", "new.js"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let report = stdout_json(&output);
    assert_eq!(report["schema_version"], 1);
    assert_eq!(report["unparseable"], false);
    let changes = report["changes"].as_array().unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0]["category"], "GuardInserted");
    assert_eq!(changes[0]["enclosing"], "bar");
}

#[test]
fn test_identical_files_give_an_empty_report() {
    let dir = TempDir::new().unwrap();
    write_pair(dir.path(), GUARD_OLD, GUARD_OLD);

    let output = arbor(dir.path(), &["diff", "old.js", "new.js"]);
    assert!(output.status.success());
    let report = stdout_json(&output);
    assert_eq!(report["changes"].as_array().map(|c| c.len()), Some(0));
}

#[test]
fn test_diff_text_and_yaml_formats() {
    let dir = TempDir::new().unwrap();
    write_pair(dir.path(), GUARD_OLD, GUARD_NEW);

    let text = arbor(dir.path(), &["diff", "old.js", "new.js", "--format", "text"]);
    assert!(text.status.success());
    assert!(String::from_utf8_lossy(&text.stdout).contains("GuardInserted"));

    let yaml = arbor(dir.path(), &["diff", "old.js", "new.js", "-f", "yaml"]);
    assert!(yaml.status.success());
    assert!(String::from_utf8_lossy(&yaml.stdout).contains("schema_version: 1"));
}

#[test]
fn test_unparseable_input_still_succeeds() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("old.js"), "var a = 1;\n").unwrap();
    fs::write(dir.path().join("new.js"), b"var a = \xff;\n").unwrap();

    let output = arbor(dir.path(), &["diff", "old.js", "new.js"]);
    assert!(output.status.success());
    let report = stdout_json(&output);
    assert_eq!(report["unparseable"], true);
    assert!(report["error"]["message"].as_str().unwrap().starts_with("invalid UTF-8"));
}

#[test]
fn test_configuration_errors_fail() {
    let dir = TempDir::new().unwrap();
    write_pair(dir.path(), GUARD_OLD, GUARD_NEW);

    let missing = arbor(dir.path(), &["diff", "old.js", "absent.js"]);
    assert!(!missing.status.success());

    let language = arbor(dir.path(), &["diff", "old.js", "new.js", "--lang", "cobol"]);
    assert!(!language.status.success());

    fs::write(dir.path().join("arbor.toml"), "similarity_threshold = 3.0\n").unwrap();
    let options = arbor(dir.path(), &["diff", "old.js", "new.js"]);
    assert!(!options.status.success());
    assert!(String::from_utf8_lossy(&options.stderr).contains("similarity_threshold"));
}

#[test]
fn test_config_file_and_line_mode_flag() {
    let dir = TempDir::new().unwrap();
    write_pair(dir.path(), "var a = 1;\nuse(a);\n", "var a = 2;\nuse(a);\n");
    fs::write(dir.path().join("custom.toml"), "min_anchor_size = 3\n").unwrap();

    let output = arbor(dir.path(), &["--config", "custom.toml", "diff", "old.js", "new.js", "--line-mode"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let report = stdout_json(&output);
    assert_eq!(report["diagnostics"]["anchors"], 0);
}

#[test]
fn test_batch_fixtures() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("guard_old.js"), GUARD_OLD).unwrap();
    fs::write(dir.path().join("guard_new.js"), GUARD_NEW).unwrap();
    fs::write(dir.path().join("same_old.py"), "x = 1\n").unwrap();
    fs::write(dir.path().join("same_new.py"), "x = 1\n").unwrap();

    let output = arbor(dir.path(), &["batch", "--fixtures", "."]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let outcomes = stdout_json(&output);
    let outcomes = outcomes.as_array().unwrap();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0]["report"]["changes"][0]["category"], "GuardInserted");
    assert_eq!(outcomes[1]["report"]["changes"].as_array().map(|c| c.len()), Some(0));
}

#[test]
fn test_bindings_command() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("app.js"), "var a = require('foo'), b = 10;\n").unwrap();

    let output = arbor(dir.path(), &["bindings", "app.js"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("a\tTOP\tdefinite"));
    assert!(stdout.contains("b\tCHANGED\tdefinite"));
}
