//! End-to-end tests for the cddlc binary.
//!
//! Each test invokes the compiled binary on a fixture (or a temp file) and
//! asserts on exit status and output.

use std::path::Path;
use std::process::{Command, Output};

fn cddlc(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cddlc"))
        .args(args)
        .output()
        .expect("failed to invoke cddlc")
}

fn fixture(name: &str) -> String {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../tests/fixtures")
        .join(name)
        .display()
        .to_string()
}

#[test]
fn dump_and_reserialize_fixture() {
    let path = fixture("person.cddl");
    let output = cddlc(&[&path]);
    assert!(
        output.status.success(),
        "cddlc failed:\nstderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Abstract syntax tree (AST)"));
    assert!(stdout.contains("AST re-serialization"));

    // The dump ends with the re-serialized text, byte-identical to the file.
    let source = std::fs::read_to_string(fixture("person.cddl")).expect("missing fixture");
    assert!(stdout.ends_with(&source));
}

#[test]
fn check_mode_is_silent() {
    for name in [
        "person.cddl",
        "choices.cddl",
        "ranges.cddl",
        "controls.cddl",
        "generics.cddl",
        "reputation.cddl",
    ] {
        let output = cddlc(&["--check", &fixture(name)]);
        assert!(
            output.status.success(),
            "cddlc --check failed for {name}:\nstderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        assert!(output.stdout.is_empty(), "--check printed output for {name}");
    }
}

#[test]
fn json_dump_is_valid_json() {
    let output = cddlc(&["--json", &fixture("ranges.cddl")]);
    assert!(output.status.success());
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is not valid JSON");
    assert!(value.get("rules").is_some());
}

#[test]
fn parse_error_exits_nonzero() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("broken.cddl");
    std::fs::write(&path, "name = tstr .funky 4\n").expect("failed to write temp file");

    let output = cddlc(&[path.to_str().expect("non-utf8 temp path")]);
    assert!(!output.status.success(), "bad input accepted");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown control operator"));
}

#[test]
fn missing_file_exits_nonzero() {
    let output = cddlc(&["/nonexistent/no-such-file.cddl"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to read"));
}
