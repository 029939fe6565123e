//! Smoke tests for the `protolang` binary, driving it as a subprocess the
//! way a user would from a shell rather than through the library API.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

fn bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_protolang"))
}

fn scratch_file(name: &str, contents: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("protolang-cli-test-{}-{name}", std::process::id()));
    fs::write(&path, contents).expect("write scratch source file");
    path
}

#[test]
fn no_arguments_prints_usage_and_fails() {
    let output = Command::new(bin()).output().expect("spawn protolang");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("usage"), "stderr: {stderr}");
}

#[test]
fn missing_input_file_is_reported() {
    let output = Command::new(bin()).arg("does-not-exist.protolang").output().expect("spawn protolang");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error"), "stderr: {stderr}");
}

#[test]
fn dump_ast_prints_the_parsed_program() {
    let input = scratch_file("dump-ast.protolang", "var a : int = 2;");
    let output = Command::new(bin()).arg(&input).arg("--dump-ast").output().expect("spawn protolang");
    let _ = fs::remove_file(&input);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Var"), "expected a dumped Var declaration in:\n{stderr}");
}

#[test]
fn type_mismatch_is_diagnosed_and_fails() {
    let input = scratch_file("mismatch.protolang", "func g() -> int { return 1.0; }");
    let output = Command::new(bin()).arg(&input).output().expect("spawn protolang");
    let _ = fs::remove_file(&input);

    assert!(!output.status.success());
}
