// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! End-to-end runs of the `graftgen` binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures")
        .join(format!("{name}.json"))
}

/// A temp package directory holding `fixture` as its `graft.json`.
fn package(name: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    std::fs::copy(fixture(name), dir.path().join("graft.json")).expect("failed to copy fixture");
    dir
}

fn graftgen(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_graftgen"))
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("GRAFT_LOG")
        .output()
        .expect("failed to invoke graftgen")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn writes_generated_file_into_dir() {
    let dir = package("basic");
    let dir_arg = dir.path().to_str().unwrap();
    let output = graftgen(&["--interface", "UserMapper", "--dir", dir_arg]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let generated = std::fs::read_to_string(dir.path().join("graft_gen.go")).expect("output written");
    let header = format!(
        "// Code generated by graftgen {}. DO NOT EDIT.\n\
         // Command: graftgen -interface=UserMapper -output=graft_gen.go -dir={dir_arg}\n\
         // Source: UserMapper\n",
        env!("CARGO_PKG_VERSION")
    );
    assert!(generated.starts_with(&header), "got:\n{generated}");
    assert!(generated.contains("package basic\n"));
    assert!(generated.contains("func NewUserMapper() UserMapper {"));
    assert!(output.stdout.is_empty());
}

#[test]
fn explicit_model_and_output_name() {
    let dir = package("collections");
    let model = dir.path().join("graft.json");
    let output = graftgen(&[
        "--interface=ColMapper",
        "--dir",
        dir.path().to_str().unwrap(),
        "--model",
        model.to_str().unwrap(),
        "--output",
        "mappers.go",
        "--custom-funcs",
        "ElemToElemDTO",
        "--debug",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let generated = std::fs::read_to_string(dir.path().join("mappers.go")).expect("output written");
    assert!(generated.contains("-output=mappers.go"));
    assert!(generated.contains(" -debug -custom_funcs=ElemToElemDTO\n"));
    assert!(generated.contains("\t// I0.M0.0\n"));
    assert!(!dir.path().join("graft_gen.go").exists());
}

#[test]
fn dump_ir_prints_plan_without_writing() {
    let dir = package("collections");
    let output = graftgen(&[
        "--interface",
        "ColMapper",
        "--dir",
        dir.path().to_str().unwrap(),
        "--dump-ir",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("package collections\n"));
    assert!(stdout.contains("method Map(p0 []Elem) []ElemDTO, error [Composite]"));
    assert!(!dir.path().join("graft_gen.go").exists());
}

#[test]
fn missing_interface_fails() {
    let dir = package("basic");
    let output = graftgen(&["--interface", "Nope,UserMapper", "--dir", dir.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("error: interfaces not found: Nope"));
    assert!(!dir.path().join("graft_gen.go").exists());
}

#[test]
fn unhandled_failure_fails() {
    let dir = package("unhandled");
    let output = graftgen(&["--interface", "Mapper", "--dir", dir.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("does not return an error"));
}

#[test]
fn missing_model_fails() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let output = graftgen(&["--interface", "UserMapper", "--dir", dir.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("error: cannot read"));
}

#[test]
fn diagnostics_are_logged_as_warnings() {
    let dir = package("aliases");
    let output = graftgen(&["--interface", "AccountMapper", "--dir", dir.path().to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let err = stderr(&output);
    assert!(err.contains("warn: "));
    assert!(err.contains("cannot map int to string for dst.Count"));
    assert!(err.contains("no source for Missing"));

    let quiet = graftgen(&[
        "--interface",
        "AccountMapper",
        "--dir",
        dir.path().to_str().unwrap(),
        "--log-level",
        "error",
    ]);
    assert!(quiet.status.success());
    assert!(!stderr(&quiet).contains("warn: "));
}

#[test]
fn interface_flag_is_required() {
    let output = graftgen(&[]);
    assert!(!output.status.success());
}
