//! Integration test: CLI interface.
//!
//! Runs the compiled binary as a subprocess to validate argument parsing,
//! help/version output, and fast-fail error paths that don't require a
//! downloaded Whisper model (missing file, malformed flags).

use std::process::Command;

fn binary_path() -> std::path::PathBuf {
    let mut path = std::env::current_exe()
        .expect("current_exe")
        .parent()
        .expect("parent")
        .parent()
        .expect("grandparent")
        .to_path_buf();
    path.push("callscribe");
    path
}

#[test]
fn test_help_exits_successfully() {
    let output = Command::new(binary_path())
        .arg("--help")
        .output()
        .expect("run callscribe --help");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("callscribe"));
}

#[test]
fn test_version_exits_successfully() {
    let output = Command::new(binary_path())
        .arg("--version")
        .output()
        .expect("run callscribe --version");
    assert!(output.status.success());
}

#[test]
fn test_transcribe_help_lists_audio_flag() {
    let output = Command::new(binary_path())
        .args(["transcribe", "--help"])
        .output()
        .expect("run callscribe transcribe --help");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--audio"));
}

#[test]
fn test_transcribe_missing_audio_flag_is_clap_usage_error() {
    let output = Command::new(binary_path())
        .arg("transcribe")
        .output()
        .expect("run callscribe transcribe");
    assert!(!output.status.success());
}

#[test]
fn test_transcribe_nonexistent_file_is_input_io_error() {
    let output = Command::new(binary_path())
        .args(["transcribe", "--audio", "/nonexistent/does-not-exist.wav"])
        .output()
        .expect("run callscribe transcribe --audio <missing>");
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_invalid_subcommand_is_rejected() {
    let output = Command::new(binary_path())
        .arg("not-a-real-command")
        .output()
        .expect("run callscribe not-a-real-command");
    assert!(!output.status.success());
}

#[test]
fn test_no_subcommand_prints_usage_hint() {
    let output = Command::new(binary_path())
        .output()
        .expect("run callscribe with no args");
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
}
