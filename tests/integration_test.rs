// Integration tests for firefox-credential-dump
// Run with: cargo test --test integration_test

use std::path::Path;
use std::process::Command;

fn run_cli(args: &[&str]) -> (bool, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_firefox-credential-dump"))
        .args(args)
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (output.status.success(), stdout, stderr)
}

fn write_profiles_ini(base: &Path, sections: &[(&str, &str)]) {
    let mut content = String::from("[General]\nStartWithLastProfile=1\n\n");
    for (name, path) in sections {
        content.push_str(&format!("[{}]\nIsRelative=1\nPath={}\n\n", name, path));
    }
    std::fs::write(base.join("profiles.ini"), content).unwrap();
}

#[test]
fn test_help_lists_options() {
    let (success, stdout, stderr) = run_cli(&["--help"]);
    let combined = format!("{}{}", stdout, stderr);

    assert!(success, "--help should exit cleanly");
    assert!(
        combined.contains("--list") && combined.contains("--format"),
        "Help should list available options"
    );
}

#[test]
fn test_version_flag() {
    let (success, stdout, _) = run_cli(&["--version"]);

    assert!(success);
    assert!(stdout.contains("firefox-credential-dump"));
}

#[test]
fn test_list_prints_profiles_without_touching_nss() {
    let tmp = tempfile::tempdir().unwrap();
    write_profiles_ini(
        tmp.path(),
        &[
            ("Profile0", "abcd1234.default"),
            ("Profile1", "wxyz9876.dev-edition-default"),
        ],
    );

    let (success, stdout, _) = run_cli(&["--list", tmp.path().to_str().unwrap()]);

    assert!(success, "--list should exit cleanly");
    assert!(stdout.contains("abcd1234.default"));
    assert!(stdout.contains("wxyz9876.dev-edition-default"));
    // First-listed profile comes first.
    assert!(
        stdout.find("abcd1234.default").unwrap() < stdout.find("wxyz9876").unwrap(),
        "Profiles should be listed in profiles.ini order"
    );
}

#[test]
fn test_missing_profiles_ini_fails() {
    let tmp = tempfile::tempdir().unwrap();

    let (success, _, stderr) = run_cli(&["--list", tmp.path().to_str().unwrap()]);

    assert!(!success, "A base path without profiles.ini should fail");
    assert!(
        stderr.contains("profiles.ini"),
        "The error should mention profiles.ini, got: {}",
        stderr
    );
}

#[test]
fn test_invalid_format_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    write_profiles_ini(tmp.path(), &[("Profile0", "abcd1234.default")]);

    let (success, _, stderr) = run_cli(&[
        "--format",
        "yaml",
        tmp.path().to_str().unwrap(),
    ]);

    assert!(!success);
    assert!(stderr.contains("Invalid output format"));
}
