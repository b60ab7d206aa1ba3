//! End-to-end coverage for the `shamash` binary's `validate` and `scan`
//! subcommands, driven against real fixture project directories.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn write_config(project: &std::path::Path, yaml: &str) {
    let configs_dir = project.join("shamash/configs");
    std::fs::create_dir_all(&configs_dir).unwrap();
    std::fs::write(configs_dir.join("asm.yml"), yaml).unwrap();
}

#[test]
fn validate_fails_when_no_config_is_present() {
    let project = TempDir::new().unwrap();

    Command::cargo_bin("shamash")
        .unwrap()
        .args(["validate", "--project"])
        .arg(project.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no config found"));
}

#[test]
fn validate_accepts_a_minimal_config() {
    let project = TempDir::new().unwrap();
    write_config(project.path(), "version: 1\nproject: {}\n");

    Command::cargo_bin("shamash")
        .unwrap()
        .args(["validate", "--project"])
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("config valid"));
}

#[test]
fn validate_rejects_an_unknown_schema_version() {
    let project = TempDir::new().unwrap();
    write_config(project.path(), "version: 2\nproject: {}\n");

    Command::cargo_bin("shamash")
        .unwrap()
        .args(["validate", "--project"])
        .arg(project.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("validation failed"));
}

#[test]
fn scan_reports_zero_findings_against_an_empty_project() {
    let project = TempDir::new().unwrap();
    write_config(project.path(), "version: 1\nproject: {}\n");

    Command::cargo_bin("shamash")
        .unwrap()
        .args(["scan", "--project"])
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("0 finding(s)"));
}

#[test]
fn scan_json_emits_an_empty_array_for_an_empty_project() {
    let project = TempDir::new().unwrap();
    write_config(project.path(), "version: 1\nproject: {}\n");

    Command::cargo_bin("shamash")
        .unwrap()
        .args(["scan", "--json", "--project"])
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}
