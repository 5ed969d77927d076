//! CLI integration tests for csv-graph-migrate.
//!
//! These tests verify command-line argument parsing, exit codes, and the
//! dry-run / validate / script-output flows end to end.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

/// Get a command for the csv-graph-migrate binary.
fn cmd() -> Command {
    Command::cargo_bin("csv-graph-migrate").unwrap()
}

fn write_project(dir: &Path) {
    fs::write(
        dir.join("schema.yaml"),
        r#"
attributes:
  phone-number: string
  first-name: string
entities: [person]
relations: {}
"#,
    )
    .unwrap();

    fs::write(
        dir.join("config.yaml"),
        format!(
            r#"
generators:
  first-name:
    kind: ownership
    attribute: first-name
    value_type: string
  phone:
    kind: ownership
    attribute: phone-number
    value_type: string
    required: true
datasets:
  - key: persons
    data_paths: ["{}/persons.csv"]
    kind: entity
    concept_type: person
    batch_size: 10
    threads: 2
    columns:
      - generator: first-name
        column: first_name
      - generator: phone
        column: phone_number
"#,
            dir.display()
        ),
    )
    .unwrap();

    fs::write(
        dir.join("persons.csv"),
        "first_name,phone_number\nMelli,+7 171 898 0853\nJohn,+44 091\n",
    )
    .unwrap();
}

fn project_args(dir: &Path) -> Vec<String> {
    vec![
        "--config".into(),
        dir.join("config.yaml").display().to_string(),
        "--schema".into(),
        dir.join("schema.yaml").display().to_string(),
        "--status-file".into(),
        dir.join("status.json").display().to_string(),
        "--log-dir".into(),
        dir.join("logs").display().to_string(),
    ]
}

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("migrate"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_migrate_subcommand_help() {
    cmd()
        .args(["migrate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--clean"))
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--output"));
}

#[test]
fn test_missing_config_exits_nonzero() {
    cmd()
        .args(["--config", "/nonexistent/config.yaml", "validate"])
        .assert()
        .failure();
}

#[test]
fn test_validate_clean_config() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    cmd()
        .args(project_args(dir.path()))
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_validate_reports_missing_column() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    fs::write(dir.path().join("persons.csv"), "wrong_header\nx\n").unwrap();
    cmd()
        .args(project_args(dir.path()))
        .arg("validate")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("error:"));
}

#[test]
fn test_migrate_dry_run_writes_status() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    cmd()
        .args(project_args(dir.path()))
        .args(["migrate", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run completed!"));

    let status = fs::read_to_string(dir.path().join("status.json")).unwrap();
    assert!(status.contains("\"completed\": true"));
    assert!(status.contains("\"migrated_rows\": 2"));
}

#[test]
fn test_migrate_writes_statement_script() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    let output = dir.path().join("statements.tql");
    let output_arg = output.display().to_string();
    cmd()
        .args(project_args(dir.path()))
        .args(["migrate", "--output", output_arg.as_str()])
        .assert()
        .success();

    let script = fs::read_to_string(&output).unwrap();
    assert_eq!(script.lines().count(), 2);
    assert!(script.contains("has first-name \"Melli\""));
}

#[test]
fn test_migrate_clean_resets_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    let output = dir.path().join("statements.tql");
    let output_arg = output.display().to_string();

    cmd()
        .args(project_args(dir.path()))
        .args(["migrate", "--output", output_arg.as_str()])
        .assert()
        .success();

    // Second run resumes: everything completed, nothing appended.
    cmd()
        .args(project_args(dir.path()))
        .args(["migrate", "--output", output_arg.as_str()])
        .assert()
        .success();
    assert_eq!(fs::read_to_string(&output).unwrap().lines().count(), 2);

    // --clean starts over and re-appends.
    cmd()
        .args(project_args(dir.path()))
        .args(["migrate", "--clean", "--output", output_arg.as_str()])
        .assert()
        .success();
    assert_eq!(fs::read_to_string(&output).unwrap().lines().count(), 4);
}

#[test]
fn test_output_json_result() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    cmd()
        .args(project_args(dir.path()))
        .arg("--output-json")
        .args(["migrate", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"rows_migrated\": 2"));
}
