//! CLI integration tests using assert_cmd
//!
//! These tests verify the CLI commands work correctly end-to-end.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Get a command instance for the jobtrack binary, isolated in `data_dir`
fn jobtrack_cmd(data_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("jobtrack").expect("Failed to find jobtrack binary");
    cmd.env("JOBTRACK_DATA_DIR", data_dir)
        .env("HOME", data_dir)
        .env_remove("JOBTRACK_BACKEND")
        .env_remove("JOBTRACK_FLAT_QUOTA")
        .env_remove("JOBTRACK_LOG");
    cmd
}

fn register(data_dir: &Path) {
    jobtrack_cmd(data_dir)
        .args(["register", "--email", "ada@example.com", "--name", "Ada"])
        .args(["--password", "hunter2"])
        .assert()
        .success();
}

/// Run a command that prints `... (<id>)` and return the id
fn created_id(cmd: &mut Command) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    let stdout = String::from_utf8(output).expect("stdout is not UTF-8");
    let start = stdout.rfind('(').expect("no id in output") + 1;
    let end = stdout.rfind(')').expect("no id in output");
    stdout[start..end].to_string()
}

fn add_company(data_dir: &Path, name: &str) -> String {
    created_id(
        jobtrack_cmd(data_dir)
            .args(["company", "add", name, "--location", "Berlin"])
            .args(["--type", "Startup", "--rating", "4"]),
    )
}

fn add_application(data_dir: &Path, company_id: &str, position: &str) -> String {
    created_id(
        jobtrack_cmd(data_dir)
            .args(["app", "add", position, "--company", company_id])
            .args(["--date", "2024-05-01", "--type", "internship", "--role", "AI/ML"]),
    )
}

#[test]
fn test_help_command() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    jobtrack_cmd(temp_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "jobtrack - Track companies and job applications",
        ));
}

#[test]
fn test_version_command() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    jobtrack_cmd(temp_dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("jobtrack"));
}

#[test]
fn test_company_help() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    jobtrack_cmd(temp_dir.path())
        .args(["company", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Manage companies"));
}

#[test]
fn test_commands_require_login() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    jobtrack_cmd(temp_dir.path())
        .args(["company", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not logged in"));
}

#[test]
fn test_register_login_logout() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    register(temp_dir.path());

    jobtrack_cmd(temp_dir.path())
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ada <ada@example.com>"));

    jobtrack_cmd(temp_dir.path())
        .arg("logout")
        .assert()
        .success();
    jobtrack_cmd(temp_dir.path())
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in"));

    jobtrack_cmd(temp_dir.path())
        .args(["login", "--email", "ada@example.com", "--password", "wrong"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid email or password"));

    jobtrack_cmd(temp_dir.path())
        .args(["login", "--email", "ADA@example.com", "--password", "hunter2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged in as Ada"));
}

#[test]
fn test_register_rejects_duplicate_email() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    register(temp_dir.path());

    jobtrack_cmd(temp_dir.path())
        .args(["register", "--email", "ada@example.com", "--name", "Other"])
        .args(["--password", "pw"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("User already exists"));
}

#[test]
fn test_profile_rename() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    register(temp_dir.path());

    jobtrack_cmd(temp_dir.path())
        .args(["profile", "rename", "Ada Lovelace"])
        .assert()
        .success();

    // Password still works after the rename
    jobtrack_cmd(temp_dir.path())
        .args(["login", "--email", "ada@example.com", "--password", "hunter2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ada Lovelace"));
}

#[test]
fn test_company_and_application_flow() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let dir = temp_dir.path();
    register(dir);

    let company_id = add_company(dir, "Acme");
    let app_id = add_application(dir, &company_id, "ML Intern");

    jobtrack_cmd(dir)
        .args(["company", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Acme (Startup, Berlin) 4/5"));

    jobtrack_cmd(dir)
        .args(["app", "status", &app_id, "interviewing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is now Interviewing"));

    jobtrack_cmd(dir)
        .args(["company", "show", &company_id])
        .assert()
        .success()
        .stdout(predicate::str::contains("ML Intern [Interviewing]"));

    jobtrack_cmd(dir)
        .args(["app", "update", &app_id, "--notes", "Onsite next week"])
        .assert()
        .success();
    jobtrack_cmd(dir)
        .args(["app", "show", &app_id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Notes: Onsite next week"))
        .stdout(predicate::str::contains("Type: internship"));

    jobtrack_cmd(dir)
        .args(["stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Interviewing: 1"));
}

#[test]
fn test_app_add_rejects_unknown_company() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    register(temp_dir.path());

    jobtrack_cmd(temp_dir.path())
        .args(["app", "add", "Engineer", "--company", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Company not found"));
}

#[test]
fn test_company_add_rejects_bad_rating() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    register(temp_dir.path());

    jobtrack_cmd(temp_dir.path())
        .args(["company", "add", "Acme", "--rating", "7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("culture rating"));
}

#[test]
fn test_company_delete_cascades() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let dir = temp_dir.path();
    register(dir);

    let company_id = add_company(dir, "Acme");
    add_application(dir, &company_id, "Engineer");
    add_application(dir, &company_id, "Analyst");

    jobtrack_cmd(dir)
        .args(["company", "delete", &company_id, "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("and 2 application(s)"));

    jobtrack_cmd(dir)
        .args(["app", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No applications found"));
}

#[test]
fn test_export_and_import() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let dir = temp_dir.path();
    register(dir);
    let company_id = add_company(dir, "Acme");
    add_application(dir, &company_id, "Engineer");

    let backup = dir.join("backup.json");
    jobtrack_cmd(dir)
        .arg("export")
        .arg("--output")
        .arg(&backup)
        .assert()
        .success();
    let content = fs::read_to_string(&backup).expect("Failed to read backup");
    assert!(content.contains("\"companies\""));
    assert!(!content.contains("password"));

    add_company(dir, "Globex");

    jobtrack_cmd(dir)
        .arg("import")
        .arg(&backup)
        .arg("--force")
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 1 companies and 1 applications"));

    jobtrack_cmd(dir)
        .args(["company", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Acme"))
        .stdout(predicate::str::contains("Globex").not());
}

#[test]
fn test_import_rejects_invalid_backup() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let dir = temp_dir.path();
    register(dir);
    add_company(dir, "Acme");

    let bad = dir.join("bad.json");
    fs::write(&bad, r#"{"foo":1}"#).expect("Failed to write file");

    jobtrack_cmd(dir)
        .arg("import")
        .arg(&bad)
        .arg("--force")
        .assert()
        .failure()
        .stderr(predicate::str::contains("backup has no 'user' object"));

    jobtrack_cmd(dir)
        .args(["company", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Acme"));
}

#[test]
fn test_info_reports_sqlite() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    jobtrack_cmd(temp_dir.path())
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("Storage: SQLite"));
}

#[test]
fn test_flat_backend_from_env() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let dir = temp_dir.path();

    jobtrack_cmd(dir)
        .env("JOBTRACK_BACKEND", "flat")
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("Storage: Flat file"))
        .stdout(predicate::str::contains("bytes used"));

    assert!(!dir.join("jobtrack.db").exists());
}
