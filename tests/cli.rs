use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn hours(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("hours").unwrap();
    cmd.env("HOURS_VAULT_DIR", dir).env_remove("RUST_LOG");
    cmd
}

/// Data directory with automatic backups switched off
fn quiet_vault() -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("config.json"),
        r#"{ "auto_backup_enabled": false }"#,
    )
    .unwrap();
    temp
}

fn backup_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir.join("backups"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[test]
fn test_config_shows_paths() {
    let temp = TempDir::new().unwrap();
    hours(temp.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup directory"))
        .stdout(predicate::str::contains("Schema version:   4"));
}

#[test]
fn test_empty_backup_list() {
    let temp = quiet_vault();
    hours(temp.path())
        .args(["backup", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No backups found."));
}

#[test]
fn test_create_and_list_backup() {
    let temp = quiet_vault();
    hours(temp.path())
        .args(["project", "add", "Consulting"])
        .assert()
        .success();
    hours(temp.path())
        .args(["entry", "add", "Consulting", "90"])
        .assert()
        .success();

    hours(temp.path())
        .args(["backup", "create"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup created: manual_"))
        .stdout(predicate::str::contains("1 project(s), 1 time entries"));

    hours(temp.path())
        .args(["backup", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total: 1 backup(s)"));
}

#[test]
fn test_auto_backup_after_data_entry() {
    let temp = TempDir::new().unwrap();
    hours(temp.path())
        .args(["project", "add", "Consulting"])
        .assert()
        .success();

    let names = backup_names(temp.path());
    assert!(names.iter().any(|n| n.starts_with("scheduled_")));
    assert!(names.iter().any(|n| n.starts_with("periodic_")));
}

#[test]
fn test_restore_requires_force() {
    let temp = quiet_vault();
    hours(temp.path())
        .args(["project", "add", "Consulting"])
        .assert()
        .success();
    hours(temp.path())
        .args(["backup", "create"])
        .assert()
        .success();

    hours(temp.path())
        .args(["backup", "restore", "latest"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--force"));
}

#[test]
fn test_restore_brings_back_deleted_project() {
    let temp = quiet_vault();
    hours(temp.path())
        .args(["project", "add", "Consulting"])
        .assert()
        .success();
    hours(temp.path())
        .args(["backup", "create"])
        .assert()
        .success();
    hours(temp.path())
        .args(["project", "delete", "Consulting"])
        .assert()
        .success();
    hours(temp.path())
        .args(["project", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No projects found."));

    let manual = backup_names(temp.path())
        .into_iter()
        .find(|n| n.starts_with("manual_"))
        .unwrap();
    hours(temp.path())
        .args(["backup", "restore", &manual, "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored: 1 project(s)"));

    hours(temp.path())
        .args(["project", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Consulting"));
    assert!(backup_names(temp.path())
        .iter()
        .any(|n| n.starts_with("emergency_")));
}

#[test]
fn test_validate_rejects_garbage_file() {
    let temp = quiet_vault();
    let junk = temp.path().join("junk.db");
    fs::write(&junk, b"").unwrap();

    hours(temp.path())
        .args(["backup", "validate"])
        .arg(&junk)
        .assert()
        .failure()
        .stderr(predicate::str::contains("corrupted or invalid"));
}

#[test]
fn test_unknown_backup_is_not_found() {
    let temp = quiet_vault();
    hours(temp.path())
        .args(["backup", "info", "manual_19990101_000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Backup not found"));
}

#[test]
fn test_export_and_import() {
    let temp = quiet_vault();
    hours(temp.path())
        .args(["project", "add", "Consulting"])
        .assert()
        .success();
    hours(temp.path())
        .args(["backup", "create"])
        .assert()
        .success();

    let out = temp.path().join("exported.db");
    hours(temp.path())
        .args(["backup", "export", "latest"])
        .arg(&out)
        .assert()
        .success();
    assert!(out.is_file());

    hours(temp.path())
        .args(["backup", "clear", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted 1 backup(s)."));

    hours(temp.path())
        .args(["backup", "import"])
        .arg(format!("file://{}", out.display()))
        .assert()
        .success()
        .stdout(predicate::str::contains("1 project(s)"));
}
