// ABOUTME: CLI surface tests via the compiled binary.
// ABOUTME: Exercises init, argument validation, and early failure paths.

use assert_cmd::Command;
use predicates::prelude::*;

fn stockade() -> Command {
    Command::cargo_bin("stockade").unwrap()
}

#[test]
fn help_lists_subcommands() {
    stockade()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("teardown"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn init_writes_config_file() {
    let dir = tempfile::tempdir().unwrap();

    stockade()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();

    let content = std::fs::read_to_string(dir.path().join("stockade.yml")).unwrap();
    assert!(content.contains("deploy_root"));
    assert!(content.contains("probe"));
}

#[test]
fn init_refuses_to_overwrite() {
    let dir = tempfile::tempdir().unwrap();

    stockade().current_dir(dir.path()).arg("init").assert().success();
    stockade()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn init_force_overwrites() {
    let dir = tempfile::tempdir().unwrap();

    stockade().current_dir(dir.path()).arg("init").assert().success();
    stockade()
        .current_dir(dir.path())
        .args(["init", "--force"])
        .assert()
        .success();
}

#[test]
fn custom_mode_requires_services() {
    let dir = tempfile::tempdir().unwrap();

    stockade()
        .current_dir(dir.path())
        .args(["deploy", "--mode", "custom"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("custom mode requires --services"));
}

#[test]
fn unknown_service_fails_before_touching_the_host() {
    let dir = tempfile::tempdir().unwrap();

    stockade()
        .current_dir(dir.path())
        .args(["deploy", "--mode", "custom", "--services", "no-such-service"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown service"));
}

#[test]
fn invalid_service_name_is_rejected() {
    let dir = tempfile::tempdir().unwrap();

    stockade()
        .current_dir(dir.path())
        .args(["deploy", "--mode", "custom", "--services", "Bad_Name"])
        .assert()
        .failure();
}

#[test]
fn quiet_and_json_conflict() {
    stockade()
        .args(["--quiet", "--json", "status"])
        .assert()
        .failure();
}
