use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

const MANIFEST: &str = r#"
workspace: payments
projects:
  app:
    name: Payments
    env_params:
      JAVA_HOME: /opt/jdk
build_configurations:
  app_build:
    name: Build
    project_id: app
    step:
      - type: cmd_line
        file: build.sh
"#;

fn tcform_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("tcform"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("TEAMCITY_URL")
        .env_remove("TEAMCITY_TOKEN")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .current_dir(home);
    cmd
}

fn write_manifest(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("tcform.yaml");
    fs::write(&path, contents).expect("write manifest");
    path
}

#[test]
fn validate_accepts_a_good_manifest() {
    let home = TempDir::new().expect("home");
    write_manifest(&home, MANIFEST);

    tcform_cmd(home.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(contains("'payments' is valid (2 resources)"));
}

#[test]
fn validate_reports_unsupported_step_types() {
    let home = TempDir::new().expect("home");
    let manifest = MANIFEST.replace("type: cmd_line", "type: gradle");
    let path = write_manifest(&home, &manifest);

    tcform_cmd(home.path())
        .args(["validate", "-f"])
        .arg(&path)
        .assert()
        .failure()
        .stdout(contains("unsupported step type 'gradle'"))
        .stderr(contains("1 of 2 resources failed validation"));
}

#[test]
fn validate_reports_non_string_parameters() {
    let home = TempDir::new().expect("home");
    let manifest = MANIFEST.replace("/opt/jdk", "17");
    write_manifest(&home, &manifest);

    tcform_cmd(home.path())
        .arg("validate")
        .assert()
        .failure()
        .stdout(contains("validation error"));
}

#[test]
fn validate_warns_about_steps_declared_twice() {
    let home = TempDir::new().expect("home");
    let manifest = MANIFEST.replace(
        "        file: build.sh\n",
        "        code: make\n      - type: cmd_line\n        code: make test\n",
    );
    write_manifest(&home, &manifest);

    tcform_cmd(home.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(contains(
            "app_build: step #1 (cmd_line inline) is overridden by a later duplicate",
        ))
        .stdout(contains("'payments' is valid (2 resources)"));
}

#[test]
fn status_on_empty_home() {
    let home = TempDir::new().expect("home");

    tcform_cmd(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(contains("No resources recorded."));
}

#[test]
fn status_lists_pending_resources_as_json() {
    let home = TempDir::new().expect("home");
    write_manifest(&home, MANIFEST);

    let output = tcform_cmd(home.path())
        .args(["status", "--json"])
        .output()
        .expect("run status");
    assert!(output.status.success());
    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    let resources = payload[0]["resources"].as_array().expect("resources");
    assert_eq!(resources.len(), 2);
    assert!(resources.iter().all(|r| r["status"] == "pending"));
}

#[test]
fn plan_without_a_server_fails() {
    let home = TempDir::new().expect("home");
    write_manifest(&home, MANIFEST);

    tcform_cmd(home.path())
        .arg("plan")
        .assert()
        .failure()
        .stderr(contains("no server configured"));
}

#[test]
fn dry_run_on_a_fresh_workspace_needs_no_server_round_trip() {
    let home = TempDir::new().expect("home");
    write_manifest(&home, MANIFEST);

    // Nothing is recorded yet, so planning makes no remote reads.
    tcform_cmd(home.path())
        .args(["apply", "--dry-run", "--server", "http://127.0.0.1:9"])
        .assert()
        .success()
        .stdout(contains("would create project app"))
        .stdout(contains("would create build configuration app_build"));

    assert!(!home.path().join(".tcform/state/payments.json").exists());
}

#[test]
fn destroy_with_nothing_recorded() {
    let home = TempDir::new().expect("home");

    tcform_cmd(home.path())
        .args([
            "destroy",
            "--workspace",
            "payments",
            "--server",
            "http://127.0.0.1:9",
        ])
        .assert()
        .success()
        .stdout(contains("Nothing recorded for 'payments'."));
}
