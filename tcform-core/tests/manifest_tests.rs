//! Manifest error-message, atomic-write-safety, and config integration tests.

use assert_fs::prelude::*;
use predicates::prelude::predicate;
use rstest::rstest;
use std::fs;

use tcform_core::{config, manifest, ManifestError, ResourceKey, ServerConfig};

const MINIMAL: &str = "workspace: ci\nprojects:\n  app:\n    name: App\n";

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn load_missing_manifest_returns_not_found() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let err = manifest::load(&dir.path().join("tcform.yaml")).unwrap_err();
    assert!(matches!(err, ManifestError::NotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("tcform.yaml"));
}

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("tcform.yaml");
    file.write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = manifest::load(file.path()).unwrap_err();
    assert!(matches!(err, ManifestError::Parse { .. }), "got: {err}");
    let msg = err.to_string();
    assert!(msg.contains("tcform.yaml"), "must contain file path, got: {msg}");
}

#[test]
fn load_wrong_type_yaml_returns_parse_error() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("tcform.yaml");
    file.write_str("- this is a list, not a mapping\n").expect("write");

    let err = manifest::load(file.path()).unwrap_err();
    assert!(matches!(err, ManifestError::Parse { .. }), "got: {err}");
}

#[test]
fn build_configuration_without_project_id_is_a_parse_error() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("tcform.yaml");
    file.write_str("workspace: ci\nbuild_configurations:\n  b:\n    name: Build\n")
        .expect("write");

    let err = manifest::load(file.path()).unwrap_err();
    let ManifestError::Parse { source, .. } = &err else {
        panic!("expected parse error, got: {err}");
    };
    assert!(source.to_string().contains("project_id"), "got: {source}");
}

#[test]
fn blank_names_are_rejected_after_parsing() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("tcform.yaml");
    file.write_str("workspace: ci\nprojects:\n  app:\n    name: \"  \"\n")
        .expect("write");

    let err = manifest::load(file.path()).unwrap_err();
    assert!(matches!(err, ManifestError::Invalid { ref key, .. } if key == "app"), "got: {err}");

    // parse_file skips validation.
    let parsed = manifest::parse_file(file.path()).expect("parse only");
    assert_eq!(parsed.projects.len(), 1);
}

#[test]
fn non_string_parameter_values_survive_parsing() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("tcform.yaml");
    file.write_str("workspace: ci\nprojects:\n  app:\n    name: App\n    env_params:\n      RETRIES: 3\n")
        .expect("write");

    let loaded = manifest::load(file.path()).expect("load");
    let env = loaded.projects[&ResourceKey::from("app")]
        .params
        .env_params
        .as_ref()
        .expect("env_params");
    assert!(env["RETRIES"].is_number(), "codec, not parser, rejects non-strings");
}

// ---------------------------------------------------------------------------
// 2. Workspace names
// ---------------------------------------------------------------------------

#[rstest]
#[case::parent_escape("../../escaped")]
#[case::nested("team/payments")]
#[case::backslash("team\\payments")]
#[case::hidden(".payments")]
#[case::dot_dot("..")]
#[case::space("pay ments")]
#[case::empty("")]
fn unsafe_workspace_names_are_rejected(#[case] workspace: &str) {
    let yaml = format!("workspace: {workspace:?}\nprojects:\n  app:\n    name: App\n");
    let parsed: manifest::Manifest = serde_yaml::from_str(&yaml).expect("parse");
    let err = parsed.validate().unwrap_err();
    assert!(
        matches!(err, ManifestError::Invalid { ref key, .. } if key == "workspace"),
        "got: {err}"
    );
}

#[rstest]
#[case("payments")]
#[case("payments-eu_2")]
#[case("v1.2")]
fn plain_workspace_names_are_accepted(#[case] workspace: &str) {
    assert!(manifest::check_workspace_name(workspace).is_ok());
}

// ---------------------------------------------------------------------------
// 3. Atomic write safety
// ---------------------------------------------------------------------------

#[test]
fn config_save_cleans_up_tmp_file() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    config::save_at(home.path(), &ServerConfig::new("https://ci.example")).expect("save");
    home.child(".tcform/config.yaml")
        .assert(predicate::path::exists());
    home.child(".tcform/config.yaml.tmp")
        .assert(predicate::path::missing());
}

#[test]
fn mid_write_crash_leaves_original_intact() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("tcform.yaml");
    file.write_str(MINIMAL).expect("write");
    let original = fs::read(file.path()).expect("read original");

    // Simulate crash: .tmp written but process died before rename
    let tmp = dir.child("tcform.yaml.tmp");
    tmp.write_str("CRASH - INCOMPLETE WRITE").expect("write crash tmp");

    assert_eq!(original, fs::read(file.path()).expect("read after crash"));
    assert!(manifest::load(file.path()).is_ok());
}

// ---------------------------------------------------------------------------
// 4. Server config
// ---------------------------------------------------------------------------

#[test]
fn config_saved_under_tcform_dir() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    config::save_at(home.path(), &ServerConfig::new("http://tc:8111")).expect("save");
    home.child(".tcform/config.yaml").assert(predicate::path::exists());
    home.child(".tcform/config.yaml.tmp").assert(predicate::path::missing());
}

#[test]
fn corrupt_config_reports_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".tcform").create_dir_all().expect("mkdir");
    home.child(".tcform/config.yaml")
        .write_str("url: [not, a, string")
        .expect("write");
    let err = config::load_at(home.path()).unwrap_err();
    assert!(err.to_string().contains("config.yaml"), "got: {err}");
}
