//! Smoke tests for the imagebake binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn imagebake() -> Command {
  Command::cargo_bin("imagebake").unwrap()
}

#[test]
fn help_lists_subcommands() {
  imagebake()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("build"))
    .stdout(predicate::str::contains("version"))
    .stdout(predicate::str::contains("hash"));
}

#[test]
fn hash_prints_digest_for_explicit_file() {
  let temp = TempDir::new().unwrap();
  let template = temp.path().join("base.pkr.hcl");
  std::fs::write(&template, "source \"null\" \"example\" {}").unwrap();

  imagebake()
    .arg("hash")
    .arg("--file")
    .arg(&template)
    .assert()
    .success()
    .stdout(predicate::str::is_match("^[0-9a-f]{64}\n$").unwrap());
}

#[test]
fn hash_scans_directory_for_templates() {
  let temp = TempDir::new().unwrap();
  std::fs::write(temp.path().join("a.pkr.hcl"), "a").unwrap();
  std::fs::write(temp.path().join("b.pkr.json"), "b").unwrap();

  imagebake()
    .arg("hash")
    .arg("--directory")
    .arg(temp.path())
    .assert()
    .success()
    .stdout(predicate::str::is_match("^[0-9a-f]{64}\n$").unwrap());
}

#[test]
fn hash_fails_on_missing_file() {
  imagebake()
    .arg("hash")
    .arg("--file")
    .arg("/definitely/not/here.pkr.hcl")
    .assert()
    .failure()
    .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn build_fails_on_missing_job_file() {
  imagebake()
    .arg("build")
    .arg("/no/such/job.json")
    .assert()
    .failure()
    .stderr(predicate::str::contains("failed to read job file"));
}

#[test]
fn build_fails_on_malformed_job_file() {
  let temp = TempDir::new().unwrap();
  let job = temp.path().join("job.json");
  std::fs::write(&job, "{not json").unwrap();

  imagebake()
    .arg("build")
    .arg(&job)
    .assert()
    .failure()
    .stderr(predicate::str::contains("invalid job file"));
}

#[test]
fn version_fails_cleanly_without_tool() {
  imagebake()
    .arg("--tool")
    .arg("definitely-not-a-real-binary")
    .arg("version")
    .assert()
    .failure()
    .stderr(predicate::str::contains("could not run"));
}

#[cfg(unix)]
mod with_fake_tool {
  use super::*;
  use std::os::unix::fs::PermissionsExt;

  fn fake_tool(dir: &std::path::Path) -> std::path::PathBuf {
    let script = r#"#!/bin/sh
case "$1" in
  version)
    echo 'Packer v1.10.0'
    ;;
  build)
    if [ -n "$IMAGEBAKE_MANIFEST_PATH" ]; then
      echo '{"builds": []}' > "$IMAGEBAKE_MANIFEST_PATH"
    fi
    ;;
esac
exit 0
"#;
    let path = dir.join("packer");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
  }

  #[test]
  fn version_reports_fake_tool() {
    let temp = TempDir::new().unwrap();
    let tool = fake_tool(temp.path());

    imagebake()
      .arg("--tool")
      .arg(&tool)
      .arg("version")
      .assert()
      .success()
      .stdout("1.10.0\n");
  }

  #[test]
  fn build_job_produces_state_json() {
    let temp = TempDir::new().unwrap();
    let tool = fake_tool(temp.path());
    let job = temp.path().join("job.json");
    std::fs::write(&job, r#"{ "name": "img-cli" }"#).unwrap();

    let assert = imagebake()
      .arg("--tool")
      .arg(&tool)
      .arg("build")
      .arg(&job)
      .assert()
      .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let state: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(state["id"].is_string());
    assert!(state["build_uuid"].is_string());
    assert_eq!(state["tool_version"], "1.10.0");
  }
}
