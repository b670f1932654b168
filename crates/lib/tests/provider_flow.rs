//! End-to-end provider flow: a fake tool binary, one driving image resource,
//! and concurrent observers rendezvousing on the build name.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::time::{sleep, timeout};

use imagebake_lib::provider::image::{ImageConfig, apply};
use imagebake_lib::provider::{Provider, ProviderSettings, build_watch};
use imagebake_lib::rendezvous::BuildOutcome;

/// Writes a fake Packer-compatible binary.
///
/// `version` answers with a version line; `build` writes a manifest to the
/// path given via IMAGEBAKE_MANIFEST_PATH and exits with `build_exit`;
/// everything else (init) succeeds silently.
fn fake_tool(dir: &Path, build_exit: i32) -> String {
  let script = format!(
    r#"#!/bin/sh
case "$1" in
  version)
    echo 'Packer v1.10.0'
    ;;
  build)
    if [ -n "$IMAGEBAKE_MANIFEST_PATH" ]; then
      echo '{{"builds": [{{"artifact_id": "ami-test"}}]}}' > "$IMAGEBAKE_MANIFEST_PATH"
    fi
    exit {build_exit}
    ;;
esac
exit 0
"#
  );
  let path = dir.join("packer");
  std::fs::write(&path, script).unwrap();
  std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
  path.to_string_lossy().to_string()
}

fn provider_with_tool(tool: String) -> Arc<Provider> {
  Arc::new(Provider::with_settings(ProviderSettings { tool_binary: tool }))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn observers_rendezvous_with_successful_build() {
  let temp = TempDir::new().unwrap();
  let provider = provider_with_tool(fake_tool(temp.path(), 0));

  // Observers subscribe before the driver is scheduled.
  let observers: Vec<_> = (0..3)
    .map(|_| {
      let provider = Arc::clone(&provider);
      tokio::spawn(async move { build_watch::watch(&provider, "img-a").await.unwrap() })
    })
    .collect();
  sleep(Duration::from_millis(30)).await;

  let config = ImageConfig {
    name: Some("img-a".to_string()),
    ..ImageConfig::default()
  };
  let state = apply(&provider, &config, None).await.unwrap();

  assert_eq!(state.tool_version.as_deref(), Some("1.10.0"));
  let manifest = state.manifest.expect("fake tool writes a manifest");
  assert_eq!(manifest["builds"][0]["artifact_id"], "ami-test");

  for observer in observers {
    let watched = timeout(Duration::from_secs(2), observer)
      .await
      .expect("observer must finish once the build completes")
      .unwrap();
    assert_eq!(watched.outcome, BuildOutcome::Success);
    assert_eq!(watched.build_uuid, state.build_uuid);
  }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_build_reaches_observers_as_failure_outcome() {
  let temp = TempDir::new().unwrap();
  let provider = provider_with_tool(fake_tool(temp.path(), 1));

  let observer = {
    let provider = Arc::clone(&provider);
    tokio::spawn(async move { build_watch::watch(&provider, "img-b").await.unwrap() })
  };
  sleep(Duration::from_millis(30)).await;

  let config = ImageConfig {
    name: Some("img-b".to_string()),
    ..ImageConfig::default()
  };
  let err = apply(&provider, &config, None).await.unwrap_err();
  assert!(err.to_string().contains("exited with status"));

  // The driver failed, but it still completed the rendezvous: the observer
  // unblocks promptly with a failure outcome instead of hanging.
  let watched = timeout(Duration::from_secs(2), observer)
    .await
    .expect("observer of a failed build must not hang")
    .unwrap();
  assert_eq!(watched.outcome, BuildOutcome::Failure);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn second_apply_with_same_name_is_rejected() {
  let temp = TempDir::new().unwrap();
  let provider = provider_with_tool(fake_tool(temp.path(), 0));

  let config = ImageConfig {
    name: Some("img-c".to_string()),
    ..ImageConfig::default()
  };
  apply(&provider, &config, None).await.unwrap();

  // Build names are one-shot within a process run.
  let err = apply(&provider, &config, None).await.unwrap_err();
  assert!(err.to_string().contains("already started"));
}

#[tokio::test]
async fn unnamed_image_skips_the_rendezvous() {
  let temp = TempDir::new().unwrap();
  let provider = provider_with_tool(fake_tool(temp.path(), 0));

  // No name: applying twice is fine, no record is ever claimed.
  let config = ImageConfig::default();
  let first = apply(&provider, &config, None).await.unwrap();
  let second = apply(&provider, &config, Some(&first)).await.unwrap();

  assert_eq!(first.id, second.id, "resource id is stable across applies");
  assert_ne!(
    first.build_uuid, second.build_uuid,
    "build uuid rotates per build"
  );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn user_manifest_path_is_honored() {
  let temp = TempDir::new().unwrap();
  let provider = provider_with_tool(fake_tool(temp.path(), 0));
  let manifest_path = temp.path().join("out").join("manifest.json");
  std::fs::create_dir_all(manifest_path.parent().unwrap()).unwrap();

  let config = ImageConfig {
    manifest_path: Some(manifest_path.to_string_lossy().to_string()),
    ..ImageConfig::default()
  };
  let state = apply(&provider, &config, None).await.unwrap();

  assert!(manifest_path.exists());
  assert!(state.manifest.is_some());
}
