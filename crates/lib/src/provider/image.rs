//! The image resource: the rendezvous driver.
//!
//! Applying an image resource runs the external tool (`init` then `build`)
//! and, when the resource carries a build name, drives that name's
//! rendezvous: start is signaled before the tool runs, and completion is
//! signaled whether the build succeeded or failed, so observers waiting on
//! the name are never left hanging.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::packer::env::{self, MANIFEST_PATH_VAR};
use crate::packer::manifest::{self, ManifestPath};
use crate::packer::run::run_tool;
use crate::packer::vars::var_args;
use crate::packer::version::detect_version;
use crate::provider::{BuildHandle, Provider, ProviderError};
use crate::rendezvous::BuildOutcome;

/// Image resource configuration as declared by the user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
  /// Name of this build for the rendezvous. Not passed to the tool.
  pub name: Option<String>,

  /// Variables passed as `-var` arguments. Map of scalars and string lists.
  pub variables: Option<Value>,

  /// Same as `variables`, but never persisted or logged by the engine.
  pub sensitive_variables: Option<Value>,

  /// Extra arguments appended to the build command line.
  pub additional_params: Vec<String>,

  /// Working directory for the tool. Defaults to the current directory.
  pub directory: Option<PathBuf>,

  /// Template file to build. Defaults to `.` (whole directory).
  pub file: Option<String>,

  /// Environment variables for the tool.
  pub environment: BTreeMap<String, String>,

  /// Do not pass the provider's own environment through to the tool.
  pub ignore_environment: bool,

  /// Force overwriting existing images.
  pub force: bool,

  /// Where the manifest post-processor writes its JSON. When set, the build
  /// must produce it; when unset, a temp path is offered via environment
  /// variable and the manifest stays optional.
  pub manifest_path: Option<String>,
}

impl ImageConfig {
  /// The trimmed build name, if the resource participates in the rendezvous.
  fn build_name(&self) -> Option<&str> {
    self.name.as_deref().map(str::trim)
  }

  fn file_param(&self) -> &str {
    match self.file.as_deref() {
      Some(file) if !file.is_empty() => file,
      _ => ".",
    }
  }

  fn directory(&self) -> Option<&Path> {
    self.directory.as_deref().filter(|d| !d.as_os_str().is_empty())
  }
}

/// Computed state of an applied image resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageState {
  /// Stable resource identity, minted on first apply.
  pub id: String,

  /// Rotated on every finished build so the engine can detect changes.
  pub build_uuid: String,

  /// Version of the tool that ran the build.
  pub tool_version: Option<String>,

  /// Decoded manifest JSON, when the template produced one.
  pub manifest: Option<Value>,
}

/// Applies the image resource: drives the build and the rendezvous.
///
/// `prior` carries the state from a previous apply, if any; its `id` is kept
/// stable. The call sequence when the resource has a build name is exactly
/// begin → run tool → complete, with the completion outcome reflecting
/// success or failure of the whole driven operation.
pub async fn apply(
  provider: &Provider,
  config: &ImageConfig,
  prior: Option<&ImageState>,
) -> Result<ImageState, ProviderError> {
  let build_uuid = Uuid::new_v4().to_string();

  // Claim the rendezvous before anything runs, so observers learn about the
  // build as soon as it is in flight.
  if let Some(name) = config.build_name() {
    provider.registry().begin(
      name,
      BuildHandle {
        build_uuid: build_uuid.clone(),
      },
    )?;
  }

  let result = run_build(provider, config).await;

  // Completion must happen on both paths; an observer of a failed build
  // unblocks with a failure outcome instead of waiting forever.
  if let Some(name) = config.build_name() {
    let outcome = BuildOutcome::from_success(result.is_ok());
    if let Err(err) = provider.registry().complete(name, outcome) {
      // Can only mean a competing completion for this name; the build result
      // below is still the authoritative one for this caller.
      warn!(name = %name, error = %err, "could not record build completion");
    }
  }

  let manifest = result?;

  let tool_version = match detect_version(
    &provider.settings().tool_binary,
    config.directory(),
    &config.environment,
    !config.ignore_environment,
  )
  .await
  {
    Ok(version) => Some(version),
    Err(err) => {
      warn!(error = %err, "could not detect tool version");
      None
    }
  };

  let id = prior
    .map(|p| p.id.clone())
    .unwrap_or_else(|| Uuid::new_v4().to_string());

  info!(id = %id, build_uuid = %build_uuid, "image applied");

  Ok(ImageState {
    id,
    build_uuid,
    tool_version,
    manifest,
  })
}

/// Runs `init` and `build` and reads back the manifest.
async fn run_build(
  provider: &Provider,
  config: &ImageConfig,
) -> Result<Option<Value>, ProviderError> {
  let binary = &provider.settings().tool_binary;
  let pass_through = !config.ignore_environment;

  let init_env = env::tool_env(&config.environment, pass_through);
  run_tool(
    binary,
    config.directory(),
    &init_env,
    &["init".to_string(), config.file_param().to_string()],
  )
  .await?;

  let manifest_path = manifest::resolve_manifest_path(config.manifest_path.as_deref())?;

  let mut build_env_extra = config.environment.clone();
  build_env_extra.insert(
    MANIFEST_PATH_VAR.to_string(),
    manifest_path.path().display().to_string(),
  );
  let build_env = env::tool_env(&build_env_extra, pass_through);

  let args = build_args(config)?;
  run_tool(binary, config.directory(), &build_env, &args).await?;

  read_manifest_after_build(&manifest_path).await
}

/// Assembles the `build` command line.
fn build_args(config: &ImageConfig) -> Result<Vec<String>, ProviderError> {
  let mut args = vec!["build".to_string()];
  args.extend(var_args(config.variables.as_ref())?);
  args.extend(var_args(config.sensitive_variables.as_ref())?);
  if config.force {
    args.push("-force".to_string());
  }
  args.extend(config.additional_params.iter().cloned());
  args.push(config.file_param().to_string());
  Ok(args)
}

async fn read_manifest_after_build(
  manifest_path: &ManifestPath,
) -> Result<Option<Value>, ProviderError> {
  let path = manifest_path.path();
  if !path.exists() {
    if manifest_path.required() {
      return Err(ProviderError::ManifestNotProduced {
        path: path.display().to_string(),
      });
    }
    // Auto path mode: the template simply does not write a manifest.
    return Ok(None);
  }
  Ok(Some(manifest::read_manifest(path).await?))
}
