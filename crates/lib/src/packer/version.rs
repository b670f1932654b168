//! Tool version detection.
//!
//! `packer version` prints something like `Packer v1.11.2` followed by
//! optional update chatter; callers want the bare `1.11.2`. Version probes
//! run with checkpoint disabled so they never hit the network.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

use crate::packer::env::{self, CHECKPOINT_DISABLE_VAR};
use crate::packer::run::{ToolError, run_tool};

#[derive(Debug, Error)]
pub enum VersionError {
  #[error(transparent)]
  Tool(#[from] ToolError),

  #[error("tool printed no version output")]
  EmptyOutput,
}

/// Runs `<binary> version` and returns the parsed bare version string.
pub async fn detect_version(
  binary: &str,
  dir: Option<&Path>,
  extra_env: &BTreeMap<String, String>,
  pass_through: bool,
) -> Result<String, VersionError> {
  let mut extra = extra_env.clone();
  extra.insert(CHECKPOINT_DISABLE_VAR.to_string(), "1".to_string());
  let env = env::tool_env(&extra, pass_through);

  let output = run_tool(binary, dir, &env, &["version".to_string()]).await?;
  parse_version(&output.stdout)
}

/// Strips the `Packer` prefix and the `v` from the first line of version
/// output. Empty output is an error; the tool always reports its version.
pub fn parse_version(output: &str) -> Result<String, VersionError> {
  let first_line = output.lines().next().unwrap_or("").trim();
  if first_line.is_empty() {
    return Err(VersionError::EmptyOutput);
  }
  let version = first_line
    .strip_prefix("Packer")
    .unwrap_or(first_line)
    .trim()
    .trim_start_matches('v');
  Ok(version.to_string())
}
