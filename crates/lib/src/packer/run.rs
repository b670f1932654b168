//! External tool invocation.
//!
//! The build tool is an opaque operation from the provider's point of view:
//! working directory, argument list and environment in, captured output and
//! success/failure out. Output is always captured, never streamed, because
//! the engine owns the terminal.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ToolError {
  #[error("failed to spawn {binary}: {source}")]
  Spawn {
    binary: String,
    source: std::io::Error,
  },

  #[error("{binary} {args} exited with status {code:?}; output:\n{output}")]
  Failed {
    binary: String,
    args: String,
    code: Option<i32>,
    output: String,
  },
}

/// Captured output of a finished tool invocation.
#[derive(Debug)]
pub struct ToolOutput {
  pub stdout: String,
  pub stderr: String,
}

impl ToolOutput {
  /// stdout and stderr concatenated, for error reporting.
  pub fn combined(&self) -> String {
    let mut combined = self.stdout.clone();
    if !self.stderr.is_empty() {
      if !combined.is_empty() && !combined.ends_with('\n') {
        combined.push('\n');
      }
      combined.push_str(&self.stderr);
    }
    combined
  }
}

/// Runs `binary` with `args` in `dir`, with exactly the environment `env`.
///
/// The child's environment is cleared first; whatever pass-through the caller
/// wants must already be baked into `env` (see [`crate::packer::env`]). A
/// non-zero exit is an error carrying the combined output; the environment is
/// deliberately left out of the error text since it may hold sensitive
/// values.
pub async fn run_tool(
  binary: &str,
  dir: Option<&Path>,
  env: &BTreeMap<String, String>,
  args: &[String],
) -> Result<ToolOutput, ToolError> {
  info!(binary = %binary, args = ?args, "running build tool");

  let mut command = Command::new(binary);
  command.args(args).env_clear().envs(env);
  if let Some(dir) = dir {
    command.current_dir(dir);
  }

  let output = command.output().await.map_err(|e| ToolError::Spawn {
    binary: binary.to_string(),
    source: e,
  })?;

  let tool_output = ToolOutput {
    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
  };

  if !output.status.success() {
    warn!(
      binary = %binary,
      code = ?output.status.code(),
      "build tool failed"
    );
    return Err(ToolError::Failed {
      binary: binary.to_string(),
      args: args.join(" "),
      code: output.status.code(),
      output: tool_output.combined(),
    });
  }

  if !tool_output.stdout.is_empty() {
    debug!(stdout = %tool_output.stdout.trim_end(), "tool output");
  }

  Ok(tool_output)
}
