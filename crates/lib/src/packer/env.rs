//! Child process environment assembly.
//!
//! The tool never inherits the provider's environment implicitly: the full
//! child environment is assembled here and handed to the spawner, which
//! clears everything else. Pass-through of the current process environment is
//! opt-out per resource, caller-supplied variables win over inherited ones,
//! and every invocation is stamped with a fresh run UUID.

use std::collections::BTreeMap;

use uuid::Uuid;

/// Environment variable carrying the manifest path into the tool, for
/// templates that wire their manifest post-processor to `env("…")`.
pub const MANIFEST_PATH_VAR: &str = "IMAGEBAKE_MANIFEST_PATH";

/// Packer reads this to fix the run UUID of a build.
pub const RUN_UUID_VAR: &str = "PACKER_RUN_UUID";

/// Disables the tool's update/telemetry phone-home; set for version probes so
/// they stay offline.
pub const CHECKPOINT_DISABLE_VAR: &str = "CHECKPOINT_DISABLE";

/// Assembles the child environment for one tool invocation.
///
/// With `pass_through` set, the current process environment is the base
/// layer; `extra` is overlaid on top and wins on conflicts. A fresh
/// `PACKER_RUN_UUID` is always inserted last so each invocation is uniquely
/// identifiable.
pub fn tool_env(extra: &BTreeMap<String, String>, pass_through: bool) -> BTreeMap<String, String> {
  let mut env = BTreeMap::new();
  if pass_through {
    for (key, value) in std::env::vars() {
      env.insert(key, value);
    }
  }
  for (key, value) in extra {
    env.insert(key.clone(), value.clone());
  }
  env.insert(RUN_UUID_VAR.to_string(), Uuid::new_v4().to_string());
  env
}
