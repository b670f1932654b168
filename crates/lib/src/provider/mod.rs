//! Plugin surface.
//!
//! The `Provider` is what the declarative engine talks to: it owns the
//! process-scoped build registry and the validated tool settings, and hands
//! them to the image resource (the rendezvous driver) and the data sources
//! (observers and helpers). One provider is constructed at startup and shared
//! for the life of the process.

pub mod build_watch;
pub mod files;
pub mod image;

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::info;

use crate::packer::manifest::ManifestError;
use crate::packer::run::ToolError;
use crate::packer::vars::VarsError;
use crate::packer::version::{VersionError, detect_version};
use crate::rendezvous::{BuildRegistry, RendezvousError};
use crate::util::hash::HashError;

/// Payload a driver publishes when it claims a named build.
///
/// Observers that rendezvous on the name read the generated build UUID from
/// here once the start signal fires.
#[derive(Debug, Clone)]
pub struct BuildHandle {
  pub build_uuid: String,
}

/// Errors surfaced by provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
  #[error(transparent)]
  Rendezvous(#[from] RendezvousError),

  #[error(transparent)]
  Tool(#[from] ToolError),

  #[error(transparent)]
  Vars(#[from] VarsError),

  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error(transparent)]
  Version(#[from] VersionError),

  #[error(transparent)]
  Hash(#[from] HashError),

  /// The build finished but the user-required manifest was never written.
  #[error(
    "expected manifest at {path} but it was not created; ensure a manifest \
     post-processor writes to this path"
  )]
  ManifestNotProduced { path: String },

  /// The configured tool binary could not be validated at provider setup.
  #[error("tool binary {binary} failed validation: {source}")]
  BadToolBinary {
    binary: String,
    source: VersionError,
  },
}

/// Provider configuration.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
  /// Tool binary to invoke; resolved through PATH when not absolute.
  pub tool_binary: String,
}

impl Default for ProviderSettings {
  fn default() -> Self {
    ProviderSettings {
      tool_binary: "packer".to_string(),
    }
  }
}

/// The configured provider: validated settings plus the build registry.
#[derive(Debug)]
pub struct Provider {
  settings: ProviderSettings,
  registry: BuildRegistry<BuildHandle>,
}

impl Provider {
  /// Validates the settings and constructs the provider.
  ///
  /// The tool binary is probed with a version run so a bad path fails here,
  /// at configure time, instead of in the middle of the first build.
  pub async fn configure(settings: ProviderSettings) -> Result<Self, ProviderError> {
    let version = detect_version(&settings.tool_binary, None, &BTreeMap::new(), true)
      .await
      .map_err(|source| ProviderError::BadToolBinary {
        binary: settings.tool_binary.clone(),
        source,
      })?;
    info!(binary = %settings.tool_binary, version = %version, "provider configured");

    Ok(Provider {
      settings,
      registry: BuildRegistry::new(),
    })
  }

  /// Constructs a provider without probing the tool binary.
  ///
  /// For callers that validate availability themselves (and for tests that
  /// never touch the tool).
  pub fn with_settings(settings: ProviderSettings) -> Self {
    Provider {
      settings,
      registry: BuildRegistry::new(),
    }
  }

  pub fn settings(&self) -> &ProviderSettings {
    &self.settings
  }

  /// The process-scoped rendezvous registry.
  pub fn registry(&self) -> &BuildRegistry<BuildHandle> {
    &self.registry
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn configure_rejects_missing_binary() {
    let settings = ProviderSettings {
      tool_binary: "definitely-not-a-real-binary".to_string(),
    };
    let err = Provider::configure(settings).await.unwrap_err();
    assert!(matches!(err, ProviderError::BadToolBinary { .. }));
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn configure_accepts_working_binary() {
    use std::os::unix::fs::PermissionsExt;

    let temp = tempfile::tempdir().unwrap();
    let fake = temp.path().join("packer");
    std::fs::write(&fake, "#!/bin/sh\necho 'Packer v1.10.0'\n").unwrap();
    std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();

    let provider = Provider::configure(ProviderSettings {
      tool_binary: fake.to_string_lossy().to_string(),
    })
    .await
    .unwrap();
    assert_eq!(provider.settings().tool_binary, fake.to_string_lossy());
  }

  #[test]
  fn default_settings_use_packer_from_path() {
    assert_eq!(ProviderSettings::default().tool_binary, "packer");
  }
}
