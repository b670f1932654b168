//! Build manifest handling.
//!
//! Templates that configure a manifest post-processor write a JSON summary of
//! the finished build. The provider either honors a user-supplied manifest
//! path (which then must be written to) or generates a throwaway path under
//! the system temp directory and passes it to the tool via environment
//! variable; in the latter mode a missing manifest just means the template
//! does not use one.

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("manifest_path is empty")]
  EmptyPath,

  #[error("directory for manifest_path {path} does not exist or is not a directory")]
  BadParentDir { path: String },

  #[error("failed to read manifest {path}: {source}")]
  Read {
    path: String,
    source: std::io::Error,
  },

  #[error(
    "manifest {path} is empty; ensure the template has a manifest post-processor \
     writing to the path given via IMAGEBAKE_MANIFEST_PATH"
  )]
  Empty { path: String },

  #[error("manifest {path} is not valid JSON: {source}")]
  InvalidJson {
    path: String,
    source: serde_json::Error,
  },
}

/// Where the manifest for one build run lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestPath {
  /// Path configured by the user; the build must produce a manifest here.
  User(PathBuf),
  /// Auto-generated temp path; the manifest is optional.
  Auto(PathBuf),
}

impl ManifestPath {
  pub fn path(&self) -> &Path {
    match self {
      ManifestPath::User(path) | ManifestPath::Auto(path) => path,
    }
  }

  /// Whether a missing manifest after the build is an error.
  pub fn required(&self) -> bool {
    matches!(self, ManifestPath::User(_))
  }
}

/// Resolves the manifest path for one build run.
///
/// A user-supplied path is validated (non-empty after trimming, parent
/// directory exists) but not created. Without one, a UUID-named path under
/// the system temp directory is handed out; the file is only ever created by
/// the tool itself.
pub fn resolve_manifest_path(user_path: Option<&str>) -> Result<ManifestPath, ManifestError> {
  if let Some(user_path) = user_path {
    let trimmed = user_path.trim();
    if trimmed.is_empty() {
      return Err(ManifestError::EmptyPath);
    }
    let path = PathBuf::from(trimmed);
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    let parent_ok = match parent {
      Some(parent) => parent.is_dir(),
      // A bare filename resolves against the working directory.
      None => true,
    };
    if !parent_ok {
      return Err(ManifestError::BadParentDir {
        path: trimmed.to_string(),
      });
    }
    return Ok(ManifestPath::User(path));
  }

  let name = format!("imagebake-manifest-{}.json", Uuid::new_v4());
  Ok(ManifestPath::Auto(std::env::temp_dir().join(name)))
}

/// Reads and decodes the manifest JSON.
///
/// An empty file is an error in every mode: it means the post-processor was
/// pointed at the path but produced no builds.
pub async fn read_manifest(path: &Path) -> Result<Value, ManifestError> {
  let raw = fs::read(path).await.map_err(|e| ManifestError::Read {
    path: path.display().to_string(),
    source: e,
  })?;

  if raw.is_empty() {
    return Err(ManifestError::Empty {
      path: path.display().to_string(),
    });
  }

  serde_json::from_slice(&raw).map_err(|e| ManifestError::InvalidJson {
    path: path.display().to_string(),
    source: e,
  })
}
