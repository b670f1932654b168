//! The template files data source.
//!
//! Produces the combined digest the engine uses to decide whether an image
//! must be rebuilt. Either an explicit template file is hashed together with
//! its declared dependencies, or a directory is scanned for `*.pkr.hcl` and
//! `*.pkr.json` templates.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::provider::ProviderError;
use crate::util::hash::{HashError, files_sha256};

/// What to hash.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FilesQuery {
  /// Explicit template file. When unset, `directory` is scanned instead.
  pub file: Option<String>,

  /// Directory to scan for templates. Defaults to the current directory.
  pub directory: Option<String>,

  /// Additional files folded into the digest.
  pub file_dependencies: Vec<String>,
}

/// Computes the combined digest for the query.
pub fn files_hash(query: &FilesQuery) -> Result<String, ProviderError> {
  let mut paths: Vec<PathBuf> = Vec::new();

  match query.file.as_deref().filter(|f| !f.is_empty()) {
    Some(file) => {
      // The template file leads, then the declared dependencies.
      paths.push(PathBuf::from(file));
      paths.extend(query.file_dependencies.iter().map(PathBuf::from));
    }
    None => {
      paths.extend(query.file_dependencies.iter().map(PathBuf::from));
      let dir = query.directory.as_deref().filter(|d| !d.is_empty()).unwrap_or(".");
      paths.extend(scan_templates(Path::new(dir))?);
    }
  }

  debug!(count = paths.len(), "hashing template files");
  Ok(files_sha256(&paths)?)
}

/// Lists `*.pkr.hcl` and `*.pkr.json` files in `dir`, sorted by name for a
/// deterministic digest.
fn scan_templates(dir: &Path) -> Result<Vec<PathBuf>, HashError> {
  let entries = std::fs::read_dir(dir).map_err(|e| HashError::ReadFile {
    path: dir.display().to_string(),
    source: e,
  })?;

  let mut templates = Vec::new();
  for entry in entries {
    let entry = entry.map_err(|e| HashError::ReadFile {
      path: dir.display().to_string(),
      source: e,
    })?;
    let name = entry.file_name();
    let name = name.to_string_lossy();
    if name.ends_with(".pkr.hcl") || name.ends_with(".pkr.json") {
      templates.push(entry.path());
    }
  }
  templates.sort();
  Ok(templates)
}
