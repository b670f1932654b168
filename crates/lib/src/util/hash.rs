//! File digests for change detection.
//!
//! The engine decides whether a template changed by comparing digests, so
//! both the digest of a single file and the combined digest of an ordered
//! file list are provided. The combined digest folds each path string in
//! along with the file bytes: renaming a dependency changes the digest even
//! when its contents did not.

use std::fs;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HashError {
  #[error("failed to read {path}: {source}")]
  ReadFile {
    path: String,
    source: std::io::Error,
  },
}

/// SHA-256 of a single file's contents, as lowercase hex.
pub fn file_sha256(path: &Path) -> Result<String, HashError> {
  let mut hasher = Sha256::new();
  hash_file_into(&mut hasher, path)?;
  Ok(format!("{:x}", hasher.finalize()))
}

/// Combined SHA-256 over an ordered list of files.
///
/// For each entry the path string is hashed, then the file contents, in list
/// order. The result therefore depends on the order, the names, and the
/// bytes of every file.
pub fn files_sha256<I, P>(paths: I) -> Result<String, HashError>
where
  I: IntoIterator<Item = P>,
  P: AsRef<Path>,
{
  let mut hasher = Sha256::new();
  for path in paths {
    let path = path.as_ref();
    hasher.update(path.to_string_lossy().as_bytes());
    hash_file_into(&mut hasher, path)?;
  }
  Ok(format!("{:x}", hasher.finalize()))
}

fn hash_file_into(hasher: &mut Sha256, path: &Path) -> Result<(), HashError> {
  let mut file = fs::File::open(path).map_err(|e| HashError::ReadFile {
    path: path.display().to_string(),
    source: e,
  })?;

  let mut buffer = [0u8; 8192];
  loop {
    let bytes_read = file.read(&mut buffer).map_err(|e| HashError::ReadFile {
      path: path.display().to_string(),
      source: e,
    })?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }
  Ok(())
}
