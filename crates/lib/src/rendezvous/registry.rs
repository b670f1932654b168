//! Name-keyed registry of build records.
//!
//! The registry is the single shared-mutable-state boundary of the
//! rendezvous: independently scheduled tasks that only agree on a build name
//! meet here. Records are created lazily on first reference, by whichever
//! side arrives first, and live for the rest of the process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::rendezvous::record::BuildRecord;
use crate::rendezvous::{BuildOutcome, RendezvousError};

/// Registry of named build records.
///
/// One instance is created at provider startup and shared by every resource
/// and data source in the process. The inner map is the only structure
/// mutated concurrently; its lock is held just for the find-or-insert, never
/// across a wait, so one build's long-running rendezvous cannot stall
/// unrelated lookups.
#[derive(Debug)]
pub struct BuildRegistry<P> {
  builds: Mutex<HashMap<String, Arc<BuildRecord<P>>>>,
}

impl<P> BuildRegistry<P> {
  /// Creates an empty registry.
  pub fn new() -> Self {
    BuildRegistry {
      builds: Mutex::new(HashMap::new()),
    }
  }

  /// Returns the record for `name`, creating an unstarted one on first
  /// reference.
  ///
  /// Atomic with respect to concurrent creators: two tasks racing on a
  /// never-before-seen name get the same record, not two. An empty name is a
  /// usage error.
  pub fn get_or_create(&self, name: &str) -> Result<Arc<BuildRecord<P>>, RendezvousError> {
    if name.is_empty() {
      return Err(RendezvousError::EmptyName);
    }
    let mut builds = self.builds.lock().unwrap();
    let record = builds.entry(name.to_string()).or_insert_with(|| {
      debug!(name = %name, "registering build");
      Arc::new(BuildRecord::new(name.to_string()))
    });
    Ok(Arc::clone(record))
  }

  /// Claims `name` for driving: the record is created if needed, the payload
  /// published, and start signaled. See [`BuildRecord::begin`].
  pub fn begin(&self, name: &str, payload: P) -> Result<Arc<BuildRecord<P>>, RendezvousError> {
    let record = self.get_or_create(name)?;
    record.begin(payload)?;
    debug!(name = %name, "build started");
    Ok(record)
  }

  /// Publishes payload for `name` without claiming it.
  /// See [`BuildRecord::refresh`].
  pub fn refresh(&self, name: &str, payload: P) -> Result<Arc<BuildRecord<P>>, RendezvousError> {
    let record = self.get_or_create(name)?;
    record.refresh(payload);
    Ok(record)
  }

  /// Records the outcome for `name` and signals completion.
  /// See [`BuildRecord::complete`].
  pub fn complete(&self, name: &str, outcome: BuildOutcome) -> Result<(), RendezvousError> {
    let record = self.get_or_create(name)?;
    record.complete(outcome)?;
    debug!(name = %name, success = outcome.is_success(), "build finished");
    Ok(())
  }
}

impl<P> Default for BuildRegistry<P> {
  fn default() -> Self {
    Self::new()
  }
}
