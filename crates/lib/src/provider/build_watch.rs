//! The build-watch data source: a rendezvous observer.
//!
//! Lets a configuration reference a build defined elsewhere by name alone:
//! reading the data source blocks until that build has started and finished,
//! then exposes the driver's build UUID and the outcome. The wait carries no
//! deadline of its own; the engine's own timeout or cancellation applies.

use tracing::debug;

use crate::provider::{Provider, ProviderError};
use crate::rendezvous::BuildOutcome;

/// What an observer learns once the watched build has finished.
#[derive(Debug, Clone)]
pub struct WatchedBuild {
  pub name: String,
  pub build_uuid: String,
  pub outcome: BuildOutcome,
}

/// Waits for the named build to start and finish.
///
/// The record is created on first reference, so it does not matter whether
/// the observer or the driver is scheduled first. A failed build is a normal
/// return with [`BuildOutcome::Failure`], not an error.
pub async fn watch(provider: &Provider, name: &str) -> Result<WatchedBuild, ProviderError> {
  let record = provider.registry().get_or_create(name)?;

  debug!(name = %name, "waiting for build");
  let handle = record.await_start().await;
  let outcome = record.await_completion().await;
  debug!(name = %name, success = outcome.is_success(), "watched build finished");

  Ok(WatchedBuild {
    name: name.to_string(),
    build_uuid: handle.build_uuid,
    outcome,
  })
}
