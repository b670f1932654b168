//! Rendezvous on named builds.
//!
//! Independently scheduled tasks coordinate on the lifecycle of a named build
//! without being wired together: one *driver* runs the build and publishes
//! its start and outcome; any number of *observers* wait on those events.
//! Each name carries exactly one start and one completion; nothing here
//! retries, schedules, or orders unrelated names.

mod record;
mod registry;
mod signal;

pub use record::BuildRecord;
pub use registry::BuildRegistry;
pub use signal::OnceSignal;

use thiserror::Error;

/// Terminal result of a driven build.
///
/// A failed build is a normal terminal state, carried to observers as data.
/// It is never surfaced as an error from a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
  Success,
  Failure,
}

impl BuildOutcome {
  pub fn is_success(self) -> bool {
    matches!(self, BuildOutcome::Success)
  }

  /// Maps a driver's success flag into an outcome.
  pub fn from_success(success: bool) -> Self {
    if success {
      BuildOutcome::Success
    } else {
      BuildOutcome::Failure
    }
  }
}

/// Usage errors of the rendezvous API.
///
/// Every variant indicates a bug in the calling collaborator rather than a
/// transient condition; none of them is worth retrying, and none of them
/// leaves a record in a state that could hang a later operation.
#[derive(Debug, Error)]
pub enum RendezvousError {
  /// Build names identify records; the empty string is rejected uniformly at
  /// the boundary.
  #[error("build name must not be empty")]
  EmptyName,

  /// A second driver tried to claim an in-flight build.
  #[error("build {name:?} is already started, specify a different name")]
  AlreadyStarted { name: String },

  /// Completion was reported for a build that never started.
  #[error("build {name:?} has not been started")]
  NotStarted { name: String },

  /// Completion was reported twice; the first outcome stands.
  #[error("build {name:?} is already finished")]
  AlreadyFinished { name: String },
}
