//! Per-build rendezvous state.
//!
//! A `BuildRecord` tracks the lifecycle of one named build: unstarted, then
//! started, then finished. The driver moves the record through those
//! transitions; observers wait on them without knowing who the driver is, or
//! whether it has been scheduled yet.

use std::sync::Mutex;

use crate::rendezvous::signal::OnceSignal;
use crate::rendezvous::{BuildOutcome, RendezvousError};

/// Mutable lifecycle state, guarded by the record's mutex.
///
/// `started` and `finished` only ever transition false to true, and payload
/// and outcome are written before the corresponding flag flips. Observers
/// never read this struct directly; everything is published through the
/// signals.
#[derive(Debug)]
struct RecordState<P> {
  payload: Option<P>,
  started: bool,
  finished: bool,
  outcome: Option<BuildOutcome>,
}

/// Rendezvous state for a single named build.
///
/// Exactly one driver calls [`BuildRecord::begin`] and later
/// [`BuildRecord::complete`]; any number of observers call
/// [`BuildRecord::await_start`] and [`BuildRecord::await_completion`] in any
/// order relative to the driver. The record enforces the strictly linear
/// state machine `unstarted -> started -> finished` and rejects every
/// transition that would skip or repeat a step.
#[derive(Debug)]
pub struct BuildRecord<P> {
  name: String,
  state: Mutex<RecordState<P>>,
  start: OnceSignal,
  completion: OnceSignal,
}

impl<P> BuildRecord<P> {
  pub(crate) fn new(name: String) -> Self {
    BuildRecord {
      name,
      state: Mutex::new(RecordState {
        payload: None,
        started: false,
        finished: false,
        outcome: None,
      }),
      start: OnceSignal::new(),
      completion: OnceSignal::new(),
    }
  }

  /// The build name this record was registered under.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Claims the record for driving: publishes `payload` and signals start.
  ///
  /// Fails with [`RendezvousError::AlreadyStarted`] if another driver (or an
  /// earlier refresh) got there first; the original payload is retained so a
  /// second driver cannot overwrite an in-flight build's identity.
  pub fn begin(&self, payload: P) -> Result<(), RendezvousError> {
    let mut state = self.state.lock().unwrap();
    if state.started {
      return Err(RendezvousError::AlreadyStarted {
        name: self.name.clone(),
      });
    }
    state.payload = Some(payload);
    state.started = true;
    // Firing under the lock is fine: the signal never blocks, and it keeps
    // the signal order identical to the state transition order.
    self.start.fire();
    Ok(())
  }

  /// Publishes `payload` without claiming the record, signaling start if it
  /// has not happened yet.
  ///
  /// Observers that learn about a build before any driver use this to make
  /// the start observable. Once a build is started the call is a complete
  /// no-op: the driver's payload is untouched and no signal is re-fired.
  pub fn refresh(&self, payload: P) {
    let mut state = self.state.lock().unwrap();
    if state.started {
      return;
    }
    state.payload = Some(payload);
    state.started = true;
    self.start.fire();
  }

  /// Records the outcome and signals completion.
  ///
  /// Fails with [`RendezvousError::NotStarted`] when the build was never
  /// started, and with [`RendezvousError::AlreadyFinished`] on a second call;
  /// the rejected call leaves the first outcome intact and fires nothing, so
  /// waiters cannot hang or observe a changed result.
  pub fn complete(&self, outcome: BuildOutcome) -> Result<(), RendezvousError> {
    let mut state = self.state.lock().unwrap();
    if !state.started {
      return Err(RendezvousError::NotStarted {
        name: self.name.clone(),
      });
    }
    if state.finished {
      return Err(RendezvousError::AlreadyFinished {
        name: self.name.clone(),
      });
    }
    state.outcome = Some(outcome);
    state.finished = true;
    self.completion.fire();
    Ok(())
  }
}

impl<P: Clone> BuildRecord<P> {
  /// Waits until the build has started and returns the published payload.
  ///
  /// Returns immediately if the build already started. Blocks indefinitely
  /// otherwise; callers apply their own deadline via `tokio::time::timeout`,
  /// and a timed-out wait has no effect on the record or on other waiters.
  pub async fn await_start(&self) -> P {
    self.start.observed().await;
    let state = self.state.lock().unwrap();
    state
      .payload
      .clone()
      .expect("payload published before start signal")
  }

  /// Waits until the build has finished and returns its outcome.
  ///
  /// A build cannot finish before it starts, so this first waits for start,
  /// then for completion. A failed build is a normal return value here
  /// ([`BuildOutcome::Failure`]), never an error or a hung wait.
  pub async fn await_completion(&self) -> BuildOutcome {
    self.start.observed().await;
    self.completion.observed().await;
    let state = self.state.lock().unwrap();
    state
      .outcome
      .expect("outcome recorded before completion signal")
  }
}
