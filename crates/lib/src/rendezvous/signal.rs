//! One-shot broadcast signal.
//!
//! A `OnceSignal` is fired at most once and observed by any number of waiters.
//! Waiters that arrive before the fire block until it happens; waiters that
//! arrive after it return immediately. Firing never blocks, whether or not
//! anyone is currently waiting.

use tokio::sync::watch;

/// A broadcast event that fires exactly once.
///
/// Built on a `watch` channel: the fire flips the watched value, which wakes
/// every current subscriber and is immediately visible to every future one.
/// The watch channel provides the acquire/release edge, so state written
/// before [`OnceSignal::fire`] is visible to any task whose
/// [`OnceSignal::observed`] returns afterwards.
#[derive(Debug)]
pub struct OnceSignal {
  tx: watch::Sender<bool>,
}

impl OnceSignal {
  /// Creates a signal in the unfired state.
  pub fn new() -> Self {
    let (tx, _rx) = watch::channel(false);
    OnceSignal { tx }
  }

  /// Fires the signal, waking all current and future waiters.
  ///
  /// Never blocks. Firing with nobody listening is fine; the event is latched
  /// and later waiters observe it immediately.
  ///
  /// # Panics
  ///
  /// Panics if called twice. A second fire means the caller broke its
  /// fire-exactly-once contract, which is a bug in the caller, not a
  /// recoverable condition.
  pub fn fire(&self) {
    let already_fired = self.tx.send_replace(true);
    assert!(!already_fired, "one-shot signal fired twice");
  }

  /// Returns whether the signal has fired.
  pub fn is_fired(&self) -> bool {
    *self.tx.borrow()
  }

  /// Waits until the signal has fired.
  ///
  /// Returns immediately if it already has. Blocks indefinitely otherwise;
  /// callers that need a deadline wrap this in `tokio::time::timeout`.
  pub async fn observed(&self) {
    let mut rx = self.tx.subscribe();
    // wait_for inspects the current value before parking, so an
    // already-fired signal never blocks. The sender lives in self, so the
    // channel cannot close while we borrow it.
    rx.wait_for(|fired| *fired)
      .await
      .expect("signal sender dropped while borrowed");
  }
}

impl Default for OnceSignal {
  fn default() -> Self {
    Self::new()
  }
}
