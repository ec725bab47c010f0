use parking_lot::Mutex;

enum State<T> {
  Idle,
  Issuing,
  Completed(T),
}

/// Catches a completion delivered while the call that issued the operation
/// is still on the stack.
///
/// The issuing loop calls [`issue`](Self::issue) before handing work to the
/// transport and [`settle`](Self::settle) after the call returns. A
/// completion arriving in between is parked here and picked up by `settle`,
/// so an inline transport drives the loop iteratively instead of recursing.
pub(super) struct Handoff<T> {
  state: Mutex<State<T>>,
}

impl<T> Handoff<T> {
  pub(super) fn new() -> Self {
    Self { state: Mutex::new(State::Idle) }
  }

  pub(super) fn issue(&self) {
    *self.state.lock() = State::Issuing;
  }

  /// Ends the issuing call. Returns the outcome if it completed inline.
  pub(super) fn settle(&self) -> Option<T> {
    match std::mem::replace(&mut *self.state.lock(), State::Idle) {
      State::Completed(outcome) => Some(outcome),
      State::Idle | State::Issuing => None,
    }
  }

  /// Parks `outcome` if an issuing call is on the stack. Otherwise hands it
  /// back to the caller, which then drives the loop itself.
  pub(super) fn deliver(&self, outcome: T) -> Option<T> {
    let mut state = self.state.lock();
    match *state {
      State::Issuing => {
        *state = State::Completed(outcome);
        None
      }
      State::Idle | State::Completed(_) => Some(outcome),
    }
  }
}
