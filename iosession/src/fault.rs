//! Containment of listener faults.
//!
//! A filter or handler that panics while an event is being delivered must
//! not take the I/O loop down with it. The session runs every delivery
//! through [`contain`] and hands whatever was caught to the
//! [`FaultMonitor`] it was constructed with.

use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

use crate::SessionError;

/// Sink for faults that cannot be propagated to a caller.
pub trait FaultMonitor: Send + Sync {
  fn exception_caught(&self, error: &SessionError);
}

impl<F> FaultMonitor for F
where
  F: Fn(&SessionError) + Send + Sync,
{
  fn exception_caught(&self, error: &SessionError) {
    self(error)
  }
}

/// Logs faults at `WARN`. Used when a session is built without a monitor.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFaultMonitor;

impl FaultMonitor for TracingFaultMonitor {
  fn exception_caught(&self, error: &SessionError) {
    warn!(error = %error, "unexpected exception in listener");
  }
}

/// Runs `f`, routing a panic to `monitor` instead of unwinding further.
///
/// Returns `false` if `f` panicked.
pub(crate) fn contain<F>(monitor: &dyn FaultMonitor, f: F) -> bool
where
  F: FnOnce(),
{
  match panic::catch_unwind(AssertUnwindSafe(f)) {
    Ok(()) => true,
    Err(payload) => {
      let error = SessionError::from_panic(payload);
      // A panicking monitor must not escape either.
      let _ = panic::catch_unwind(AssertUnwindSafe(|| {
        monitor.exception_caught(&error)
      }));
      false
    }
  }
}
