use std::borrow::Cow;

use tracing::{debug, warn};

use crate::event::{IoEvent, IoFilterEvent};

use super::CommonEventFilter;

/// Logs every event passing through it and forwards it unchanged.
///
/// Exceptions are logged at `WARN`, everything else at `DEBUG`.
#[derive(Debug, Clone)]
pub struct TracingFilter {
  name: Cow<'static, str>,
}

impl TracingFilter {
  pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
    Self { name: name.into() }
  }

  pub fn name(&self) -> &str {
    &self.name
  }
}

impl Default for TracingFilter {
  fn default() -> Self {
    Self::new("tracing")
  }
}

impl CommonEventFilter for TracingFilter {
  fn filter(&self, event: IoFilterEvent<'_>) {
    let session_id = event.session().id();
    let kind = event.kind();
    match event.event() {
      IoEvent::ExceptionCaught(error) => warn!(
        filter = %self.name,
        session_id,
        kind = %kind,
        error = %error,
        "exception caught"
      ),
      IoEvent::MessageReceived(message) => debug!(
        filter = %self.name,
        session_id,
        kind = %kind,
        bytes = message.as_buffer().map(|buf| buf.remaining()),
        message_type = message.type_name(),
        "event"
      ),
      IoEvent::MessageSent(request) => debug!(
        filter = %self.name,
        session_id,
        kind = %kind,
        bytes = request.buffer().map(|buf| buf.remaining()),
        message_type = request.message().type_name(),
        "event"
      ),
      IoEvent::Write(request) => debug!(
        filter = %self.name,
        session_id,
        kind = %kind,
        bytes = request.buffer().map(|buf| buf.remaining()),
        message_type = request.message().type_name(),
        "event"
      ),
      IoEvent::SessionIdle(status) => debug!(
        filter = %self.name,
        session_id,
        kind = %kind,
        status = ?status,
        "event"
      ),
      _ => debug!(filter = %self.name, session_id, kind = %kind, "event"),
    }
    event.fire();
  }
}
