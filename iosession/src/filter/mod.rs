//! The interceptor pipeline.
//!
//! A [`FilterChain`] is an ordered list of named [`IoFilter`]s ending in an
//! [`IoHandler`]. Inbound events (everything a transport or the session
//! itself produces) enter at the first filter and travel towards the
//! handler. Outbound requests, [`filter_write`](IoFilter::filter_write) and
//! [`filter_close`](IoFilter::filter_close), enter at the last filter and
//! travel towards the session, which enqueues the write or closes the
//! transport.
//!
//! Every callback receives a [`NextFilter`]. Calling the matching method on
//! it passes the event on, not calling it swallows the event.

mod chain;
mod common;
mod logging;

use std::sync::Arc;

use tracing::warn;

use crate::{
  IoSession, Message, SessionError, WriteRequest, event::IdleStatus,
};

pub use chain::{FilterChain, FilterChainBuilder, NextFilter};
pub use common::{CommonEventFilter, CommonEvents};
pub use logging::TracingFilter;

/// One stage of a [`FilterChain`].
///
/// All callbacks forward to `next` unless overridden.
pub trait IoFilter: Send + Sync {
  fn session_created(&self, next: NextFilter<'_>, session: &Arc<IoSession>) {
    next.session_created(session)
  }

  fn session_opened(&self, next: NextFilter<'_>, session: &Arc<IoSession>) {
    next.session_opened(session)
  }

  fn session_idle(
    &self,
    next: NextFilter<'_>,
    session: &Arc<IoSession>,
    status: IdleStatus,
  ) {
    next.session_idle(session, status)
  }

  fn session_closed(&self, next: NextFilter<'_>, session: &Arc<IoSession>) {
    next.session_closed(session)
  }

  fn exception_caught(
    &self,
    next: NextFilter<'_>,
    session: &Arc<IoSession>,
    error: &SessionError,
  ) {
    next.exception_caught(session, error)
  }

  fn message_received(
    &self,
    next: NextFilter<'_>,
    session: &Arc<IoSession>,
    message: &mut Message,
  ) {
    next.message_received(session, message)
  }

  fn message_sent(
    &self,
    next: NextFilter<'_>,
    session: &Arc<IoSession>,
    request: &mut WriteRequest,
  ) {
    next.message_sent(session, request)
  }

  fn filter_write(
    &self,
    next: NextFilter<'_>,
    session: &Arc<IoSession>,
    request: WriteRequest,
  ) {
    next.filter_write(session, request)
  }

  fn filter_close(&self, next: NextFilter<'_>, session: &Arc<IoSession>) {
    next.filter_close(session)
  }
}

impl<F: IoFilter + ?Sized> IoFilter for Arc<F> {
  fn session_created(&self, next: NextFilter<'_>, session: &Arc<IoSession>) {
    (**self).session_created(next, session)
  }

  fn session_opened(&self, next: NextFilter<'_>, session: &Arc<IoSession>) {
    (**self).session_opened(next, session)
  }

  fn session_idle(
    &self,
    next: NextFilter<'_>,
    session: &Arc<IoSession>,
    status: IdleStatus,
  ) {
    (**self).session_idle(next, session, status)
  }

  fn session_closed(&self, next: NextFilter<'_>, session: &Arc<IoSession>) {
    (**self).session_closed(next, session)
  }

  fn exception_caught(
    &self,
    next: NextFilter<'_>,
    session: &Arc<IoSession>,
    error: &SessionError,
  ) {
    (**self).exception_caught(next, session, error)
  }

  fn message_received(
    &self,
    next: NextFilter<'_>,
    session: &Arc<IoSession>,
    message: &mut Message,
  ) {
    (**self).message_received(next, session, message)
  }

  fn message_sent(
    &self,
    next: NextFilter<'_>,
    session: &Arc<IoSession>,
    request: &mut WriteRequest,
  ) {
    (**self).message_sent(next, session, request)
  }

  fn filter_write(
    &self,
    next: NextFilter<'_>,
    session: &Arc<IoSession>,
    request: WriteRequest,
  ) {
    (**self).filter_write(next, session, request)
  }

  fn filter_close(&self, next: NextFilter<'_>, session: &Arc<IoSession>) {
    (**self).filter_close(next, session)
  }
}

/// Application end of a [`FilterChain`].
pub trait IoHandler: Send + Sync {
  fn session_created(&self, _session: &Arc<IoSession>) {}

  fn session_opened(&self, _session: &Arc<IoSession>) {}

  fn session_idle(&self, _session: &Arc<IoSession>, _status: IdleStatus) {}

  fn session_closed(&self, _session: &Arc<IoSession>) {}

  /// Logs the error. Override to react to it.
  fn exception_caught(&self, session: &Arc<IoSession>, error: &SessionError) {
    warn!(session_id = session.id(), error = %error, "unhandled exception");
  }

  fn message_received(&self, _session: &Arc<IoSession>, _message: &mut Message) {
  }

  fn message_sent(&self, _session: &Arc<IoSession>, _request: &mut WriteRequest) {
  }
}

/// Discards everything.
impl IoHandler for () {}

impl<H: IoHandler + ?Sized> IoHandler for Arc<H> {
  fn session_created(&self, session: &Arc<IoSession>) {
    (**self).session_created(session)
  }

  fn session_opened(&self, session: &Arc<IoSession>) {
    (**self).session_opened(session)
  }

  fn session_idle(&self, session: &Arc<IoSession>, status: IdleStatus) {
    (**self).session_idle(session, status)
  }

  fn session_closed(&self, session: &Arc<IoSession>) {
    (**self).session_closed(session)
  }

  fn exception_caught(&self, session: &Arc<IoSession>, error: &SessionError) {
    (**self).exception_caught(session, error)
  }

  fn message_received(&self, session: &Arc<IoSession>, message: &mut Message) {
    (**self).message_received(session, message)
  }

  fn message_sent(&self, session: &Arc<IoSession>, request: &mut WriteRequest) {
    (**self).message_sent(session, request)
  }
}
