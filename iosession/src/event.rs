//! Normalized events.
//!
//! Every callback on [`IoFilter`](crate::filter::IoFilter) has a matching
//! [`IoEvent`] variant. A [`CommonEventFilter`](crate::filter::CommonEventFilter)
//! receives all of them through one method as an [`IoFilterEvent`].

use std::{fmt, sync::Arc};

use crate::{
  IoSession, Message, SessionError, WriteRequest, filter::NextFilter,
};

/// Kind of an [`IoEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoEventType {
  SessionCreated,
  SessionOpened,
  SessionIdle,
  SessionClosed,
  ExceptionCaught,
  MessageReceived,
  MessageSent,
  Write,
  Close,
}

impl IoEventType {
  pub const ALL: [IoEventType; 9] = [
    Self::SessionCreated,
    Self::SessionOpened,
    Self::SessionIdle,
    Self::SessionClosed,
    Self::ExceptionCaught,
    Self::MessageReceived,
    Self::MessageSent,
    Self::Write,
    Self::Close,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::SessionCreated => "session_created",
      Self::SessionOpened => "session_opened",
      Self::SessionIdle => "session_idle",
      Self::SessionClosed => "session_closed",
      Self::ExceptionCaught => "exception_caught",
      Self::MessageReceived => "message_received",
      Self::MessageSent => "message_sent",
      Self::Write => "write",
      Self::Close => "close",
    }
  }
}

impl fmt::Display for IoEventType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Which direction has been quiet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdleStatus {
  ReaderIdle,
  WriterIdle,
  BothIdle,
}

/// One event together with its payload.
#[derive(Debug)]
pub enum IoEvent<'a> {
  SessionCreated,
  SessionOpened,
  SessionIdle(IdleStatus),
  SessionClosed,
  ExceptionCaught(&'a SessionError),
  MessageReceived(&'a mut Message),
  MessageSent(&'a mut WriteRequest),
  Write(WriteRequest),
  Close,
}

impl IoEvent<'_> {
  pub fn kind(&self) -> IoEventType {
    match self {
      Self::SessionCreated => IoEventType::SessionCreated,
      Self::SessionOpened => IoEventType::SessionOpened,
      Self::SessionIdle(_) => IoEventType::SessionIdle,
      Self::SessionClosed => IoEventType::SessionClosed,
      Self::ExceptionCaught(_) => IoEventType::ExceptionCaught,
      Self::MessageReceived(_) => IoEventType::MessageReceived,
      Self::MessageSent(_) => IoEventType::MessageSent,
      Self::Write(_) => IoEventType::Write,
      Self::Close => IoEventType::Close,
    }
  }
}

/// An event in flight through a filter chain.
///
/// Dropping it stops the event at the current filter. Call
/// [`fire`](IoFilterEvent::fire) to hand it on.
pub struct IoFilterEvent<'a> {
  next: NextFilter<'a>,
  session: &'a Arc<IoSession>,
  event: IoEvent<'a>,
}

impl<'a> IoFilterEvent<'a> {
  pub fn new(
    next: NextFilter<'a>,
    session: &'a Arc<IoSession>,
    event: IoEvent<'a>,
  ) -> Self {
    Self { next, session, event }
  }

  pub fn kind(&self) -> IoEventType {
    self.event.kind()
  }

  pub fn session(&self) -> &'a Arc<IoSession> {
    self.session
  }

  pub fn event(&self) -> &IoEvent<'a> {
    &self.event
  }

  pub fn event_mut(&mut self) -> &mut IoEvent<'a> {
    &mut self.event
  }

  pub fn into_parts(self) -> (NextFilter<'a>, &'a Arc<IoSession>, IoEvent<'a>) {
    (self.next, self.session, self.event)
  }

  /// Passes the event to the next filter in its direction of travel.
  pub fn fire(self) {
    let Self { next, session, event } = self;
    match event {
      IoEvent::SessionCreated => next.session_created(session),
      IoEvent::SessionOpened => next.session_opened(session),
      IoEvent::SessionIdle(status) => next.session_idle(session, status),
      IoEvent::SessionClosed => next.session_closed(session),
      IoEvent::ExceptionCaught(error) => next.exception_caught(session, error),
      IoEvent::MessageReceived(message) => {
        next.message_received(session, message)
      }
      IoEvent::MessageSent(request) => next.message_sent(session, request),
      IoEvent::Write(request) => next.filter_write(session, request),
      IoEvent::Close => next.filter_close(session),
    }
  }
}

impl fmt::Debug for IoFilterEvent<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("IoFilterEvent")
      .field("session", &self.session.id())
      .field("event", &self.event)
      .finish()
  }
}
