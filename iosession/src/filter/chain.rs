use std::{borrow::Cow, fmt, sync::Arc};

use crate::{
  IoSession, Message, SessionError, WriteRequest, event::IdleStatus,
};

use super::{IoFilter, IoHandler};

struct Entry {
  name: Cow<'static, str>,
  filter: Arc<dyn IoFilter>,
}

/// Immutable, ordered list of filters ending in a handler.
///
/// Built once with a [`FilterChainBuilder`] and shared by the session for its
/// whole lifetime.
pub struct FilterChain {
  entries: Vec<Entry>,
  handler: Arc<dyn IoHandler>,
}

impl FilterChain {
  /// A chain without filters.
  pub fn new(handler: impl IoHandler + 'static) -> Self {
    Self { entries: Vec::new(), handler: Arc::new(handler) }
  }

  pub fn builder() -> FilterChainBuilder {
    FilterChainBuilder::default()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Filter names, first to last.
  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(|entry| entry.name.as_ref())
  }

  pub fn contains(&self, name: &str) -> bool {
    self.get(name).is_some()
  }

  pub fn get(&self, name: &str) -> Option<&Arc<dyn IoFilter>> {
    self
      .entries
      .iter()
      .find(|entry| entry.name == name)
      .map(|entry| &entry.filter)
  }

  pub fn handler(&self) -> &Arc<dyn IoHandler> {
    &self.handler
  }

  pub fn fire_session_created(&self, session: &Arc<IoSession>) {
    self.head().session_created(session)
  }

  pub fn fire_session_opened(&self, session: &Arc<IoSession>) {
    self.head().session_opened(session)
  }

  pub fn fire_session_idle(&self, session: &Arc<IoSession>, status: IdleStatus) {
    self.head().session_idle(session, status)
  }

  pub fn fire_session_closed(&self, session: &Arc<IoSession>) {
    self.head().session_closed(session)
  }

  pub fn fire_exception_caught(
    &self,
    session: &Arc<IoSession>,
    error: &SessionError,
  ) {
    self.head().exception_caught(session, error)
  }

  pub fn fire_message_received(
    &self,
    session: &Arc<IoSession>,
    message: &mut Message,
  ) {
    self.head().message_received(session, message)
  }

  pub fn fire_message_sent(
    &self,
    session: &Arc<IoSession>,
    request: &mut WriteRequest,
  ) {
    self.head().message_sent(session, request)
  }

  /// Sends a write from the application end towards the session.
  pub fn fire_filter_write(
    &self,
    session: &Arc<IoSession>,
    request: WriteRequest,
  ) {
    self.tail().filter_write(session, request)
  }

  /// Sends a close request from the application end towards the session.
  pub fn fire_filter_close(&self, session: &Arc<IoSession>) {
    self.tail().filter_close(session)
  }

  fn head(&self) -> NextFilter<'_> {
    NextFilter { chain: self, inbound: 0, outbound: 0 }
  }

  fn tail(&self) -> NextFilter<'_> {
    let len = self.entries.len();
    NextFilter { chain: self, inbound: len, outbound: len }
  }

  /// The continuation handed to the filter at `index`.
  fn after(&self, index: usize) -> NextFilter<'_> {
    NextFilter { chain: self, inbound: index + 1, outbound: index }
  }
}

impl fmt::Debug for FilterChain {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_list().entries(self.names()).finish()
  }
}

/// Assembles a [`FilterChain`].
///
/// # Panics
///
/// Adding two filters with the same name panics.
#[derive(Default)]
pub struct FilterChainBuilder {
  entries: Vec<Entry>,
}

impl FilterChainBuilder {
  pub fn add_first(
    mut self,
    name: impl Into<Cow<'static, str>>,
    filter: impl IoFilter + 'static,
  ) -> Self {
    let entry = self.entry(name.into(), filter);
    self.entries.insert(0, entry);
    self
  }

  pub fn add_last(
    mut self,
    name: impl Into<Cow<'static, str>>,
    filter: impl IoFilter + 'static,
  ) -> Self {
    let entry = self.entry(name.into(), filter);
    self.entries.push(entry);
    self
  }

  pub fn build(self, handler: impl IoHandler + 'static) -> FilterChain {
    FilterChain { entries: self.entries, handler: Arc::new(handler) }
  }

  fn entry(
    &self,
    name: Cow<'static, str>,
    filter: impl IoFilter + 'static,
  ) -> Entry {
    assert!(
      !self.entries.iter().any(|entry| entry.name == name),
      "FilterChainBuilder: filter `{name}` is already in the chain"
    );
    Entry { name, filter: Arc::new(filter) }
  }
}

/// Continuation of an event through the rest of a [`FilterChain`].
///
/// Inbound methods move towards the handler, outbound methods
/// ([`filter_write`](Self::filter_write), [`filter_close`](Self::filter_close))
/// move towards the session.
#[derive(Clone, Copy)]
pub struct NextFilter<'a> {
  chain: &'a FilterChain,
  // next filter to run inbound; `len` means the handler
  inbound: usize,
  // filters left to run outbound; 0 means the session
  outbound: usize,
}

macro_rules! inbound {
  ($next:ident.$method:ident($session:expr $(, $arg:expr)*)) => {
    match $next.chain.entries.get($next.inbound) {
      Some(entry) => entry.filter.$method(
        $next.chain.after($next.inbound),
        $session
        $(, $arg)*
      ),
      None => $next.chain.handler.$method($session $(, $arg)*),
    }
  };
}

impl NextFilter<'_> {
  pub fn session_created(self, session: &Arc<IoSession>) {
    inbound!(self.session_created(session))
  }

  pub fn session_opened(self, session: &Arc<IoSession>) {
    inbound!(self.session_opened(session))
  }

  pub fn session_idle(self, session: &Arc<IoSession>, status: IdleStatus) {
    inbound!(self.session_idle(session, status))
  }

  pub fn session_closed(self, session: &Arc<IoSession>) {
    inbound!(self.session_closed(session))
  }

  pub fn exception_caught(self, session: &Arc<IoSession>, error: &SessionError) {
    inbound!(self.exception_caught(session, error))
  }

  pub fn message_received(self, session: &Arc<IoSession>, message: &mut Message) {
    inbound!(self.message_received(session, message))
  }

  pub fn message_sent(
    self,
    session: &Arc<IoSession>,
    request: &mut WriteRequest,
  ) {
    inbound!(self.message_sent(session, request))
  }

  pub fn filter_write(self, session: &Arc<IoSession>, request: WriteRequest) {
    match self.outbound.checked_sub(1) {
      Some(index) => self.chain.entries[index].filter.filter_write(
        self.chain.after(index),
        session,
        request,
      ),
      None => session.enqueue_write(request),
    }
  }

  pub fn filter_close(self, session: &Arc<IoSession>) {
    match self.outbound.checked_sub(1) {
      Some(index) => self.chain.entries[index]
        .filter
        .filter_close(self.chain.after(index), session),
      None => session.close_now(),
    }
  }
}

impl fmt::Debug for NextFilter<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("NextFilter")
      .field("inbound", &self.inbound)
      .field("outbound", &self.outbound)
      .finish()
  }
}
