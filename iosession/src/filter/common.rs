use std::sync::Arc;

use crate::{
  IoSession, Message, SessionError, WriteRequest,
  event::{IdleStatus, IoEvent, IoFilterEvent},
};

use super::{IoFilter, NextFilter};

/// A filter that treats every event the same way.
///
/// Wrap an implementation in [`CommonEvents`] to put it in a chain. The
/// event only travels further if `filter` calls [`IoFilterEvent::fire`].
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// use iosession::event::IoFilterEvent;
/// use iosession::filter::{CommonEventFilter, CommonEvents, FilterChain};
///
/// #[derive(Default)]
/// struct Counter(AtomicUsize);
///
/// impl CommonEventFilter for Counter {
///   fn filter(&self, event: IoFilterEvent<'_>) {
///     self.0.fetch_add(1, Ordering::Relaxed);
///     event.fire();
///   }
/// }
///
/// let chain = FilterChain::builder()
///   .add_last("count", CommonEvents(Counter::default()))
///   .build(());
/// assert!(chain.contains("count"));
/// ```
pub trait CommonEventFilter: Send + Sync {
  fn filter(&self, event: IoFilterEvent<'_>);
}

/// Adapts a [`CommonEventFilter`] to the nine [`IoFilter`] callbacks.
#[derive(Debug, Default, Clone)]
pub struct CommonEvents<F>(pub F);

impl<F> CommonEvents<F> {
  pub fn get_ref(&self) -> &F {
    &self.0
  }

  pub fn into_inner(self) -> F {
    self.0
  }
}

impl<F: CommonEventFilter> IoFilter for CommonEvents<F> {
  fn session_created(&self, next: NextFilter<'_>, session: &Arc<IoSession>) {
    self.0.filter(IoFilterEvent::new(next, session, IoEvent::SessionCreated))
  }

  fn session_opened(&self, next: NextFilter<'_>, session: &Arc<IoSession>) {
    self.0.filter(IoFilterEvent::new(next, session, IoEvent::SessionOpened))
  }

  fn session_idle(
    &self,
    next: NextFilter<'_>,
    session: &Arc<IoSession>,
    status: IdleStatus,
  ) {
    self.0.filter(IoFilterEvent::new(next, session, IoEvent::SessionIdle(status)))
  }

  fn session_closed(&self, next: NextFilter<'_>, session: &Arc<IoSession>) {
    self.0.filter(IoFilterEvent::new(next, session, IoEvent::SessionClosed))
  }

  fn exception_caught(
    &self,
    next: NextFilter<'_>,
    session: &Arc<IoSession>,
    error: &SessionError,
  ) {
    self.0.filter(IoFilterEvent::new(
      next,
      session,
      IoEvent::ExceptionCaught(error),
    ))
  }

  fn message_received(
    &self,
    next: NextFilter<'_>,
    session: &Arc<IoSession>,
    message: &mut Message,
  ) {
    self.0.filter(IoFilterEvent::new(
      next,
      session,
      IoEvent::MessageReceived(message),
    ))
  }

  fn message_sent(
    &self,
    next: NextFilter<'_>,
    session: &Arc<IoSession>,
    request: &mut WriteRequest,
  ) {
    let event = IoEvent::MessageSent(request);
    self.0.filter(IoFilterEvent::new(next, session, event))
  }

  fn filter_write(
    &self,
    next: NextFilter<'_>,
    session: &Arc<IoSession>,
    request: WriteRequest,
  ) {
    self.0.filter(IoFilterEvent::new(next, session, IoEvent::Write(request)))
  }

  fn filter_close(&self, next: NextFilter<'_>, session: &Arc<IoSession>) {
    self.0.filter(IoFilterEvent::new(next, session, IoEvent::Close))
  }
}
