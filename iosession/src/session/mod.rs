//! The per-connection state machine.
//!
//! An [`IoSession`] owns one [`Transport`] and keeps two loops running on
//! it:
//!
//! - **Receive loop**: always one receive outstanding. Each completion is
//!   pushed through the filter chain as message-received, then the next
//!   receive is issued.
//! - **Send loop**: runs only while there is something to write. Whoever
//!   wins the write-admission flag in [`flush`](IoSession::flush) drains the
//!   write queue, one transport send at a time, until the queue is empty.
//!
//! Both loops stop for good once the session is closed or the transport
//! stops being connected. Listener panics never reach the loops; they are
//! caught and handed to the session's [`FaultMonitor`].
//!
//! ```no_run
//! # #[cfg(feature = "tcp")]
//! # async fn run(stream: tokio::net::TcpStream) {
//! use iosession::{IoSession, TcpTransport};
//! use iosession::filter::{CommonEvents, FilterChain, TracingFilter};
//!
//! let transport = TcpTransport::new(stream, tokio::runtime::Handle::current());
//! let session = IoSession::builder(transport)
//!   .filter_chain(
//!     FilterChain::builder()
//!       .add_last("log", CommonEvents(TracingFilter::default()))
//!       .build(()),
//!   )
//!   .build();
//!
//! session.open();
//! let receipt = session.write(&b"hello"[..]);
//! # let _ = receipt;
//! # }
//! ```

mod handoff;
mod io;
mod stats;

use std::{
  fmt,
  net::SocketAddr,
  sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
  },
  time::{Duration, Instant},
};

use parking_lot::Mutex;
use tracing::debug;

use crate::{
  BufResult, FaultMonitor, IoBuffer, Message, SessionConfig, SessionError,
  TracingFaultMonitor, WriteReceipt, WriteRequest, WriteRequestQueue,
  event::IdleStatus,
  fault::contain,
  filter::FilterChain,
  transport::Transport,
};

use handoff::Handoff;

pub use stats::IoSessionStats;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// One live connection.
pub struct IoSession {
  id: u64,
  local_addr: Option<SocketAddr>,
  peer_addr: Option<SocketAddr>,
  transport: Box<dyn Transport>,
  chain: FilterChain,
  config: SessionConfig,
  fault_monitor: Arc<dyn FaultMonitor>,
  write_queue: WriteRequestQueue,
  // write admission: set while one send loop owns the queue
  writing: AtomicBool,
  current_write: Mutex<Option<WriteRequest>>,
  send_handoff: Handoff<BufResult<usize, IoBuffer>>,
  receive_handoff: Handoff<BufResult<usize, IoBuffer>>,
  closed: AtomicBool,
  stats: IoSessionStats,
}

impl IoSession {
  pub fn builder(transport: impl Transport) -> SessionBuilder {
    SessionBuilder {
      transport: Box::new(transport),
      chain: None,
      config: SessionConfig::default(),
      fault_monitor: None,
    }
  }

  /// Process-unique, assigned in creation order.
  pub fn id(&self) -> u64 {
    self.id
  }

  pub fn local_addr(&self) -> Option<SocketAddr> {
    self.local_addr
  }

  pub fn peer_addr(&self) -> Option<SocketAddr> {
    self.peer_addr
  }

  pub fn config(&self) -> &SessionConfig {
    &self.config
  }

  pub fn filter_chain(&self) -> &FilterChain {
    &self.chain
  }

  pub fn write_queue(&self) -> &WriteRequestQueue {
    &self.write_queue
  }

  pub fn stats(&self) -> &IoSessionStats {
    &self.stats
  }

  pub fn is_closed(&self) -> bool {
    self.closed.load(Ordering::Acquire)
  }

  /// Whether a send loop currently holds write admission.
  pub fn is_writing(&self) -> bool {
    self.writing.load(Ordering::Acquire)
  }

  /// Not closed, and the transport still reports a connection.
  pub fn is_connected(&self) -> bool {
    !self.is_closed() && self.transport.is_connected()
  }

  /// How long the given direction has been quiet.
  ///
  /// A direction that never saw traffic counts from session creation.
  pub fn idle_duration(&self, status: IdleStatus) -> Duration {
    let since = |last: Option<Instant>| {
      last.unwrap_or(self.stats.created()).elapsed()
    };
    match status {
      IdleStatus::ReaderIdle => since(self.stats.last_read()),
      IdleStatus::WriterIdle => since(self.stats.last_write()),
      IdleStatus::BothIdle => {
        since(self.stats.last_read()).min(since(self.stats.last_write()))
      }
    }
  }

  /// Fires session-created and session-opened, then starts the receive
  /// loop.
  pub fn open(self: &Arc<Self>) {
    self.contain(|| self.chain.fire_session_created(self));
    self.contain(|| self.chain.fire_session_opened(self));
    self.start();
  }

  /// Starts the receive loop without firing any lifecycle events.
  pub fn start(self: &Arc<Self>) {
    self.begin_receive();
  }

  /// Drains the write queue unless another caller already does.
  ///
  /// Returns [`SessionError::Closed`] on a closed session, and
  /// [`SessionError::MissingCodec`] if this call met a message that was
  /// never encoded into a buffer. Such a write is failed and reported as
  /// exception-caught; the remaining queue is still drained.
  pub fn flush(self: &Arc<Self>) -> Result<(), SessionError> {
    if self.is_closed() {
      self.fail_pending_writes();
      return Err(SessionError::Closed);
    }
    if self
      .writing
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .is_err()
    {
      return Ok(());
    }
    self.send_loop()
  }

  /// Sends `message` through the filter chain, from the handler end towards
  /// the transport.
  pub fn write(self: &Arc<Self>, message: impl Into<Message>) -> WriteReceipt {
    let (request, receipt) = WriteRequest::with_receipt(message);
    self.chain.fire_filter_write(self, request);
    receipt
  }

  /// Asks the filter chain to close the session.
  pub fn close(self: &Arc<Self>) {
    self.chain.fire_filter_close(self);
  }

  /// Closes the session right away, bypassing the filters.
  ///
  /// Closes the transport, fails every queued write with
  /// [`SessionError::Closed`] and fires session-closed. Only the first call
  /// has any effect.
  pub fn close_now(self: &Arc<Self>) {
    if self.closed.swap(true, Ordering::AcqRel) {
      return;
    }
    debug!(session_id = self.id, "closing session");
    self.transport.close();
    self.fail_pending_writes();
    self.contain(|| self.chain.fire_session_closed(self));
  }

  /// Fires session-idle through the filter chain.
  pub fn notify_idle(self: &Arc<Self>, status: IdleStatus) {
    if self.is_closed() {
      return;
    }
    self.contain(|| self.chain.fire_session_idle(self, status));
  }

  /// End of the outbound direction: queue the write and kick the send loop.
  pub(crate) fn enqueue_write(self: &Arc<Self>, request: WriteRequest) {
    if self.is_closed() {
      request.fail(SessionError::Closed);
      return;
    }
    self.write_queue.offer(request);
    // The failed write's receipt and exception-caught already carry this.
    if let Err(error) = self.flush() {
      debug!(session_id = self.id, error = %error, "flush after write failed");
    }
  }

  fn fail_pending_writes(&self) {
    for request in self.write_queue.drain() {
      request.fail(SessionError::Closed);
    }
  }

  fn contain<F: FnOnce()>(&self, f: F) -> bool {
    contain(&*self.fault_monitor, f)
  }
}

impl fmt::Debug for IoSession {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("IoSession")
      .field("id", &self.id)
      .field("local_addr", &self.local_addr)
      .field("peer_addr", &self.peer_addr)
      .field("closed", &self.is_closed())
      .field("writing", &self.is_writing())
      .field("queued", &self.write_queue.len())
      .finish()
  }
}

/// Configures an [`IoSession`] before it starts.
pub struct SessionBuilder {
  transport: Box<dyn Transport>,
  chain: Option<FilterChain>,
  config: SessionConfig,
  fault_monitor: Option<Arc<dyn FaultMonitor>>,
}

impl SessionBuilder {
  /// Defaults to an empty chain ending in `()`.
  pub fn filter_chain(mut self, chain: FilterChain) -> Self {
    self.chain = Some(chain);
    self
  }

  pub fn config(mut self, config: SessionConfig) -> Self {
    self.config = config;
    self
  }

  /// Defaults to [`TracingFaultMonitor`].
  pub fn fault_monitor(mut self, monitor: Arc<dyn FaultMonitor>) -> Self {
    self.fault_monitor = Some(monitor);
    self
  }

  pub fn build(self) -> Arc<IoSession> {
    let Self { transport, chain, config, fault_monitor } = self;
    Arc::new(IoSession {
      id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
      local_addr: transport.local_addr(),
      peer_addr: transport.peer_addr(),
      transport,
      chain: chain.unwrap_or_else(|| FilterChain::new(())),
      config,
      fault_monitor: fault_monitor.unwrap_or_else(|| {
        Arc::new(TracingFaultMonitor) as Arc<dyn FaultMonitor>
      }),
      write_queue: WriteRequestQueue::new(),
      writing: AtomicBool::new(false),
      current_write: Mutex::new(None),
      send_handoff: Handoff::new(),
      receive_handoff: Handoff::new(),
      closed: AtomicBool::new(false),
      stats: IoSessionStats::new(Instant::now()),
    })
  }
}
