#![allow(dead_code)]

use std::{
  collections::VecDeque,
  io,
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
  thread,
  time::Duration,
};

use iosession::{
  IoBuffer, IoSession, Message, ReceiveCompletion, SendCompletion,
  SessionError, Transport, WriteRequest,
  event::IdleStatus,
  filter::{FilterChain, IoHandler},
};
use parking_lot::Mutex;

#[derive(Default)]
struct ManualState {
  sends: VecDeque<(IoBuffer, SendCompletion)>,
  receives: VecDeque<(IoBuffer, ReceiveCompletion)>,
  wire: Vec<u8>,
  sends_issued: usize,
  receives_issued: usize,
  disconnected: bool,
  closed: bool,
  hold_on_close: bool,
}

/// Transport whose operations only complete when the test says so.
#[derive(Clone, Default)]
pub struct ManualTransport {
  state: Arc<Mutex<ManualState>>,
}

impl ManualTransport {
  pub fn new() -> Self {
    Self::default()
  }

  /// Keeps pending operations across `close`, like a transport whose
  /// completions are already on their way back.
  pub fn holding_on_close() -> Self {
    let transport = Self::default();
    transport.state.lock().hold_on_close = true;
    transport
  }

  /// Writes the whole pending buffer. Returns the byte count.
  pub fn complete_send(&self) -> usize {
    let (buf, completion) = self.pop_send();
    let n = buf.remaining();
    self.state.lock().wire.extend_from_slice(buf.chunk());
    completion.complete((Ok(n), buf));
    n
  }

  pub fn complete_send_partial(&self, n: usize) {
    let (buf, completion) = self.pop_send();
    assert!(n <= buf.remaining());
    self.state.lock().wire.extend_from_slice(&buf.chunk()[..n]);
    completion.complete((Ok(n), buf));
  }

  /// Completes the pending send with a raw count, without touching the wire.
  pub fn complete_send_with(&self, result: io::Result<usize>) {
    let (buf, completion) = self.pop_send();
    completion.complete((result, buf));
  }

  pub fn fail_send(&self, kind: io::ErrorKind) {
    self.complete_send_with(Err(io::Error::from(kind)));
  }

  pub fn drop_send(&self) {
    let pending = self.pop_send();
    drop(pending);
  }

  /// Completes the pending receive with `bytes`.
  pub fn deliver(&self, bytes: &[u8]) {
    let (mut buf, completion) = self.pop_receive();
    buf.spare_mut()[..bytes.len()].copy_from_slice(bytes);
    completion.complete((Ok(bytes.len()), buf));
  }

  pub fn deliver_eof(&self) {
    let (buf, completion) = self.pop_receive();
    completion.complete((Ok(0), buf));
  }

  pub fn fail_receive(&self, kind: io::ErrorKind) {
    let (buf, completion) = self.pop_receive();
    completion.complete((Err(io::Error::from(kind)), buf));
  }

  pub fn drop_receive(&self) {
    let pending = self.pop_receive();
    drop(pending);
  }

  /// Makes `is_connected` report `false` without closing anything.
  pub fn disconnect(&self) {
    self.state.lock().disconnected = true;
  }

  pub fn wire(&self) -> Vec<u8> {
    self.state.lock().wire.clone()
  }

  pub fn sends_issued(&self) -> usize {
    self.state.lock().sends_issued
  }

  pub fn receives_issued(&self) -> usize {
    self.state.lock().receives_issued
  }

  pub fn pending_sends(&self) -> usize {
    self.state.lock().sends.len()
  }

  pub fn pending_receives(&self) -> usize {
    self.state.lock().receives.len()
  }

  pub fn pending_send_len(&self) -> Option<usize> {
    self.state.lock().sends.front().map(|(buf, _)| buf.remaining())
  }

  pub fn was_closed(&self) -> bool {
    self.state.lock().closed
  }

  fn pop_send(&self) -> (IoBuffer, SendCompletion) {
    let pending = self.state.lock().sends.pop_front();
    pending.expect("no send pending")
  }

  fn pop_receive(&self) -> (IoBuffer, ReceiveCompletion) {
    let pending = self.state.lock().receives.pop_front();
    pending.expect("no receive pending")
  }
}

impl Transport for ManualTransport {
  fn is_connected(&self) -> bool {
    let state = self.state.lock();
    !state.disconnected && !state.closed
  }

  fn begin_send(&self, buf: IoBuffer, completion: SendCompletion) {
    let mut state = self.state.lock();
    assert!(state.sends.is_empty(), "second send issued while one is in flight");
    state.sends_issued += 1;
    state.sends.push_back((buf, completion));
  }

  fn begin_receive(&self, buf: IoBuffer, completion: ReceiveCompletion) {
    let mut state = self.state.lock();
    state.receives_issued += 1;
    state.receives.push_back((buf, completion));
  }

  fn close(&self) {
    let (sends, receives) = {
      let mut state = self.state.lock();
      state.closed = true;
      if state.hold_on_close {
        return;
      }
      (
        state.sends.drain(..).collect::<Vec<_>>(),
        state.receives.drain(..).collect::<Vec<_>>(),
      )
    };
    // Completions call back into the session.
    drop(sends);
    drop(receives);
  }
}

/// Transport that completes sends on other threads after a random delay,
/// writing a random prefix of the buffer each time.
#[derive(Clone, Default)]
pub struct ThreadedTransport {
  wire: Arc<Mutex<Vec<u8>>>,
  in_flight: Arc<AtomicUsize>,
  max_in_flight: Arc<AtomicUsize>,
  completed: Arc<AtomicUsize>,
  receives: Arc<Mutex<Vec<ReceiveCompletion>>>,
}

impl ThreadedTransport {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn wire(&self) -> Vec<u8> {
    self.wire.lock().clone()
  }

  pub fn max_in_flight(&self) -> usize {
    self.max_in_flight.load(Ordering::SeqCst)
  }

  pub fn completed_sends(&self) -> usize {
    self.completed.load(Ordering::SeqCst)
  }
}

impl Transport for ThreadedTransport {
  fn is_connected(&self) -> bool {
    true
  }

  fn begin_send(&self, buf: IoBuffer, completion: SendCompletion) {
    let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    self.max_in_flight.fetch_max(now, Ordering::SeqCst);

    let wire = Arc::clone(&self.wire);
    let in_flight = Arc::clone(&self.in_flight);
    let completed = Arc::clone(&self.completed);
    thread::spawn(move || {
      thread::sleep(Duration::from_micros(fastrand::u64(0..200)));
      let n = fastrand::usize(1..=buf.remaining());
      wire.lock().extend_from_slice(&buf.chunk()[..n]);
      in_flight.fetch_sub(1, Ordering::SeqCst);
      completed.fetch_add(1, Ordering::SeqCst);
      completion.complete((Ok(n), buf));
    });
  }

  fn begin_receive(&self, _buf: IoBuffer, completion: ReceiveCompletion) {
    self.receives.lock().push(completion);
  }

  fn close(&self) {
    let receives = std::mem::take(&mut *self.receives.lock());
    drop(receives);
  }
}

#[derive(Default)]
struct InlineState {
  wire: Vec<u8>,
  incoming: VecDeque<Vec<u8>>,
  parked: Option<ReceiveCompletion>,
}

/// Transport that completes every operation before `begin_*` returns, as
/// long as it has data to hand out.
#[derive(Clone, Default)]
pub struct InlineTransport {
  state: Arc<Mutex<InlineState>>,
}

impl InlineTransport {
  pub fn new() -> Self {
    Self::default()
  }

  /// Receives hand out `chunks` in order, then wait.
  pub fn with_incoming(chunks: impl IntoIterator<Item = Vec<u8>>) -> Self {
    let transport = Self::default();
    transport.state.lock().incoming.extend(chunks);
    transport
  }

  pub fn wire_len(&self) -> usize {
    self.state.lock().wire.len()
  }

  pub fn has_parked_receive(&self) -> bool {
    self.state.lock().parked.is_some()
  }
}

impl Transport for InlineTransport {
  fn is_connected(&self) -> bool {
    true
  }

  fn begin_send(&self, buf: IoBuffer, completion: SendCompletion) {
    let n = buf.remaining();
    self.state.lock().wire.extend_from_slice(buf.chunk());
    completion.complete((Ok(n), buf));
  }

  fn begin_receive(&self, mut buf: IoBuffer, completion: ReceiveCompletion) {
    let chunk = {
      let mut state = self.state.lock();
      match state.incoming.pop_front() {
        Some(chunk) => chunk,
        None => {
          state.parked = Some(completion);
          return;
        }
      }
    };
    buf.spare_mut()[..chunk.len()].copy_from_slice(&chunk);
    completion.complete((Ok(chunk.len()), buf));
  }

  fn close(&self) {
    let parked = self.state.lock().parked.take();
    drop(parked);
  }
}

/// Runs `f` on a thread with a deliberately small stack.
pub fn on_small_stack<T: Send + 'static>(
  f: impl FnOnce() -> T + Send + 'static,
) -> T {
  thread::Builder::new()
    .stack_size(256 * 1024)
    .spawn(f)
    .unwrap()
    .join()
    .unwrap()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
  Created,
  Opened,
  Idle(IdleStatus),
  Closed,
  Exception(String),
  Received(Vec<u8>),
  /// What the handler saw of the written buffer.
  Sent(Vec<u8>),
}

/// Handler that remembers every event it receives.
#[derive(Clone, Default)]
pub struct Recorder {
  events: Arc<Mutex<Vec<Recorded>>>,
}

impl Recorder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn events(&self) -> Vec<Recorded> {
    self.events.lock().clone()
  }

  pub fn sent(&self) -> Vec<Vec<u8>> {
    self.filter(|event| match event {
      Recorded::Sent(bytes) => Some(bytes.clone()),
      _ => None,
    })
  }

  pub fn received(&self) -> Vec<Vec<u8>> {
    self.filter(|event| match event {
      Recorded::Received(bytes) => Some(bytes.clone()),
      _ => None,
    })
  }

  pub fn exceptions(&self) -> Vec<String> {
    self.filter(|event| match event {
      Recorded::Exception(message) => Some(message.clone()),
      _ => None,
    })
  }

  pub fn count(&self, wanted: &Recorded) -> usize {
    self.events.lock().iter().filter(|event| *event == wanted).count()
  }

  fn filter<T>(&self, f: impl Fn(&Recorded) -> Option<T>) -> Vec<T> {
    self.events.lock().iter().filter_map(f).collect()
  }

  fn push(&self, event: Recorded) {
    self.events.lock().push(event);
  }
}

fn view(message: &Message) -> Vec<u8> {
  message.as_buffer().map(IoBuffer::to_vec).unwrap_or_default()
}

impl IoHandler for Recorder {
  fn session_created(&self, _session: &Arc<IoSession>) {
    self.push(Recorded::Created);
  }

  fn session_opened(&self, _session: &Arc<IoSession>) {
    self.push(Recorded::Opened);
  }

  fn session_idle(&self, _session: &Arc<IoSession>, status: IdleStatus) {
    self.push(Recorded::Idle(status));
  }

  fn session_closed(&self, _session: &Arc<IoSession>) {
    self.push(Recorded::Closed);
  }

  fn exception_caught(&self, _session: &Arc<IoSession>, error: &SessionError) {
    self.push(Recorded::Exception(error.to_string()));
  }

  fn message_received(&self, _session: &Arc<IoSession>, message: &mut Message) {
    self.push(Recorded::Received(view(message)));
  }

  fn message_sent(&self, _session: &Arc<IoSession>, request: &mut WriteRequest) {
    self.push(Recorded::Sent(view(request.message())));
  }
}

/// Session over a manual transport, ending in a recorder.
pub fn manual_session() -> (Arc<IoSession>, ManualTransport, Recorder) {
  let transport = ManualTransport::new();
  let recorder = Recorder::new();
  let session = IoSession::builder(transport.clone())
    .filter_chain(FilterChain::new(recorder.clone()))
    .build();
  (session, transport, recorder)
}

pub fn bytes(len: usize, seed: u8) -> Vec<u8> {
  (0..len).map(|i| seed.wrapping_add(i as u8)).collect()
}
