//! Outbound messages and the per-session write queue.

use std::{any::Any, collections::VecDeque, fmt, mem, time::Duration};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;

use crate::{IoBuffer, SessionError};

/// A message travelling through the pipeline.
///
/// Only [`Message::Buffer`] can be handed to a transport. Anything else must
/// be turned into a buffer by an encoder filter before it reaches the send
/// loop, otherwise the write fails with [`SessionError::MissingCodec`].
pub enum Message {
  Buffer(IoBuffer),
  Object { type_name: &'static str, value: Box<dyn Any + Send> },
}

impl Message {
  /// Wraps an arbitrary value, remembering its type name for diagnostics.
  pub fn object<T>(value: T) -> Self
  where
    T: Any + Send,
  {
    Self::Object { type_name: std::any::type_name::<T>(), value: Box::new(value) }
  }

  pub fn as_buffer(&self) -> Option<&IoBuffer> {
    match self {
      Self::Buffer(buf) => Some(buf),
      Self::Object { .. } => None,
    }
  }

  pub fn as_buffer_mut(&mut self) -> Option<&mut IoBuffer> {
    match self {
      Self::Buffer(buf) => Some(buf),
      Self::Object { .. } => None,
    }
  }

  pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
    match self {
      Self::Buffer(_) => None,
      Self::Object { value, .. } => value.downcast_ref(),
    }
  }

  pub fn type_name(&self) -> &'static str {
    match self {
      Self::Buffer(_) => std::any::type_name::<IoBuffer>(),
      Self::Object { type_name, .. } => *type_name,
    }
  }
}

impl fmt::Debug for Message {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Buffer(buf) => f.debug_tuple("Buffer").field(buf).finish(),
      Self::Object { type_name, .. } => {
        f.debug_struct("Object").field("type_name", type_name).finish()
      }
    }
  }
}

impl From<IoBuffer> for Message {
  fn from(value: IoBuffer) -> Self {
    Self::Buffer(value)
  }
}

impl From<Vec<u8>> for Message {
  fn from(value: Vec<u8>) -> Self {
    Self::Buffer(IoBuffer::from(value))
  }
}

impl From<&[u8]> for Message {
  fn from(value: &[u8]) -> Self {
    Self::Buffer(IoBuffer::from(value))
  }
}

impl From<bytes::Bytes> for Message {
  fn from(value: bytes::Bytes) -> Self {
    Self::Buffer(IoBuffer::from(value))
  }
}

/// What a [`WriteReceipt`] resolves to: the drained buffer, handed back with
/// its cursor where the transport left it, or the reason the write failed.
pub type WriteOutcome = Result<IoBuffer, SessionError>;

/// An outbound message plus the book-keeping needed to report its outcome.
pub struct WriteRequest {
  message: Message,
  receipt: Option<Sender<WriteOutcome>>,
}

impl WriteRequest {
  /// Creates a request nobody waits on.
  ///
  /// A buffer message is marked at its current position, which is where the
  /// session rewinds to before firing message-sent.
  pub fn new(message: impl Into<Message>) -> Self {
    let mut message = message.into();
    if let Message::Buffer(buf) = &mut message {
      buf.mark();
    }
    Self { message, receipt: None }
  }

  /// Creates a request together with a receipt that resolves once the
  /// message has been written or has failed.
  pub fn with_receipt(message: impl Into<Message>) -> (Self, WriteReceipt) {
    let (sender, receiver) = crossbeam_channel::bounded(1);
    let mut request = Self::new(message);
    request.receipt = Some(sender);
    (request, WriteReceipt { recv: Some(receiver) })
  }

  pub fn message(&self) -> &Message {
    &self.message
  }

  pub fn message_mut(&mut self) -> &mut Message {
    &mut self.message
  }

  pub fn buffer(&self) -> Option<&IoBuffer> {
    self.message.as_buffer()
  }

  pub fn buffer_mut(&mut self) -> Option<&mut IoBuffer> {
    self.message.as_buffer_mut()
  }

  pub fn into_message(self) -> Message {
    self.message
  }

  /// Lends the buffer out for a transport operation.
  pub(crate) fn take_buffer(&mut self) -> Result<IoBuffer, SessionError> {
    match &mut self.message {
      Message::Buffer(buf) => Ok(mem::take(buf)),
      Message::Object { type_name, .. } => {
        Err(SessionError::MissingCodec { type_name: *type_name })
      }
    }
  }

  pub(crate) fn restore_buffer(&mut self, buf: IoBuffer) {
    self.message = Message::Buffer(buf);
  }

  /// Resolves the receipt with the written buffer.
  pub(crate) fn succeed(self) {
    let Self { message, receipt } = self;
    if let Some(receipt) = receipt {
      let outcome = match message {
        Message::Buffer(buf) => Ok(buf),
        Message::Object { type_name, .. } => {
          Err(SessionError::MissingCodec { type_name })
        }
      };
      let _ = receipt.send(outcome);
    }
  }

  /// Resolves the receipt with `error`.
  pub(crate) fn fail(self, error: SessionError) {
    if let Some(receipt) = self.receipt {
      let _ = receipt.send(Err(error));
    }
  }
}

impl fmt::Debug for WriteRequest {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("WriteRequest")
      .field("message", &self.message)
      .field("has_receipt", &self.receipt.is_some())
      .finish()
  }
}

/// Producer-side handle on a [`WriteRequest`].
///
/// Resolves exactly once. If the request is dropped without being written
/// (for example by a filter that swallows it) the receipt resolves to
/// [`SessionError::Discarded`].
#[derive(Debug)]
pub struct WriteReceipt {
  recv: Option<Receiver<WriteOutcome>>,
}

impl WriteReceipt {
  /// Blocks until the write is resolved.
  ///
  /// If the outcome was already taken through [`try_recv`](Self::try_recv)
  /// this returns [`SessionError::Discarded`].
  pub fn recv(mut self) -> WriteOutcome {
    match self.recv.take() {
      Some(recv) => recv.recv().unwrap_or(Err(SessionError::Discarded)),
      None => Err(SessionError::Discarded),
    }
  }

  /// Returns the outcome if the write is already resolved.
  ///
  /// Returns `None` while the write is pending and after the outcome has
  /// been taken once.
  pub fn try_recv(&mut self) -> Option<WriteOutcome> {
    let recv = self.recv.take()?;
    match recv.try_recv() {
      Ok(outcome) => Some(outcome),
      Err(TryRecvError::Empty) => {
        self.recv = Some(recv);
        None
      }
      Err(TryRecvError::Disconnected) => Some(Err(SessionError::Discarded)),
    }
  }

  /// Waits at most `timeout` for the write to be resolved.
  pub fn recv_timeout(&mut self, timeout: Duration) -> Option<WriteOutcome> {
    let recv = self.recv.take()?;
    match recv.recv_timeout(timeout) {
      Ok(outcome) => Some(outcome),
      Err(RecvTimeoutError::Timeout) => {
        self.recv = Some(recv);
        None
      }
      Err(RecvTimeoutError::Disconnected) => {
        Some(Err(SessionError::Discarded))
      }
    }
  }
}

/// FIFO of pending writes for one session.
///
/// Many producers, one consumer: the session's active send loop.
#[derive(Default)]
pub struct WriteRequestQueue {
  inner: Mutex<VecDeque<WriteRequest>>,
}

impl WriteRequestQueue {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn offer(&self, request: WriteRequest) {
    self.inner.lock().push_back(request);
  }

  /// Takes the oldest pending write. Never blocks.
  pub fn poll(&self) -> Option<WriteRequest> {
    self.inner.lock().pop_front()
  }

  /// Like [`poll`](Self::poll), but runs `on_empty` while still holding the
  /// queue lock when there is nothing to take.
  ///
  /// An `offer` can therefore not slip in between observing the queue empty
  /// and whatever `on_empty` publishes.
  pub(crate) fn poll_or_else<F>(&self, on_empty: F) -> Option<WriteRequest>
  where
    F: FnOnce(),
  {
    let mut inner = self.inner.lock();
    let request = inner.pop_front();
    if request.is_none() {
      on_empty();
    }
    request
  }

  pub fn len(&self) -> usize {
    self.inner.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.inner.lock().is_empty()
  }

  pub(crate) fn drain(&self) -> Vec<WriteRequest> {
    self.inner.lock().drain(..).collect()
  }
}

impl fmt::Debug for WriteRequestQueue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("WriteRequestQueue").field("len", &self.len()).finish()
  }
}
