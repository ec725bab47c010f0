use std::{any::Any, io, sync::Arc};

use thiserror::Error;

/// Errors surfaced by a session.
///
/// Cloneable so one failure can be handed to the pipeline, the fault monitor
/// and a write receipt at the same time. I/O errors are shared behind an
/// [`Arc`] for that reason.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
  /// An outbound message reached the send loop without being encoded into
  /// an [`IoBuffer`](crate::IoBuffer).
  ///
  /// This is a configuration error: it is reported once and never retried.
  #[error(
    "don't know how to write a message of type `{type_name}`, is a protocol encoder missing?"
  )]
  MissingCodec { type_name: &'static str },

  /// The transport reported a failure.
  #[error("transport error: {0}")]
  Io(#[source] Arc<io::Error>),

  /// The session was closed before the operation could run.
  #[error("session is closed")]
  Closed,

  /// A write request was dropped by a filter before it reached the transport.
  #[error("write request was discarded before it was written")]
  Discarded,

  /// A filter or handler panicked while an event was delivered.
  #[error("listener panicked: {0}")]
  ListenerPanic(String),
}

impl SessionError {
  pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
    let message = match payload.downcast::<String>() {
      Ok(message) => *message,
      Err(payload) => match payload.downcast::<&'static str>() {
        Ok(message) => (*message).to_owned(),
        Err(_) => "non-string panic payload".to_owned(),
      },
    };
    Self::ListenerPanic(message)
  }

  /// The [`io::ErrorKind`] of a transport error.
  pub fn io_kind(&self) -> Option<io::ErrorKind> {
    match self {
      Self::Io(err) => Some(err.kind()),
      _ => None,
    }
  }

  pub fn is_missing_codec(&self) -> bool {
    matches!(self, Self::MissingCodec { .. })
  }
}

impl From<io::Error> for SessionError {
  fn from(value: io::Error) -> Self {
    Self::Io(Arc::new(value))
  }
}
