//! The seam between a session and whatever moves its bytes.
//!
//! A [`Transport`] starts one operation per call and reports the outcome
//! later through the completion handle it was given. Completions may run on
//! any thread, including inline before `begin_send` or `begin_receive`
//! returns. The session guarantees at most one send and at most one
//! receive in flight per transport.
//!
//! The transport reports how many bytes it moved and hands the buffer back
//! untouched; the session moves the cursor. For a send, the bytes to write
//! are [`IoBuffer::chunk`]. For a receive, the bytes read go to the start of
//! [`IoBuffer::spare_mut`].

#[cfg(feature = "tcp")]
mod tcp;

use std::{fmt, io, net::SocketAddr, sync::Arc};

use crate::{BufResult, IoBuffer, IoSession};

#[cfg(feature = "tcp")]
#[cfg_attr(docsrs, doc(cfg(feature = "tcp")))]
pub use tcp::TcpTransport;

/// Asynchronous byte stream owned by one session.
pub trait Transport: Send + Sync + 'static {
  fn local_addr(&self) -> Option<SocketAddr> {
    None
  }

  fn peer_addr(&self) -> Option<SocketAddr> {
    None
  }

  /// `false` once the connection is gone for good.
  fn is_connected(&self) -> bool;

  /// Writes from `buf.chunk()`, then calls `completion` with the number of
  /// bytes written.
  fn begin_send(&self, buf: IoBuffer, completion: SendCompletion);

  /// Reads into `buf.spare_mut()`, then calls `completion` with the number
  /// of bytes read. `Ok(0)` means the peer closed the connection.
  fn begin_receive(&self, buf: IoBuffer, completion: ReceiveCompletion);

  /// Stops the transport. Operations in flight complete with an error or
  /// are dropped.
  fn close(&self);
}

impl<T: Transport> Transport for Arc<T> {
  fn local_addr(&self) -> Option<SocketAddr> {
    (**self).local_addr()
  }

  fn peer_addr(&self) -> Option<SocketAddr> {
    (**self).peer_addr()
  }

  fn is_connected(&self) -> bool {
    (**self).is_connected()
  }

  fn begin_send(&self, buf: IoBuffer, completion: SendCompletion) {
    (**self).begin_send(buf, completion)
  }

  fn begin_receive(&self, buf: IoBuffer, completion: ReceiveCompletion) {
    (**self).begin_receive(buf, completion)
  }

  fn close(&self) {
    (**self).close()
  }
}

macro_rules! completion {
  ($(#[$meta:meta])* $name:ident, $end:ident, $abort:ident) => {
    $(#[$meta])*
    ///
    /// Dropping it without calling [`complete`](Self::complete) counts as a
    /// transport failure.
    #[must_use = "dropping a completion fails the operation"]
    pub struct $name {
      // Taken by whichever of complete or drop runs first.
      session: Option<Arc<IoSession>>,
    }

    impl $name {
      pub(crate) fn new(session: Arc<IoSession>) -> Self {
        Self { session: Some(session) }
      }

      /// Id of the session waiting on this operation.
      pub fn session_id(&self) -> Option<u64> {
        self.session.as_ref().map(|session| session.id())
      }

      /// Resumes the session with the outcome of the operation.
      pub fn complete(mut self, (result, buf): BufResult<usize, IoBuffer>) {
        if let Some(session) = self.session.take() {
          session.$end(result, buf);
        }
      }

      /// Shorthand for completing with an error.
      pub fn fail(self, error: io::Error, buf: IoBuffer) {
        self.complete((Err(error), buf))
      }
    }

    impl Drop for $name {
      fn drop(&mut self) {
        if let Some(session) = self.session.take() {
          session.$abort();
        }
      }
    }

    impl fmt::Debug for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(stringify!($name))
          .field("session", &self.session_id())
          .finish()
      }
    }
  };
}

completion!(
  /// Continuation of one send.
  SendCompletion,
  end_send,
  abort_send
);

completion!(
  /// Continuation of one receive.
  ReceiveCompletion,
  end_receive,
  abort_receive
);
