use std::{
  io,
  sync::{Arc, atomic::Ordering},
  time::Instant,
};

use tracing::{debug, trace, warn};

use crate::{
  BufResult, IoBuffer, Message, SessionError, WriteRequest,
  transport::{ReceiveCompletion, SendCompletion},
};

use super::IoSession;

// Transports report a byte count; the cursor is moved here.
fn transferred(result: io::Result<usize>, buf: &IoBuffer) -> io::Result<usize> {
  let n = result?;
  if n > buf.remaining() {
    return Err(io::Error::new(
      io::ErrorKind::InvalidData,
      format!(
        "transport reported {n} bytes, only {} were available",
        buf.remaining()
      ),
    ));
  }
  Ok(n)
}

impl IoSession {
  /// Drains the write queue. Caller must hold write admission.
  ///
  /// Returns after handing a buffer to a transport that has not completed
  /// it yet, or after releasing admission because there is nothing left to
  /// write.
  pub(super) fn send_loop(self: &Arc<Self>) -> Result<(), SessionError> {
    self.drive_send(None)
  }

  fn drive_send(
    self: &Arc<Self>,
    mut completed: Option<BufResult<usize, IoBuffer>>,
  ) -> Result<(), SessionError> {
    let mut fault = None;
    loop {
      if let Some((result, buf)) = completed.take() {
        if !self.finish_send(result, buf) {
          break;
        }
      }

      if !self.check_usable() {
        self.stop_sending();
        break;
      }

      let taken = self.current_write.lock().take();
      let mut request = match taken {
        Some(request) => request,
        None => {
          // Admission is released under the queue lock, so a concurrent
          // offer either lands before this poll or sees the flag cleared.
          let polled = self.write_queue.poll_or_else(|| {
            self.writing.store(false, Ordering::Release)
          });
          match polled {
            Some(request) => request,
            None => break,
          }
        }
      };

      let buf = match request.take_buffer() {
        Ok(buf) => buf,
        Err(error) => {
          warn!(session_id = self.id, error = %error, "dropping unencoded write");
          request.fail(error.clone());
          self.fire_exception_caught(&error);
          fault = Some(error);
          continue;
        }
      };

      if buf.has_remaining() {
        trace!(session_id = self.id, bytes = buf.remaining(), "begin send");
        *self.current_write.lock() = Some(request);
        self.send_handoff.issue();
        self
          .transport
          .begin_send(buf, SendCompletion::new(Arc::clone(self)));
        match self.send_handoff.settle() {
          Some(outcome) => {
            completed = Some(outcome);
            continue;
          }
          None => break,
        }
      }

      request.restore_buffer(buf);
      self.write_completed(request);
    }

    match fault {
      Some(error) => Err(error),
      None => Ok(()),
    }
  }

  pub(crate) fn end_send(
    self: &Arc<Self>,
    result: io::Result<usize>,
    buf: IoBuffer,
  ) {
    let Some(outcome) = self.send_handoff.deliver((result, buf)) else {
      return;
    };
    if let Err(error) = self.drive_send(Some(outcome)) {
      debug!(session_id = self.id, error = %error, "send loop fault");
    }
  }

  /// Applies one send outcome. Returns whether the loop should go on.
  fn finish_send(
    self: &Arc<Self>,
    result: io::Result<usize>,
    mut buf: IoBuffer,
  ) -> bool {
    let taken = self.current_write.lock().take();
    let Some(mut request) = taken else {
      warn!(session_id = self.id, "send completed without a write in flight");
      return false;
    };

    let result = transferred(result, &buf).and_then(|n| match n {
      0 if buf.has_remaining() => Err(io::Error::from(io::ErrorKind::WriteZero)),
      n => Ok(n),
    });
    match result {
      Ok(n) => {
        let now = Instant::now();
        buf.advance(n);
        self.stats.increase_written_bytes(n, now);
        trace!(session_id = self.id, bytes = n, "end send");

        let drained = !buf.has_remaining();
        request.restore_buffer(buf);

        if self.is_closed() {
          // Bytes on the wire still count; only the event is withheld.
          if drained {
            self.stats.increase_written_messages(now);
            request.succeed();
          } else {
            request.fail(SessionError::Closed);
          }
          self.stop_sending();
          return false;
        }

        if drained {
          self.write_completed(request);
        } else {
          *self.current_write.lock() = Some(request);
        }
        true
      }
      Err(err) => {
        let error = SessionError::from(err);
        debug!(session_id = self.id, error = %error, "send failed");
        request.fail(error.clone());
        if !self.is_closed() {
          self.fire_exception_caught(&error);
        }
        self.close_now();
        self.stop_sending();
        false
      }
    }
  }

  pub(crate) fn abort_send(self: &Arc<Self>) {
    let error = io::Error::new(
      io::ErrorKind::BrokenPipe,
      "send completion dropped by the transport",
    );
    self.end_send(Err(error), IoBuffer::default());
  }

  fn write_completed(self: &Arc<Self>, mut request: WriteRequest) {
    let now = Instant::now();
    let cursor = request.buffer().map(|buf| (buf.position(), buf.limit()));
    if let Some(buf) = request.buffer_mut() {
      buf.reset();
    }

    self.contain(|| self.chain.fire_message_sent(self, &mut request));

    if let (Some((position, limit)), Some(buf)) = (cursor, request.buffer_mut())
    {
      buf.restore(position, limit);
    }
    self.stats.increase_written_messages(now);
    request.succeed();
  }

  fn stop_sending(&self) {
    let taken = self.current_write.lock().take();
    if let Some(request) = taken {
      request.fail(SessionError::Closed);
    }
    self.writing.store(false, Ordering::Release);
    self.fail_pending_writes();
  }

  pub(super) fn begin_receive(self: &Arc<Self>) {
    self.drive_receive(None);
  }

  fn drive_receive(
    self: &Arc<Self>,
    mut completed: Option<BufResult<usize, IoBuffer>>,
  ) {
    loop {
      if let Some((result, buf)) = completed.take() {
        if !self.finish_receive(result, buf) {
          return;
        }
      }
      if !self.check_usable() {
        return;
      }

      let buf = IoBuffer::allocate(self.config.read_buffer_size());
      trace!(session_id = self.id, "begin receive");
      self.receive_handoff.issue();
      self
        .transport
        .begin_receive(buf, ReceiveCompletion::new(Arc::clone(self)));
      match self.receive_handoff.settle() {
        Some(outcome) => completed = Some(outcome),
        None => return,
      }
    }
  }

  pub(crate) fn end_receive(
    self: &Arc<Self>,
    result: io::Result<usize>,
    buf: IoBuffer,
  ) {
    if let Some(outcome) = self.receive_handoff.deliver((result, buf)) {
      self.drive_receive(Some(outcome));
    }
  }

  /// Applies one receive outcome. Returns whether to receive again.
  fn finish_receive(
    self: &Arc<Self>,
    result: io::Result<usize>,
    mut buf: IoBuffer,
  ) -> bool {
    match transferred(result, &buf) {
      Ok(0) => {
        debug!(session_id = self.id, "peer closed the connection");
        self.close_now();
        false
      }
      Ok(n) => {
        if self.is_closed() {
          return false;
        }
        let now = Instant::now();
        buf.advance(n);
        buf.flip();
        self.stats.increase_read_bytes(n, now);
        trace!(session_id = self.id, bytes = n, "end receive");

        let mut message = Message::Buffer(buf);
        self.contain(|| self.chain.fire_message_received(self, &mut message));
        self.stats.increase_read_messages(now);
        true
      }
      Err(err) => {
        if !self.is_closed() {
          let error = SessionError::from(err);
          debug!(session_id = self.id, error = %error, "receive failed");
          self.fire_exception_caught(&error);
        }
        self.close_now();
        false
      }
    }
  }

  pub(crate) fn abort_receive(self: &Arc<Self>) {
    let error = io::Error::new(
      io::ErrorKind::ConnectionAborted,
      "receive completion dropped by the transport",
    );
    self.end_receive(Err(error), IoBuffer::default());
  }

  /// Closes the session if the transport lost its connection.
  fn check_usable(self: &Arc<Self>) -> bool {
    if self.is_closed() {
      return false;
    }
    if !self.transport.is_connected() {
      debug!(session_id = self.id, "transport disconnected");
      self.close_now();
      return false;
    }
    true
  }

  fn fire_exception_caught(self: &Arc<Self>, error: &SessionError) {
    self.contain(|| self.chain.fire_exception_caught(self, error));
  }
}
